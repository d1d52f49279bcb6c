use std::collections::HashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub map: MapConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_file: PathBuf,
    pub sheet: Option<String>, // First sheet when unset
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { host: "127.0.0.1".to_string(), port: 8501 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center: [f64; 2], // [lat, lon]
    pub zoom: u8,
    pub cities: HashMap<String, [f64; 2]>, // Extends or overrides the built-in coordinates
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            center: [-15.793889, -47.882778],
            zoom: 4,
            cities: HashMap::new(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    pub fn for_data_file(path: impl Into<PathBuf>) -> Self {
        AppConfig {
            input: InputConfig { data_file: path.into(), sheet: None },
            server: ServerConfig::default(),
            map: MapConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_input_section_is_required() {
        let config: AppConfig = toml::from_str("[input]\ndata_file = \"dados.xlsx\"\n").unwrap();
        assert_eq!(config.input.data_file, PathBuf::from("dados.xlsx"));
        assert_eq!(config.input.sheet, None);
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.map.zoom, 4);
        assert!(config.map.cities.is_empty());
    }

    #[test]
    fn map_cities_extend_coordinates() {
        let config: AppConfig = toml::from_str(
            r#"
            [input]
            data_file = "dados.csv"
            sheet = "Respostas"

            [server]
            port = 9000

            [map.cities]
            "Atlantis" = [1.5, -30.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.input.sheet.as_deref(), Some("Respostas"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.map.cities.get("Atlantis"), Some(&[1.5, -30.0]));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = AppConfig::load_from_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
