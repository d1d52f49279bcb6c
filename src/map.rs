use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;

use crate::config::MapConfig;
use crate::processing::sum_by;
use crate::types::{Field, View};

const CITY_COORDINATES: &[(&str, f64, f64)] = &[
    ("São Paulo", -23.5505, -46.6333),
    ("Campinas", -22.9056, -47.0608),
    ("Santos", -23.9608, -46.3336),
    ("Sorocaba", -23.5015, -47.4526),
    ("Ribeirão Preto", -21.1783, -47.8060),
    ("Americana", -22.729958, -47.334938),
    ("Belo Horizonte", -19.917, -43.933),
    ("Bequimão", -2.4333, -44.7833),
    ("Brasília", -15.79389, -47.88278),
    ("Cabedelo", -6.98083, -34.83389),
    ("Campo Grande", -20.48389, -54.615),
    ("Curitiba", -25.42972, -49.27111),
    ("Delmiro Gouveia", -9.38583, -37.99583),
    ("Feira de Santana", -12.2667, -38.9667),
    ("Florianópolis", -27.5935, -48.55854),
    ("Fortaleza", -3.7275, -38.5275),
    ("Goiânia", -16.6864, -49.2643),
    ("Gravataí", -29.94389, -50.99194),
    ("Guarapari", -20.6537, -40.4975),
    ("Guarulhos", -23.46278, -46.53278),
    ("Imbé", -29.975, -50.128),
    ("Ipatinga", -19.4706, -42.5476),
    ("Itanhaém", -24.1736, -46.7889),
    ("Itatiba", -23.0039, -46.8461),
    ("João Pessoa", -7.115, -34.8631),
    ("Jundiaí", -23.1857, -46.8978),
    ("Lençóis Paulista", -22.5986, -48.8031),
    ("Londrina", -23.3045, -51.1696),
    ("Marabá", -5.3686, -49.1178),
    ("Mauá", -23.6678, -46.4614),
    ("Natal", -5.7945, -35.211),
    ("Nova Friburgo", -22.2819, -42.5311),
    ("Nova Santa Rita", -29.8511, -51.2831),
    ("Olinda", -7.9998, -34.845),
    ("Pinheiro", -2.5225, -45.0825),
    ("Pirassununga", -21.9961, -47.4258),
    ("Recife", -8.0476, -34.877),
    ("Rio Formoso", -8.6592, -35.1581),
    ("Rio de Janeiro", -22.9068, -43.1729),
];

static BUILTIN: Lazy<HashMap<&'static str, (f64, f64)>> = Lazy::new(|| {
    CITY_COORDINATES.iter().map(|&(city, lat, lon)| (city, (lat, lon))).collect()
});

/// City name to (lat, lon) lookup: the built-in table plus configured extras.
#[derive(Debug, Clone, Default)]
pub struct CityCoordinates {
    extra: HashMap<String, (f64, f64)>,
}

impl CityCoordinates {
    pub fn builtin() -> Self {
        CityCoordinates::default()
    }

    pub fn with_extra(cities: &HashMap<String, [f64; 2]>) -> Self {
        CityCoordinates {
            extra: cities.iter().map(|(k, v)| (k.clone(), (v[0], v[1]))).collect(),
        }
    }

    pub fn lookup(&self, city: &str) -> Option<(f64, f64)> {
        self.extra.get(city).copied().or_else(|| BUILTIN.get(city).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapData {
    pub center: [f64; 2],
    pub zoom: u8,
    pub markers: Vec<Marker>,
    pub unmapped: Vec<String>,
}

/// One marker per city with known coordinates, carrying its item total.
pub fn build_map(view: &View, coords: &CityCoordinates, config: &MapConfig) -> MapData {
    let mut markers = Vec::new();
    let mut unmapped = Vec::new();

    for (city, total) in sum_by(view, Field::City, Field::ItemsCollected) {
        match coords.lookup(&city) {
            Some((lat, lon)) => markers.push(Marker { city, lat, lon, total: total as i64 }),
            None => {
                debug!(city = %city, "No coordinates for city, skipping marker");
                unmapped.push(city);
            }
        }
    }

    MapData { center: config.center, zoom: config.zoom, markers, unmapped }
}
