pub mod types;
pub mod error;
pub mod config;
pub mod data;
pub mod cache;
pub mod filter;
pub mod processing;
pub mod charts;
pub mod map;
pub mod nav;
pub mod render;
pub mod server;

#[cfg(test)]
mod fixtures;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::NO_DATA_NOTICE;
use crate::filter::FilterState;
use crate::nav::Page;
use crate::render::render_dashboard;
use crate::server::AppState;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render the Home, Charts and Map pages to static HTML files
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "DIR", default_value = "dashboard")]
        out: PathBuf,
        /// Filter selections, in the same query-string form the sidebar uses
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Print the summary metrics as JSON
    Summary {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, default_value = "")]
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let state = Arc::new(AppState::new(app_config));
            server::start_server(state).await?;
        }
        Commands::Export { config, out, query } => {
            info!("Exporting dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let state = AppState::new(app_config);
            let table = state.cache.get()
                .with_context(|| format!("Failed to load data file: {:?}", state.cache.path()))?;
            let filters = FilterState::from_query(query);

            fs::create_dir_all(out)
                .with_context(|| format!("Failed to create output directory: {:?}", out))?;

            for page in Page::ALL {
                let rendered = render_dashboard(page, &table, &state.render_context(), &filters);
                if rendered.no_data {
                    bail!(NO_DATA_NOTICE);
                }
                let path = out.join(page.file_name());
                fs::write(&path, rendered.html)
                    .with_context(|| format!("Failed to write {:?}", path))?;
                info!(page = %page, path = ?path, "Wrote page");
            }

            info!("Export complete!");
        }
        Commands::Summary { config, query } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let state = AppState::new(app_config);
            let table = state.cache.get()
                .with_context(|| format!("Failed to load data file: {:?}", state.cache.path()))?;
            let view = state.spec.apply(&table, &FilterState::from_query(query));
            if view.is_empty() {
                bail!(NO_DATA_NOTICE);
            }
            println!("{}", serde_json::to_string_pretty(&processing::summarize(&view))?);
        }
    }

    Ok(())
}
