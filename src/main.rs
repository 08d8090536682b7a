mod config;
mod discovery;
mod loader;
mod render;
mod server;
mod table;
mod types;

use env_logger::Env;
use log::{error, info, warn};
use std::process;
use std::sync::Arc;

#[macro_use]
extern crate failure;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting vehicle-lookup");

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Bad configuration: {}", e);
            process::exit(1);
        }
    };
    let renderer = match render::Renderer::new() {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("Unable to load templates: {}", e);
            process::exit(1);
        }
    };

    // The table is complete before the first request is accepted.
    let client = reqwest::Client::new();
    let urls = discovery::discover(&client, &config.listing_url).await;
    let (table, report) = loader::load_table(&client, urls).await;
    info!(
        "Loaded {} of {} sources ({} failed), {} rows and {} columns total",
        report.loaded,
        report.discovered,
        report.failed,
        report.rows,
        table.columns().len()
    );
    if !table.is_empty() && !table.has_key_column() {
        warn!("No registration number column in any source; every lookup will miss");
    }

    server::run(config.bind_addr, Arc::new(table), Arc::new(renderer)).await;
    info!("Exiting main");
}
