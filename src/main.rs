// src/main.rs
mod api;
mod cache;
mod config;
mod logging;
mod model;
mod optimizer;
mod service;

use std::sync::Arc;

use tracing::{error, info, warn};

use config::{AppConfig, LoggingConfig};
use model::PackSizes;
use service::PackCalculator;

/// Reference order checked once at startup.
const STARTUP_CHECK_SIZES: [i64; 3] = [23, 31, 53];
const STARTUP_CHECK_ORDER: i64 = 500_000;

#[tokio::main]
async fn main() {
    let env_result = dotenvy::dotenv();

    logging::setup_logging(&LoggingConfig::from_env());

    if let Err(err) = env_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let calculator_config = app_config.calculator;

    info!("Pack calculator starting...");
    if calculator_config.startup_check() {
        run_startup_check();
    }

    let calculator = Arc::new(PackCalculator::new(
        calculator_config.pack_sizes(),
        calculator_config.cache_capacity(),
    ));

    if let Err(err) = api::start_api_server(
        app_config.api,
        calculator,
        calculator_config.max_order_size(),
    )
    .await
    {
        error!("API server terminated with an error: {err}");
        std::process::exit(1);
    }
}

/// Runs the reference calculation once so a broken optimizer shows up in the logs.
fn run_startup_check() {
    let pack_sizes = match PackSizes::new(STARTUP_CHECK_SIZES.to_vec()) {
        Ok(pack_sizes) => pack_sizes,
        Err(err) => {
            error!("Startup check has invalid pack sizes: {err}");
            return;
        }
    };

    info!(
        %pack_sizes,
        order_size = STARTUP_CHECK_ORDER,
        "Running startup check"
    );
    match optimizer::optimize(STARTUP_CHECK_ORDER, &pack_sizes) {
        Ok(shipment) => info!(
            packs = ?shipment.packs,
            total_items = shipment.total_items,
            total_packs = shipment.total_packs,
            "Startup check result"
        ),
        Err(err) => error!("Startup check failed: {err}"),
    }
}
