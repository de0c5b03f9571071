//! Sets up logging for the service using `tracing_subscriber`.
//! Output is either human-readable or flattened JSON, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "info";

/// Installs the global subscriber described by `config`.
pub fn setup_logging(config: &LoggingConfig) {
    match config.format() {
        LogFormat::Pretty => setup_logging_pretty(),
        LogFormat::Json => setup_logging_json(),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn setup_logging_json() {
    let main_layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_target(false)
        .with_current_span(true)
        .with_span_list(true)
        .with_line_number(true)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(main_layer)
        .init()
}

fn setup_logging_pretty() {
    let main_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(main_layer)
        .init()
}
