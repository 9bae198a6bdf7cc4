//! Centralized logging initialization with environment variable support

use crate::{AppConfig, LogFormat};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing subscriber with environment variable support
///
/// Environment variables (in priority order):
/// - `RUST_LOG`: Standard Rust log filter (takes precedence over all)
/// - `LOG_LEVEL`: Set log level (trace, debug, info, warn, error)
/// - `LOG_FORMAT`: Override format (json, pretty)
pub fn initialize(config: &AppConfig) {
    let log_level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);

    // RUST_LOG takes precedence over the configured level
    let env_filter = EnvFilter::from_default_env().add_directive(log_level.into());

    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|f| match f.to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" | "human" => Some(LogFormat::Pretty),
            _ => None,
        })
        .unwrap_or_else(|| config.logging.format.clone());

    // Always write to stderr so stdout stays clean for machine-readable output
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
