//! Tracing setup for signet binaries and tests.
//!
//! # Usage
//!
//! ```ignore
//! use signet_common::telemetry::{self, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env("signet-admin");
//! telemetry::init(&config);
//! tracing::info!("editor ready");
//! ```

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for labeling (e.g., "signet-admin")
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Build from the environment.
    ///
    /// - `RUST_LOG`: Standard env filter (optional, overrides console_level)
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }

    /// Build from a loaded [`Config`], falling back to INFO on an unknown level.
    pub fn from_config(service_name: impl Into<String>, config: &Config) -> Self {
        Self {
            service_name: service_name.into(),
            console_level: config.log_level.parse().unwrap_or(Level::INFO),
        }
    }
}

/// Install the console subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    match tracing_subscriber::registry().with(console_layer).try_init() {
        Ok(()) => tracing::debug!(
            service = %config.service_name,
            "telemetry initialized (console only)"
        ),
        Err(e) => tracing::debug!(error = %e, "subscriber already installed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_config() {
        let config = Config {
            log_level: "warn".into(),
            ..Config::default()
        };
        let telemetry = TelemetryConfig::from_config("signet-test", &config);
        assert_eq!(telemetry.console_level, Level::WARN);

        let config = Config {
            log_level: "chatty".into(),
            ..Config::default()
        };
        assert_eq!(
            TelemetryConfig::from_config("signet-test", &config).console_level,
            Level::INFO
        );
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = TelemetryConfig::from_env("signet-test");
        init(&config);
        init(&config);
    }
}
