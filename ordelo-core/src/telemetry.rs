//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events. The binary that embeds the data
//! layer calls [`init_tracing`] once at startup.

use crate::{ConfigError, OrdeloError, OrdeloResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info,ordelo_storage=debug`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Environment variables:
    /// - `ORDELO_LOG`: filter directive (default: info)
    /// - `ORDELO_LOG_JSON`: `true`/`1` for JSON output (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            filter: std::env::var("ORDELO_LOG").unwrap_or(defaults.filter),
            json: std::env::var("ORDELO_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.json),
        }
    }

    fn env_filter(&self) -> OrdeloResult<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| {
            OrdeloError::Config(ConfigError::InvalidValue {
                field: "ORDELO_LOG".to_string(),
                value: self.filter.clone(),
                reason: e.to_string(),
            })
        })
    }
}

/// Install the global tracing subscriber.
///
/// Fails when the filter directive does not parse or a subscriber is
/// already installed.
pub fn init_tracing(config: &TelemetryConfig) -> OrdeloResult<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    installed.map_err(|e| {
        OrdeloError::Config(ConfigError::InvalidValue {
            field: "tracing_subscriber".to_string(),
            value: config.filter.clone(),
            reason: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = TelemetryConfig {
            filter: "ordelo_storage=loudest".to_string(),
            json: false,
        };
        assert!(matches!(
            init_tracing(&config),
            Err(OrdeloError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_valid_filter_parses() {
        let config = TelemetryConfig {
            filter: "warn,ordelo_storage=debug".to_string(),
            json: true,
        };
        assert!(config.env_filter().is_ok());
    }
}
