use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,bindery_core::tasks::memory=warn".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter {filter:?}: {source}")]
    InvalidFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Installs the process-wide tracing subscriber. `RUST_LOG` overrides the
/// configured filter and is rejected, not ignored, when it does not parse.
/// Fails instead of panicking when a subscriber already exists.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let from_env = env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(from_env.as_deref(), config)?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    installed.map_err(|err| TelemetryError::AlreadyInitialized(err.to_string()))?;

    tracing::debug!(format = ?config.format, "tracing initialised");
    Ok(())
}

/// Picks the `RUST_LOG` directives when present, the configured ones
/// otherwise.
fn build_filter(
    from_env: Option<&str>,
    config: &LoggingConfig,
) -> Result<EnvFilter, TelemetryError> {
    let directives = from_env
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or(&config.filter);
    EnvFilter::try_new(directives).map_err(|source| {
        TelemetryError::InvalidFilter {
            filter: directives.to_string(),
            source,
        }
    })
}
