// Logging module - tracing subscriber setup
use crate::domain::config::{LogFormat, LoggingConfig};
use crate::domain::error::{BridgeError, BridgeResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for `level`: the crate logs at `level`, dependencies at warn.
pub fn default_directive(level: &str) -> String {
    format!("canbridge={},warn", level)
}

/// Initialize logging on stderr.
///
/// `RUST_LOG` wins over the configured level; `level_override` (from `-v`/`-q`)
/// wins over the configuration file.
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> BridgeResult<()> {
    let level = level_override.unwrap_or(&config.level);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .map_err(|e| BridgeError::config(format!("Invalid log level '{}': {}", level, e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(false),
            )
            .try_init(),
    };

    result.map_err(|e| BridgeError::config(format!("Failed to initialize logging: {}", e)))?;
    tracing::debug!(level, format = ?config.format, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("debug"), "canbridge=debug,warn");
    }

    #[test]
    fn test_logging_init_twice_fails_cleanly() {
        let config = LoggingConfig::default();
        let first = init_logging(&config, None);
        let second = init_logging(&config, Some("debug"));
        // One global subscriber per process
        assert!(first.is_ok());
        assert!(second.is_err());
    }
}
