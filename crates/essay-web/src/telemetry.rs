//! Tracing subscriber setup for the server binary.

use essay_core::config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the configured level when set.
pub fn env_filter(cfg: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(cfg)))
}

fn default_directive(cfg: &LoggingConfig) -> String {
    let level = match cfg.level.trim() {
        "" => "info",
        level => level,
    };
    format!("{level},tower_http={level}")
}

pub fn init_tracing(cfg: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = env_filter(cfg);
    if cfg.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_http_layer() {
        let cfg = LoggingConfig {
            level: "debug".into(),
            format: "json".into(),
        };
        assert_eq!(default_directive(&cfg), "debug,tower_http=debug");

        let blank = LoggingConfig {
            level: " ".into(),
            ..LoggingConfig::default()
        };
        assert_eq!(default_directive(&blank), "info,tower_http=info");
    }
}
