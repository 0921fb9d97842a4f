//! Structured logging.
//!
//! JSON format for production, human-readable output for development.
//! `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level));

    let (json, text) = if config.json {
        (Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
}

/// Plain stderr subscriber for use before the configuration is loaded.
///
/// Meant for `tracing::subscriber::with_default`, not global installation.
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter("info")))
        .with_writer(std::io::stderr)
        .finish()
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("txflow={level},warn")).unwrap_or_else(|_| EnvFilter::new("txflow=info,warn"))
}
