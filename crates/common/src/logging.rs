use crate::config::{Environment, LoggingConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber: pretty output for development,
/// JSON for production.
///
/// Fails if the filter directives are invalid or a subscriber is already set.
pub fn setup_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(&config.filter)?;

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .try_init()?;
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .try_init()?;
        }
    }

    tracing::debug!(
        environment = config.environment.as_str(),
        filter = %config.filter,
        "Logging initialized"
    );

    Ok(())
}

/// Creates an info-level span and enters it.
#[macro_export]
macro_rules! span {
    ($name:literal) => {
        tracing::info_span!($name).entered()
    };
}

/// Creates a debug-level span and enters it.
#[macro_export]
macro_rules! span_debug {
    ($name:literal) => {
        tracing::debug_span!($name).entered()
    };
}
