use std::env;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// `production`/`prod` in any case; everything else is development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn from_env() -> Self {
        env::var("ENVIRONMENT")
            .map(|v| Self::parse(&v))
            .unwrap_or(Environment::Development)
    }
}

/// Settings for the process-wide tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub environment: Environment,
    /// `EnvFilter` directives, e.g. `info,postprocess=debug`.
    pub filter: String,
}

impl LoggingConfig {
    /// Reads `ENVIRONMENT` and `RUST_LOG` (defaults to "info").
    pub fn from_env() -> Self {
        Self {
            environment: Environment::from_env(),
            filter: env::var("RUST_LOG")
                .ok()
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
