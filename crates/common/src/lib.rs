pub mod config;
pub mod logging;

pub use config::{Environment, LoggingConfig};
pub use logging::setup_logging;
