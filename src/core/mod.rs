//! Core utilities, configuration, and common functionality

pub mod audit;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod utils;
pub mod validation;
pub mod web_server;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind};
pub use logging::{init_logger, log_startup_configuration};
