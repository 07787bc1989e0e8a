//! Core utilities: configuration, errors, logging, activity counters

pub mod config;
pub mod error;
pub mod logging;
pub mod stats;

pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_startup_configuration};
pub use stats::Stats;
