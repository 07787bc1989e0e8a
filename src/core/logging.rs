//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Startup configuration checking

use anyhow::Result;
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at startup.
///
/// Secrets are reported only as present/absent, never echoed.
pub fn log_startup_configuration() {
    log::info!("Environment: {}", config::environment_label());
    log::info!("Channel: {}", *config::CHANNEL_ID);
    log::info!("Ledger path: {}", *config::LEDGER_PATH);
    log::info!("Content dir: {}", *config::CONTENT_DIR);

    if config::ADMIN_IDS.is_empty() {
        log::warn!("ADMIN_IDS is empty - admin panel is unreachable");
    } else {
        log::info!("Admins configured: {}", config::ADMIN_IDS.len());
    }

    match config::webhook_secret() {
        Some(_) => log::info!("Webhook secret: configured"),
        None => log::warn!("Webhook secret: NOT configured - webhook endpoint will accept all requests"),
    }

    if !std::path::Path::new(config::WELCOME_IMAGE_PATH.as_str()).exists() {
        log::warn!(
            "Welcome image not found at {} - /start will fall back to text",
            *config::WELCOME_IMAGE_PATH
        );
    }
}
