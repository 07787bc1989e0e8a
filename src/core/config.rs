use std::env;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;

/// Loads the environment files. Must run before any `Lazy` static here is
/// touched, or the statics capture the pre-dotenv environment.
///
/// The staging file is applied first and with override semantics, so its
/// values win over both the parent environment and anything `.env` also
/// defines. Returns warnings for the caller to log once the logger is up.
pub fn load_env_files(staging_file: Option<&Path>) -> Vec<String> {
    load_env_from(staging_file, Path::new(".env"))
}

fn load_env_from(staging_file: Option<&Path>, base_file: &Path) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(path) = staging_file {
        if let Err(e) = dotenvy::from_path_override(path) {
            warnings.push(format!("Could not load {}: {}", path.display(), e));
        }
    }
    // The base file never overrides what is already set.
    let _ = dotenvy::from_path(base_file);
    warnings
}

/// Environment flag selecting test vs. production credentials.
/// `BOT_ENV=test` switches the bot to the `TEST_*` variables.
pub static IS_TEST_ENV: Lazy<bool> =
    Lazy::new(|| env::var("BOT_ENV").map(|v| v.eq_ignore_ascii_case("test")).unwrap_or(false));

/// Human-readable label for the active environment (logs, health endpoint).
pub fn environment_label() -> &'static str {
    if *IS_TEST_ENV { "TEST" } else { "PRODUCTION" }
}

/// Resolves the bot token for the active environment.
///
/// There is deliberately no baked-in fallback token: a missing variable is a
/// startup error, not something to paper over.
pub fn bot_token() -> anyhow::Result<String> {
    let var = if *IS_TEST_ENV { "TEST_TELEGRAM_BOT_TOKEN" } else { "TELEGRAM_BOT_TOKEN" };
    env::var(var).map_err(|_| anyhow::anyhow!("{} is not set", var))
}

/// Webhook secret for the active environment, if configured.
/// When absent the webhook endpoint accepts all requests (logged as a warning).
pub fn webhook_secret() -> Option<String> {
    let var = if *IS_TEST_ENV { "TEST_WEBHOOK_SECRET" } else { "WEBHOOK_SECRET" };
    env::var(var).ok().filter(|s| !s.is_empty())
}

/// Channel the bot publishes pages into. Either an `@username` or a numeric
/// chat ID (`-100...`).
pub static CHANNEL_ID: Lazy<String> =
    Lazy::new(|| env::var("CHANNEL_ID").unwrap_or_else(|_| "@vitrina_estate".to_string()));

/// Admin allow-list, comma-separated Telegram user IDs.
/// Unparsable entries are skipped.
pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
    env::var("ADMIN_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
});

/// Path of the persisted message-ID ledger.
pub static LEDGER_PATH: Lazy<String> =
    Lazy::new(|| env::var("LEDGER_PATH").unwrap_or_else(|_| "data/channel_messages.json".to_string()));

/// Root directory of the per-language Markdown page bodies.
pub static CONTENT_DIR: Lazy<String> =
    Lazy::new(|| env::var("CONTENT_DIR").unwrap_or_else(|_| "content".to_string()));

/// Photo attached to the welcome page. A missing file degrades to a
/// text-only welcome, it never fails the request.
pub static WELCOME_IMAGE_PATH: Lazy<String> =
    Lazy::new(|| env::var("WELCOME_IMAGE_PATH").unwrap_or_else(|_| "media/images/photo.jpg".to_string()));

/// Log file path for the combined terminal + file logger.
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "vitrina.log".to_string()));

/// Public HTTPS URL Telegram delivers webhook updates to.
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok());

/// Local address the webhook server binds to.
pub static WEBHOOK_BIND_ADDR: Lazy<String> =
    Lazy::new(|| env::var("WEBHOOK_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8443".to_string()));

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for outbound Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
