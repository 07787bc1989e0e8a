//! Telegram-facing layer: bot setup, dispatcher schema, admin panel, webhook.

pub mod admin;
pub mod bot;
pub mod handlers;
pub mod webhook;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError, UserSession};
pub use webhook::{webhook_router, WebhookState, SECRET_TOKEN_HEADER};
