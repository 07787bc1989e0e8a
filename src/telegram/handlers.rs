//! Dispatcher schema and handler chain builders
//!
//! One handler tree serves both transports: the polling dispatcher and the
//! webhook shim feed updates into the same schema. Endpoints never bubble
//! errors out of the tree; every failure is logged, counted, and answered
//! with a localized apology so one bad update cannot wedge the dispatcher.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode};
use teloxide::utils::command::BotCommands;

use crate::content::ContentStore;
use crate::core::{config, Stats};
use crate::i18n;
use crate::ledger::LedgerStore;
use crate::publisher::{ChannelPublisher, PagePayload};
use crate::renderer::{self, CallbackAction, LangMode, Page, RenderedPage};
use crate::telegram::admin;
use crate::telegram::bot::Command;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Per-chat navigation state. Lost on restart; the default is the welcome
/// language, the main menu, and the process's environment label.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub language: String,
    pub current_page: Page,
    /// Display label shown in the admin panel. Toggling it never touches
    /// credentials; those are fixed at startup.
    pub env_label: String,
}

impl Default for UserSession {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            current_page: Page::MainMenu,
            env_label: config::environment_label().to_string(),
        }
    }
}

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub ledger: Arc<LedgerStore>,
    pub content: Arc<ContentStore>,
    pub publisher: Arc<ChannelPublisher>,
    pub sessions: Arc<DashMap<i64, UserSession>>,
    pub stats: Arc<Stats>,
}

impl HandlerDeps {
    pub fn session_language(&self, chat_id: i64) -> String {
        self.sessions.get(&chat_id).map(|s| s.language.clone()).unwrap_or_else(|| "en".to_string())
    }

    pub fn set_session(&self, chat_id: i64, language: &str, page: Page) {
        let mut session = self.sessions.entry(chat_id).or_default();
        session.language = language.to_string();
        session.current_page = page;
    }

    pub fn session_env_label(&self, chat_id: i64) -> String {
        self.sessions
            .get(&chat_id)
            .map(|s| s.env_label.clone())
            .unwrap_or_else(|| config::environment_label().to_string())
    }

    /// Flips the panel's environment label for this chat and returns the new
    /// value.
    pub fn toggle_session_env_label(&self, chat_id: i64) -> String {
        let mut session = self.sessions.entry(chat_id).or_default();
        session.env_label =
            if session.env_label == "PRODUCTION" { "DEVELOPMENT".to_string() } else { "PRODUCTION".to_string() };
        session.env_label.clone()
    }
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The same schema is used in production (polling and webhook) and in
/// integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_channel = deps.clone();
    let deps_commands = deps.clone();
    let deps_callback = deps.clone();
    let deps_messages = deps;

    dptree::entry()
        // Channel posts arrive on their own update kind, not as messages.
        .branch(channel_start_handler(deps_channel))
        .branch(command_handler(deps_commands))
        .branch(callback_handler(deps_callback))
        .branch(message_handler(deps_messages))
}

/// `/start` posted in the channel itself: (re)publish and pin the welcome.
fn channel_start_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_channel_post()
        .filter(|msg: Message| msg.text().map(|text| text.starts_with("/start")).unwrap_or(false))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                log::info!("Channel /start in chat {}", msg.chat.id);
                if let Err(e) = handle_start(&bot, &msg, &deps).await {
                    deps.stats.note_error();
                    log::error!("Welcome publish failed for channel {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

/// Handler for bot commands (/start, /sendtochannel, ...)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                deps.stats.note_message(msg.chat.id.0);

                if let Err(e) = handle_command(&bot, &msg, cmd, &deps).await {
                    deps.stats.note_error();
                    log::error!("Command handler failed for chat {}: {}", msg.chat.id, e);
                    send_apology(&bot, msg.chat.id, &deps).await;
                }
                Ok(())
            }
        },
    ))
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            deps.stats.note_callback(i64::try_from(q.from.id.0).unwrap_or(0));

            // Answer first so the client stops its spinner even if the
            // action below fails.
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Could not answer callback query {}: {}", q.id, e);
            }

            let Some(data) = q.data.as_deref() else {
                return Ok(());
            };
            let Some(action) = CallbackAction::parse(data) else {
                log::warn!("Dropping unrecognized callback payload: {:?}", data);
                return Ok(());
            };

            if let Err(e) = handle_callback(&bot, &q, action, &deps).await {
                deps.stats.note_error();
                log::error!("Callback handler failed for payload {:?}: {}", data, e);
                if let Some(msg) = q.regular_message() {
                    if !msg.chat.is_channel() {
                        send_apology(&bot, msg.chat.id, &deps).await;
                    }
                }
            }
            Ok(())
        }
    })
}

/// Fallback for plain text: point the user back at the menu.
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some() && !msg.chat.is_channel())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                deps.stats.note_message(msg.chat.id.0);
                let lang = i18n::lang_from_code(&deps.session_language(msg.chat.id.0));
                if let Err(e) = bot.send_message(msg.chat.id, i18n::t(&lang, "use-menu")).await {
                    log::warn!("Could not send menu hint to chat {}: {}", msg.chat.id, e);
                }
                Ok(())
            }
        })
}

async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, deps: &HandlerDeps) -> anyhow::Result<()> {
    let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);
    let lang = i18n::lang_from_code(&deps.session_language(msg.chat.id.0));

    match cmd {
        Command::Start => handle_start(bot, msg, deps).await?,
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
        Command::Status => {
            let snapshot = deps.stats.snapshot();
            let mut args = fluent_templates::fluent_bundle::FluentArgs::new();
            args.set("env", config::environment_label());
            args.set("uptime", snapshot.uptime_secs);
            args.set("messages", snapshot.messages_processed);
            args.set("callbacks", snapshot.callbacks_processed);
            args.set("errors", snapshot.errors_occurred);
            args.set("users", snapshot.active_users);
            bot.send_message(msg.chat.id, i18n::t_args(&lang, "status", &args)).await?;
        }
        Command::SendToChannel => {
            if !admin::require_admin(bot, msg.chat.id, user_id, deps).await? {
                return Ok(());
            }
            let welcome = renderer::render(&deps.content, Page::Welcome, "en");
            let payload = welcome_payload(&welcome);
            let id = deps.publisher.publish_pinned_welcome(payload, welcome.keyboard).await?;
            bot.send_message(msg.chat.id, format!("Published welcome page to the channel (message {}).", id.0))
                .await?;
        }
        Command::SweepChannel => {
            if !admin::require_admin(bot, msg.chat.id, user_id, deps).await? {
                return Ok(());
            }
            let deleted = deps.publisher.sweep().await?;
            let remaining = deps.ledger.all_messages().len();
            bot.send_message(
                msg.chat.id,
                format!("Swept {} channel message(s); {} could not be removed.", deleted, remaining),
            )
            .await?;
        }
        Command::Admin => {
            if !admin::require_admin(bot, msg.chat.id, user_id, deps).await? {
                return Ok(());
            }
            admin::send_panel(bot, msg.chat.id, deps).await?;
        }
    }
    Ok(())
}

/// `/start`: in the channel, (re)publish and pin the welcome page; in a
/// private chat, greet with the welcome photo and the language picker.
async fn handle_start(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> anyhow::Result<()> {
    let welcome = renderer::render(&deps.content, Page::Welcome, "en");
    let payload = welcome_payload(&welcome);

    if msg.chat.is_channel() {
        deps.publisher.publish_pinned_welcome(payload, welcome.keyboard).await?;
        return Ok(());
    }

    deps.set_session(msg.chat.id.0, "en", Page::Welcome);
    match payload {
        PagePayload::Photo { path, caption } => {
            let sent = bot
                .send_photo(msg.chat.id, teloxide::types::InputFile::file(path))
                .caption(caption)
                .parse_mode(ParseMode::Markdown)
                .reply_markup(welcome.keyboard.clone())
                .await;
            if let Err(e) = sent {
                log::warn!("Welcome photo failed for chat {}, falling back to text: {}", msg.chat.id, e);
                send_page_text(bot, msg.chat.id, &welcome).await?;
            }
        }
        PagePayload::Text(_) => {
            send_page_text(bot, msg.chat.id, &welcome).await?;
        }
    }
    Ok(())
}

fn welcome_payload(welcome: &RenderedPage) -> PagePayload {
    let image = Path::new(config::WELCOME_IMAGE_PATH.as_str());
    if image.exists() {
        PagePayload::Photo { path: image.to_path_buf(), caption: welcome.text.clone() }
    } else {
        log::warn!("Welcome image missing at {}, using text-only welcome", image.display());
        PagePayload::Text(welcome.text.clone())
    }
}

async fn handle_callback(bot: &Bot, q: &CallbackQuery, action: CallbackAction, deps: &HandlerDeps) -> anyhow::Result<()> {
    let user_id = i64::try_from(q.from.id.0).unwrap_or(0);

    if let CallbackAction::Admin(admin_action) = &action {
        return admin::handle_admin_action(bot, q, *admin_action, deps).await;
    }

    let Some(msg) = q.regular_message() else {
        log::warn!("Callback {:?} carries no accessible message, ignoring", q.id);
        return Ok(());
    };

    let (code, page) = match action {
        CallbackAction::SelectLanguage { code, mode } => {
            let page = match mode {
                LangMode::Main => Page::MainMenu,
                LangMode::Current => current_page(deps, msg.chat.id),
            };
            (code, page)
        }
        CallbackAction::OpenMenu(item) => (deps.session_language(msg.chat.id.0), item.page()),
        CallbackAction::BackToMain { code } => (code, Page::MainMenu),
        // Admin actions returned above.
        CallbackAction::Admin(_) => return Ok(()),
    };

    log::info!("User {} navigating to {:?} ({}) in chat {}", user_id, page, code, msg.chat.id);
    deps.set_session(msg.chat.id.0, &code, page);
    let rendered = renderer::render(&deps.content, page, &code);

    if msg.chat.is_channel() {
        // In the channel the clicked message is replaced wholesale; it may
        // live under a different key than the destination page.
        deps.publisher
            .publish_replacing(
                &page.ledger_key(&code),
                PagePayload::Text(rendered.text),
                rendered.keyboard,
                Some(msg.id),
            )
            .await?;
    } else {
        edit_or_send(bot, msg.chat.id, msg.id, &rendered).await?;
    }
    Ok(())
}

fn current_page(deps: &HandlerDeps, chat_id: ChatId) -> Page {
    deps.sessions.get(&chat_id.0).map(|s| s.current_page).unwrap_or(Page::MainMenu)
}

/// Private chats edit in place; editing fails for photo messages and for
/// identical content, in which case a fresh message is sent instead.
async fn edit_or_send(bot: &Bot, chat_id: ChatId, message_id: MessageId, page: &RenderedPage) -> anyhow::Result<()> {
    let edited = bot
        .edit_message_text(chat_id, message_id, page.text.clone())
        .parse_mode(ParseMode::Markdown)
        .reply_markup(page.keyboard.clone())
        .await;

    if let Err(e) = edited {
        log::debug!("Edit of message {} in chat {} failed ({}), sending fresh message", message_id.0, chat_id, e);
        send_page_text(bot, chat_id, page).await?;
    }
    Ok(())
}

async fn send_page_text(bot: &Bot, chat_id: ChatId, page: &RenderedPage) -> anyhow::Result<()> {
    bot.send_message(chat_id, page.text.clone())
        .parse_mode(ParseMode::Markdown)
        .reply_markup(page.keyboard.clone())
        .await?;
    Ok(())
}

/// Last-resort user-facing error message. Failure to deliver it is only logged.
async fn send_apology(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps) {
    let lang = i18n::lang_from_code(&deps.session_language(chat_id.0));
    if let Err(e) = bot.send_message(chat_id, i18n::t(&lang, "error.generic")).await {
        log::error!("Could not deliver error message to chat {}: {}", chat_id, e);
    }
}
