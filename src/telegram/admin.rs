//! Admin panel
//!
//! Every admin action re-checks the allow-list at execution time. Keyboards
//! outlive permission changes (a button pressed hours later must not act on
//! the access the user had when it was drawn), so hiding buttons is never
//! enough.

use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::config;
use crate::i18n;
use crate::renderer::{AdminAction, CallbackAction, Page};
use crate::telegram::handlers::HandlerDeps;

/// Allow-list check. An empty list means no admins, not "everyone".
pub fn is_admin(user_id: i64) -> bool {
    config::ADMIN_IDS.contains(&user_id)
}

/// Checks the allow-list and tells the user off if they are not on it.
/// Returns whether the caller may proceed.
pub async fn require_admin(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps) -> anyhow::Result<bool> {
    if is_admin(user_id) {
        return Ok(true);
    }
    log::warn!("User {} attempted an admin action in chat {}", user_id, chat_id);
    let lang = i18n::lang_from_code(&deps.session_language(chat_id.0));
    bot.send_message(chat_id, i18n::t(&lang, "admin.denied")).await?;
    Ok(false)
}

/// Routes an `admin_*` callback. The permission check happens here, per
/// action, regardless of how the button got onto the screen.
pub async fn handle_admin_action(
    bot: &Bot,
    q: &CallbackQuery,
    action: AdminAction,
    deps: &HandlerDeps,
) -> anyhow::Result<()> {
    let user_id = i64::try_from(q.from.id.0).unwrap_or(0);
    let Some(msg) = q.regular_message() else {
        log::warn!("Admin callback {:?} carries no accessible message, ignoring", q.id);
        return Ok(());
    };

    if !require_admin(bot, msg.chat.id, user_id, deps).await? {
        return Ok(());
    }

    let lang = i18n::lang_from_code(&deps.session_language(msg.chat.id.0));
    let (text, keyboard) = match action {
        AdminAction::Panel => {
            (panel_text(&lang, &deps.session_env_label(msg.chat.id.0)), panel_keyboard(&lang))
        }
        AdminAction::Content => (i18n::t(&lang, "admin.content-overview"), back_keyboard(&lang)),
        AdminAction::Stats => (stats_text(&lang, deps), back_keyboard(&lang)),
        AdminAction::Notifications => (i18n::t(&lang, "admin.notifications-overview"), back_keyboard(&lang)),
        AdminAction::SwitchEnv => {
            let label = deps.toggle_session_env_label(msg.chat.id.0);
            (switch_env_text(&lang, &label), back_keyboard(&lang))
        }
        AdminAction::BackToMain => {
            // Leaves the panel for the regular main menu. The session must
            // record the page now on screen, or a later language switch
            // re-renders whatever the user visited before the panel.
            let code = deps.session_language(msg.chat.id.0);
            deps.set_session(msg.chat.id.0, &code, Page::MainMenu);
            let rendered = crate::renderer::render(&deps.content, Page::MainMenu, &code);
            (rendered.text, rendered.keyboard)
        }
    };

    let edited = bot.edit_message_text(msg.chat.id, msg.id, text.clone()).reply_markup(keyboard.clone()).await;
    if edited.is_err() {
        bot.send_message(msg.chat.id, text).reply_markup(keyboard).await?;
    }
    Ok(())
}

/// Sends a fresh panel message (the `/admin` entry point).
pub async fn send_panel(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps) -> anyhow::Result<()> {
    let lang = i18n::lang_from_code(&deps.session_language(chat_id.0));
    let text = panel_text(&lang, &deps.session_env_label(chat_id.0));
    bot.send_message(chat_id, text).reply_markup(panel_keyboard(&lang)).await?;
    Ok(())
}

fn panel_text(lang: &unic_langid::LanguageIdentifier, env_label: &str) -> String {
    let mut args = FluentArgs::new();
    args.set("env", env_label);
    i18n::t_args(lang, "admin.panel", &args)
}

fn stats_text(lang: &unic_langid::LanguageIdentifier, deps: &HandlerDeps) -> String {
    let snapshot = deps.stats.snapshot();
    let mut args = FluentArgs::new();
    args.set("uptime", snapshot.uptime_secs);
    args.set("messages", snapshot.messages_processed);
    args.set("callbacks", snapshot.callbacks_processed);
    args.set("errors", snapshot.errors_occurred);
    args.set("users", snapshot.active_users);
    args.set("tracked", deps.ledger.all_messages().len() as u64);
    i18n::t_args(lang, "admin.stats-overview", &args)
}

/// The toggle changes the panel's display label only; credentials are fixed
/// at startup.
fn switch_env_text(lang: &unic_langid::LanguageIdentifier, new_label: &str) -> String {
    let mut args = FluentArgs::new();
    args.set("env", new_label.to_string());
    i18n::t_args(lang, "admin.switch-env", &args)
}

fn panel_keyboard(lang: &unic_langid::LanguageIdentifier) -> InlineKeyboardMarkup {
    let rows = vec![
        vec![admin_button(lang, "admin.button-content", AdminAction::Content)],
        vec![admin_button(lang, "admin.button-stats", AdminAction::Stats)],
        vec![admin_button(lang, "admin.button-notifications", AdminAction::Notifications)],
        vec![admin_button(lang, "admin.button-switch-env", AdminAction::SwitchEnv)],
        vec![admin_button(lang, "admin.button-back", AdminAction::BackToMain)],
    ];
    InlineKeyboardMarkup::new(rows)
}

fn back_keyboard(lang: &unic_langid::LanguageIdentifier) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![admin_button(lang, "admin.button-panel", AdminAction::Panel)]])
}

fn admin_button(lang: &unic_langid::LanguageIdentifier, key: &str, action: AdminAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(i18n::t(lang, key), CallbackAction::Admin(action).as_data())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_admits_nobody() {
        // ADMIN_IDS defaults to empty when the variable is unset.
        assert!(!is_admin(0));
        assert!(!is_admin(123456789));
    }

    #[test]
    fn panel_keyboard_routes_through_admin_callbacks() {
        let lang = i18n::lang_from_code("en");
        let kb = panel_keyboard(&lang);
        assert_eq!(kb.inline_keyboard.len(), 5);
        for row in &kb.inline_keyboard {
            let data = match &row[0].kind {
                teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                other => panic!("unexpected button kind: {:?}", other),
            };
            assert!(CallbackAction::parse(&data).is_some(), "unparsable payload {:?}", data);
        }
    }
}
