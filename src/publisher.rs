//! Channel publisher
//!
//! Materializes a rendered page in the channel while keeping the message-ID
//! ledger truthful. Telegram offers no atomic "replace this message", and an
//! edit cannot change a photo message into a text message (or back), so
//! replacement is always send-new-then-delete-old:
//!
//! 1. send the new content as a brand-new message;
//! 2. persist `ledger[key] = new_id` (and `all_messages += new_id`) BEFORE
//!    attempting any deletion - if the delete fails or the process dies
//!    here, the ledger still names a message that genuinely exists;
//! 3. only then delete the previous occupant; deletion failure is logged and
//!    swallowed, and an ID leaves `all_messages` only on confirmed deletion.
//!
//! The cost is a brief window with both messages visible; the payoff is that
//! the persisted pointer is never dangling, and the viewer never sees the
//! page vanish before its replacement arrives.

use std::path::PathBuf;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile, MessageId, ParseMode, Recipient};

use crate::core::AppResult;
use crate::ledger::LedgerStore;

/// What a page materializes as: a text message or a photo with caption.
#[derive(Debug, Clone)]
pub enum PagePayload {
    Text(String),
    Photo { path: PathBuf, caption: String },
}

pub struct ChannelPublisher {
    bot: Bot,
    channel: Recipient,
    ledger: Arc<LedgerStore>,
}

impl ChannelPublisher {
    pub fn new(bot: Bot, channel: Recipient, ledger: Arc<LedgerStore>) -> Self {
        Self { bot, channel, ledger }
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    /// Publishes `payload` under `key`, replacing the key's previous message.
    ///
    /// Send errors abort the navigation attempt and persist nothing. Returns
    /// the new message's ID.
    pub async fn publish(
        &self,
        key: &str,
        payload: PagePayload,
        keyboard: InlineKeyboardMarkup,
    ) -> AppResult<MessageId> {
        self.publish_replacing(key, payload, keyboard, None).await
    }

    /// Like [`publish`](Self::publish), additionally removing `displaced` -
    /// the message the user navigated away from, which may live under a
    /// different key (e.g. switching from the FAQ page to the main menu).
    pub async fn publish_replacing(
        &self,
        key: &str,
        payload: PagePayload,
        keyboard: InlineKeyboardMarkup,
        displaced: Option<MessageId>,
    ) -> AppResult<MessageId> {
        let old_id = self.ledger.get(key);

        let new_id = self.send(payload, keyboard).await?;

        // The ledger must name the new message before anything is deleted.
        self.ledger.record(key, new_id)?;

        let mut stale: Vec<MessageId> = Vec::new();
        if let Some(old) = old_id {
            stale.push(old);
        }
        if let Some(d) = displaced {
            if !stale.contains(&d) {
                stale.push(d);
            }
        }

        for target in stale {
            if target == new_id {
                continue;
            }
            self.delete_confirmed(key, target).await;
        }

        Ok(new_id)
    }

    /// Publishes the welcome page under the `pinned_welcome` key and pins it.
    /// Pin failure is non-fatal; the page is already published and recorded.
    pub async fn publish_pinned_welcome(
        &self,
        payload: PagePayload,
        keyboard: InlineKeyboardMarkup,
    ) -> AppResult<MessageId> {
        let id = self.publish("pinned_welcome", payload, keyboard).await?;

        if let Err(e) = self.bot.pin_chat_message(self.channel.clone(), id).disable_notification(true).await {
            log::warn!("Failed to pin welcome message {}: {}", id.0, e);
        }

        Ok(id)
    }

    /// Best-effort sweep of every message ID the ledger still believes is in
    /// the channel. Returns the number of confirmed deletions; IDs whose
    /// deletion fails stay in the ledger.
    pub async fn sweep(&self) -> AppResult<usize> {
        let mut deleted = 0;
        for id in self.ledger.all_messages() {
            match self.bot.delete_message(self.channel.clone(), id).await {
                Ok(_) => {
                    self.ledger.confirm_deleted(id)?;
                    deleted += 1;
                }
                Err(e) => {
                    log::warn!("Sweep could not delete message {}: {}", id.0, e);
                }
            }
        }
        log::info!("Channel sweep removed {} message(s)", deleted);
        Ok(deleted)
    }

    async fn send(&self, payload: PagePayload, keyboard: InlineKeyboardMarkup) -> AppResult<MessageId> {
        let message = match payload {
            PagePayload::Text(text) => {
                self.bot
                    .send_message(self.channel.clone(), text)
                    .parse_mode(ParseMode::Markdown)
                    .reply_markup(keyboard)
                    .disable_notification(true)
                    .await?
            }
            PagePayload::Photo { path, caption } => {
                self.bot
                    .send_photo(self.channel.clone(), InputFile::file(path))
                    .caption(caption)
                    .parse_mode(ParseMode::Markdown)
                    .reply_markup(keyboard)
                    .disable_notification(true)
                    .await?
            }
        };
        Ok(message.id)
    }

    /// Deletes `target` and updates the ledger only on confirmation.
    /// Failure (already gone, insufficient rights, rate limit) must not block
    /// navigation or corrupt the ledger.
    async fn delete_confirmed(&self, key: &str, target: MessageId) {
        match self.bot.delete_message(self.channel.clone(), target).await {
            Ok(_) => {
                if let Err(e) = self.ledger.confirm_deleted(target) {
                    log::error!("Deleted message {} but could not persist ledger: {}", target.0, e);
                }
            }
            Err(e) => {
                log::warn!("Could not delete stale message {} for key {}: {}", target.0, key, e);
            }
        }
    }
}

/// Parses the configured channel identifier: `@username` or a numeric chat ID.
pub fn channel_recipient(raw: &str) -> Recipient {
    if let Ok(id) = raw.parse::<i64>() {
        return Recipient::Id(ChatId(id));
    }
    Recipient::ChannelUsername(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_recipient_parses_both_forms() {
        assert_eq!(channel_recipient("-1001234567890"), Recipient::Id(ChatId(-1001234567890)));
        assert_eq!(channel_recipient("@vitrina_estate"), Recipient::ChannelUsername("@vitrina_estate".to_string()));
    }
}
