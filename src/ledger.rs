//! Message-ID ledger
//!
//! A single JSON document mapping semantic page keys (`"main_menu_en"`,
//! `"pinned_welcome"`, ...) to the Telegram message ID currently representing
//! that page in the channel, plus an `all_messages` list used as a cleanup
//! fallback. Schema on disk:
//!
//! ```json
//! { "main_menu_en": 120, "properties_ru": 124, "all_messages": [120, 124] }
//! ```
//!
//! Reads fail soft: a missing file or malformed JSON is treated as "no prior
//! state", never as an error. Writes are wholesale overwrites, last writer
//! wins. Intended invariant: at most one live message per key, and
//! `all_messages` is a superset of every message ID the bot believes still
//! exists in the channel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use teloxide::types::MessageId;

use crate::core::AppResult;

/// In-memory shape of the persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    all_messages: Vec<i32>,
    #[serde(flatten)]
    entries: HashMap<String, i32>,
}

impl Ledger {
    pub fn get(&self, key: &str) -> Option<MessageId> {
        self.entries.get(key).copied().map(MessageId)
    }

    pub fn record(&mut self, key: &str, id: MessageId) {
        self.entries.insert(key.to_string(), id.0);
        if !self.all_messages.contains(&id.0) {
            self.all_messages.push(id.0);
        }
    }

    /// Drops `id` from `all_messages` and from any entry still naming it.
    /// Call only after Telegram confirmed the deletion.
    pub fn confirm_deleted(&mut self, id: MessageId) {
        self.all_messages.retain(|m| *m != id.0);
        self.entries.retain(|_, m| *m != id.0);
    }

    pub fn all_messages(&self) -> Vec<MessageId> {
        self.all_messages.iter().copied().map(MessageId).collect()
    }

    pub fn contains_message(&self, id: MessageId) -> bool {
        self.all_messages.contains(&id.0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.all_messages.is_empty()
    }
}

/// Owns the ledger file and serializes mutations within the process.
///
/// Every mutation is an atomic load-modify-save of the whole document; there
/// is no cross-process locking, so two processes sharing one file race as
/// last-writer-wins.
pub struct LedgerStore {
    path: PathBuf,
    inner: Mutex<Ledger>,
}

impl LedgerStore {
    /// Opens the store, loading prior state fail-soft.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ledger = Self::load(&path);
        Self { path, inner: Mutex::new(ledger) }
    }

    /// Read fails soft to the empty default on missing file or malformed JSON.
    fn load(path: &Path) -> Ledger {
        match fs_err::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(ledger) => ledger,
                Err(e) => {
                    log::warn!("Malformed ledger at {}: {} - starting from empty state", path.display(), e);
                    Ledger::default()
                }
            },
            Err(_) => Ledger::default(),
        }
    }

    fn save(&self, ledger: &Ledger) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }
        fs_err::write(&self.path, serde_json::to_string(ledger)?)?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<MessageId> {
        self.lock().get(key)
    }

    /// Records `key -> id`, adds `id` to `all_messages`, and persists.
    pub fn record(&self, key: &str, id: MessageId) -> AppResult<()> {
        let mut ledger = self.lock();
        ledger.record(key, id);
        self.save(&ledger)
    }

    /// Removes a confirmed-deleted message ID and persists.
    pub fn confirm_deleted(&self, id: MessageId) -> AppResult<()> {
        let mut ledger = self.lock();
        ledger.confirm_deleted(id);
        self.save(&ledger)
    }

    pub fn all_messages(&self) -> Vec<MessageId> {
        self.lock().all_messages()
    }

    pub fn snapshot(&self) -> Ledger {
        self.lock().clone()
    }
}
