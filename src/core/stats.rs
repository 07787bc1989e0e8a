//! In-process activity counters
//!
//! Replaces the ad-hoc globals of earlier revisions with an explicit store
//! passed through `HandlerDeps`. Counters reset on restart; nothing here is
//! persisted.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Live activity counters for `/status` and the admin statistics screen.
pub struct Stats {
    start_time: DateTime<Utc>,
    messages_processed: AtomicU64,
    callbacks_processed: AtomicU64,
    errors_occurred: AtomicU64,
    active_users: DashMap<i64, ()>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime_secs: i64,
    pub messages_processed: u64,
    pub callbacks_processed: u64,
    pub errors_occurred: u64,
    pub active_users: usize,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            messages_processed: AtomicU64::new(0),
            callbacks_processed: AtomicU64::new(0),
            errors_occurred: AtomicU64::new(0),
            active_users: DashMap::new(),
        }
    }

    pub fn note_message(&self, user_id: i64) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.active_users.insert(user_id, ());
    }

    pub fn note_callback(&self, user_id: i64) {
        self.callbacks_processed.fetch_add(1, Ordering::Relaxed);
        self.active_users.insert(user_id, ());
    }

    pub fn note_error(&self) {
        self.errors_occurred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: (Utc::now() - self.start_time).num_seconds(),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            callbacks_processed: self.callbacks_processed.load(Ordering::Relaxed),
            errors_occurred: self.errors_occurred.load(Ordering::Relaxed),
            active_users: self.active_users.len(),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
