//! Vitrina keeps a Telegram channel looking like a small website: a pinned
//! welcome, a multi-language menu, and content pages, each backed by exactly
//! one live channel message tracked in a persistent ledger.

pub mod cli;
pub mod content;
pub mod core;
pub mod i18n;
pub mod ledger;
pub mod publisher;
pub mod renderer;
pub mod telegram;

pub use content::ContentStore;
pub use ledger::{Ledger, LedgerStore};
pub use publisher::{channel_recipient, ChannelPublisher, PagePayload};
pub use renderer::{render, CallbackAction, Page, RenderedPage};
