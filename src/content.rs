//! Content store
//!
//! Flat per-language Markdown snippets loaded verbatim by path. No parsing,
//! no templating. A missing file degrades to a localized placeholder string;
//! it never fails the request.

use std::path::PathBuf;

use unic_langid::LanguageIdentifier;

use crate::i18n;

pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads a file relative to the content root, verbatim.
    pub fn read(&self, relative: &str) -> Option<String> {
        let path = self.root.join(relative);
        match fs_err::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                log::error!("Content file not readable: {} ({})", path.display(), e);
                None
            }
        }
    }

    /// Reads a file, degrading to a localized placeholder when it is missing.
    pub fn read_or_placeholder(&self, relative: &str, lang: &LanguageIdentifier) -> String {
        self.read(relative).unwrap_or_else(|| i18n::t(lang, "content.missing"))
    }
}
