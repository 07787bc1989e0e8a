//! Menu/page renderer and callback-data codec
//!
//! Pure mapping from `(page, language)` to `(text, inline keyboard)`. Bodies
//! come from the content store, button labels from the i18n layer; nothing
//! here talks to Telegram.
//!
//! Callback payloads are decoded into [`CallbackAction`] at the dispatcher
//! boundary. Unrecognized payloads decode to `None` and are dropped, instead
//! of being indexed into like the `split('_')` approach this replaces.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::content::ContentStore;
use crate::i18n;

/// A navigable screen of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Welcome,
    MainMenu,
    Properties,
    Contact,
    Faq,
    News,
}

impl Page {
    pub fn slug(self) -> &'static str {
        match self {
            Page::Welcome => "welcome",
            Page::MainMenu => "main_menu",
            Page::Properties => "properties",
            Page::Contact => "contact",
            Page::Faq => "faq",
            Page::News => "news",
        }
    }

    pub fn is_submenu(self) -> bool {
        matches!(self, Page::Properties | Page::Contact | Page::Faq | Page::News)
    }

    /// Ledger key for this page in the given language. The welcome page is
    /// language-neutral and keeps its historical key.
    pub fn ledger_key(self, lang_code: &str) -> String {
        match self {
            Page::Welcome => "welcome_message".to_string(),
            other => format!("{}_{}", other.slug(), lang_code),
        }
    }

    /// Content file for the page body, relative to the content root.
    fn content_file(self, lang_code: &str) -> String {
        match self {
            Page::Welcome => "welcome_message.md".to_string(),
            other => format!("{}/{}.md", lang_code, other.slug()),
        }
    }
}

/// Items reachable from the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Properties,
    Contact,
    Faq,
    News,
}

impl MenuItem {
    pub fn page(self) -> Page {
        match self {
            MenuItem::Properties => Page::Properties,
            MenuItem::Contact => Page::Contact,
            MenuItem::Faq => Page::Faq,
            MenuItem::News => Page::News,
        }
    }

    fn slug(self) -> &'static str {
        self.page().slug()
    }

    fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "properties" => Some(MenuItem::Properties),
            "contact" => Some(MenuItem::Contact),
            "faq" => Some(MenuItem::Faq),
            "news" => Some(MenuItem::News),
            _ => None,
        }
    }
}

/// What a language switch should re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LangMode {
    /// Jump to the main menu in the new language.
    Main,
    /// Stay on the current page, re-rendered in the new language.
    Current,
}

/// Admin panel actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Panel,
    Content,
    Stats,
    Notifications,
    SwitchEnv,
    BackToMain,
}

impl AdminAction {
    fn slug(self) -> &'static str {
        match self {
            AdminAction::Panel => "panel",
            AdminAction::Content => "content",
            AdminAction::Stats => "stats",
            AdminAction::Notifications => "notifications",
            AdminAction::SwitchEnv => "switch_env",
            AdminAction::BackToMain => "back_to_main",
        }
    }

    fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "panel" => Some(AdminAction::Panel),
            "content" => Some(AdminAction::Content),
            "stats" => Some(AdminAction::Stats),
            "notifications" => Some(AdminAction::Notifications),
            "switch_env" => Some(AdminAction::SwitchEnv),
            "back_to_main" => Some(AdminAction::BackToMain),
            _ => None,
        }
    }
}

/// Typed form of the inline-keyboard callback payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// `lang_<code>_<main|current>`
    SelectLanguage { code: String, mode: LangMode },
    /// `menu_<item>`
    OpenMenu(MenuItem),
    /// `menu_back_<code>`
    BackToMain { code: String },
    /// `admin_<action>`
    Admin(AdminAction),
}

impl CallbackAction {
    /// Decodes a callback payload. Fails closed: anything unrecognized is
    /// `None`, never a panic or a partial match.
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix("lang_") {
            let (code, mode) = match rest.split_once('_') {
                Some((code, "main")) => (code, LangMode::Main),
                Some((code, "current")) => (code, LangMode::Current),
                Some(_) => return None,
                None => (rest, LangMode::Main),
            };
            let code = i18n::is_language_supported(code)?;
            return Some(CallbackAction::SelectLanguage { code: code.to_string(), mode });
        }
        if let Some(code) = data.strip_prefix("menu_back_") {
            let code = i18n::is_language_supported(code)?;
            return Some(CallbackAction::BackToMain { code: code.to_string() });
        }
        if let Some(item) = data.strip_prefix("menu_") {
            return MenuItem::from_slug(item).map(CallbackAction::OpenMenu);
        }
        if let Some(action) = data.strip_prefix("admin_") {
            return AdminAction::from_slug(action).map(CallbackAction::Admin);
        }
        None
    }

    /// Encodes the action back into its wire form.
    pub fn as_data(&self) -> String {
        match self {
            CallbackAction::SelectLanguage { code, mode } => {
                let mode = match mode {
                    LangMode::Main => "main",
                    LangMode::Current => "current",
                };
                format!("lang_{}_{}", code, mode)
            }
            CallbackAction::OpenMenu(item) => format!("menu_{}", item.slug()),
            CallbackAction::BackToMain { code } => format!("menu_back_{}", code),
            CallbackAction::Admin(action) => format!("admin_{}", action.slug()),
        }
    }
}

/// A rendered page: text plus the keyboard to attach.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

/// Renders a page in the given language. Unknown languages fall back to the
/// default language's rendering.
pub fn render(store: &ContentStore, page: Page, lang_code: &str) -> RenderedPage {
    let code = i18n::is_language_supported(lang_code).unwrap_or("en");
    let lang = i18n::lang_from_code(code);
    let text = store.read_or_placeholder(&page.content_file(code), &lang);

    let keyboard = match page {
        Page::Welcome => welcome_keyboard(),
        Page::MainMenu => main_menu_keyboard(code),
        _ => submenu_keyboard(code),
    };

    RenderedPage { text, keyboard }
}

/// One row of flag buttons that re-render the current page in a new language.
fn language_row() -> Vec<InlineKeyboardButton> {
    i18n::SUPPORTED_LANGS
        .iter()
        .map(|(code, _, flag)| {
            InlineKeyboardButton::callback(
                (*flag).to_string(),
                CallbackAction::SelectLanguage { code: (*code).to_string(), mode: LangMode::Current }.as_data(),
            )
        })
        .collect()
}

/// Full-name language buttons for the welcome page, two per row.
pub fn welcome_keyboard() -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = i18n::SUPPORTED_LANGS
        .iter()
        .map(|(code, name, flag)| {
            InlineKeyboardButton::callback(
                format!("{} {}", flag, name),
                CallbackAction::SelectLanguage { code: (*code).to_string(), mode: LangMode::Main }.as_data(),
            )
        })
        .collect();

    InlineKeyboardMarkup::new(buttons.chunks(2).map(<[InlineKeyboardButton]>::to_vec).collect::<Vec<_>>())
}

pub fn main_menu_keyboard(lang_code: &str) -> InlineKeyboardMarkup {
    let lang = i18n::lang_from_code(lang_code);
    let items = [
        (MenuItem::Properties, "menu.properties"),
        (MenuItem::Contact, "menu.contact"),
        (MenuItem::Faq, "menu.faq"),
        (MenuItem::News, "menu.news"),
    ];

    let mut rows: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .map(|(item, key)| {
            vec![InlineKeyboardButton::callback(i18n::t(&lang, key), CallbackAction::OpenMenu(*item).as_data())]
        })
        .collect();
    rows.push(language_row());

    InlineKeyboardMarkup::new(rows)
}

pub fn submenu_keyboard(lang_code: &str) -> InlineKeyboardMarkup {
    let lang = i18n::lang_from_code(lang_code);
    let back = InlineKeyboardButton::callback(
        i18n::t(&lang, "menu.back"),
        CallbackAction::BackToMain { code: lang_code.to_string() }.as_data(),
    );

    InlineKeyboardMarkup::new(vec![vec![back], language_row()])
}
