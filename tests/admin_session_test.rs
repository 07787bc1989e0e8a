//! Admin panel navigation keeps the per-chat session in sync with what is
//! actually on screen.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use teloxide::types::CallbackQuery;
use teloxide::Bot;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrina::core::Stats;
use vitrina::publisher::ChannelPublisher;
use vitrina::renderer::{AdminAction, Page};
use vitrina::telegram::{admin, HandlerDeps};
use vitrina::{channel_recipient, ContentStore, LedgerStore};

const ADMIN_ID: i64 = 515151;

fn admin_callback(data: &str) -> CallbackQuery {
    serde_json::from_value(json!({
        "id": "888",
        "from": { "id": ADMIN_ID, "is_bot": false, "first_name": "Alice" },
        "chat_instance": "instance",
        "data": data,
        "message": {
            "message_id": 9,
            "date": 1_700_000_000,
            "chat": { "id": ADMIN_ID, "type": "private", "first_name": "Alice" },
            "text": "panel"
        }
    }))
    .expect("callback query fixture should deserialize")
}

fn edited_message() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "ok": true,
        "result": {
            "message_id": 9,
            "date": 1_700_000_000,
            "chat": { "id": ADMIN_ID, "type": "private", "first_name": "Alice" },
            "text": "main menu"
        }
    }))
}

async fn deps_against(server: &MockServer) -> (HandlerDeps, Bot) {
    let url = url::Url::parse(&server.uri()).unwrap();
    let bot = Bot::new("TESTTOKEN").set_api_url(url);

    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(LedgerStore::open(dir.path().join("ledger.json")));
    let publisher =
        Arc::new(ChannelPublisher::new(bot.clone(), channel_recipient("@vitrina_estate"), Arc::clone(&ledger)));

    let deps = HandlerDeps {
        ledger,
        content: Arc::new(ContentStore::new(dir.path())),
        publisher,
        sessions: Arc::new(DashMap::new()),
        stats: Arc::new(Stats::default()),
    };
    (deps, bot)
}

#[tokio::test]
async fn back_to_main_updates_the_session_page() {
    // The allow-list Lazy reads the variable on first access, which happens
    // inside handle_admin_action below.
    unsafe { std::env::set_var("ADMIN_IDS", "515151") };

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/editmessagetext$"))
        .respond_with(edited_message())
        .expect(1)
        .mount(&server)
        .await;

    let (deps, bot) = deps_against(&server).await;
    deps.set_session(ADMIN_ID, "en", Page::Faq);

    let q = admin_callback("admin_back_to_main");
    admin::handle_admin_action(&bot, &q, AdminAction::BackToMain, &deps).await.unwrap();

    let session = deps.sessions.get(&ADMIN_ID).expect("session should exist");
    assert_eq!(session.current_page, Page::MainMenu);
    assert_eq!(session.language, "en");
}
