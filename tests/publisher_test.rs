//! Publisher reconciliation tests against a mocked Bot API.
//!
//! Method paths are matched case-insensitively; the Bot API itself treats
//! method names case-insensitively.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use serde_json::json;
use teloxide::types::{InlineKeyboardMarkup, MessageId};
use teloxide::Bot;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use vitrina::publisher::{ChannelPublisher, PagePayload};
use vitrina::{channel_recipient, LedgerStore};

/// Responds to sendMessage with monotonically increasing message IDs.
struct NextMessageId(AtomicI32);

impl Respond for NextMessageId {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let id = self.0.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {
                "message_id": id,
                "date": 1_700_000_000,
                "chat": { "id": -1001234567890_i64, "type": "channel", "title": "Vitrina" },
                "text": "body"
            }
        }))
    }
}

fn delete_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true }))
}

fn delete_not_found() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "ok": false,
        "error_code": 400,
        "description": "Bad Request: message to delete not found"
    }))
}

fn pin_forbidden() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "ok": false,
        "error_code": 400,
        "description": "Bad Request: not enough rights to manage pinned messages in the chat"
    }))
}

async fn publisher_against(server: &MockServer, ledger: Arc<LedgerStore>) -> ChannelPublisher {
    let url = url::Url::parse(&server.uri()).unwrap();
    let bot = Bot::new("TESTTOKEN").set_api_url(url);
    ChannelPublisher::new(bot, channel_recipient("@vitrina_estate"), ledger)
}

#[tokio::test]
async fn publish_replaces_old_message_and_updates_ledger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/sendmessage$"))
        .respond_with(NextMessageId(AtomicI32::new(101)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/deletemessage$"))
        .respond_with(delete_ok())
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(LedgerStore::open(dir.path().join("ledger.json")));
    ledger.record("main_menu_en", MessageId(100)).unwrap();

    let publisher = publisher_against(&server, Arc::clone(&ledger)).await;
    let new_id = publisher
        .publish("main_menu_en", PagePayload::Text("body".to_string()), InlineKeyboardMarkup::default())
        .await
        .unwrap();

    assert_eq!(new_id, MessageId(101));
    assert_eq!(ledger.get("main_menu_en"), Some(MessageId(101)));
    // The replaced message was confirmed deleted and left the ledger.
    assert_eq!(ledger.all_messages(), vec![MessageId(101)]);
}

#[tokio::test]
async fn failed_delete_keeps_old_id_tracked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/sendmessage$"))
        .respond_with(NextMessageId(AtomicI32::new(201)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/deletemessage$"))
        .respond_with(delete_not_found())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(LedgerStore::open(dir.path().join("ledger.json")));
    ledger.record("faq_de", MessageId(200)).unwrap();

    let publisher = publisher_against(&server, Arc::clone(&ledger)).await;
    let new_id = publisher
        .publish("faq_de", PagePayload::Text("body".to_string()), InlineKeyboardMarkup::default())
        .await
        .unwrap();

    // Navigation succeeded despite the failed cleanup; the stale ID stays in
    // all_messages for a later sweep.
    assert_eq!(new_id, MessageId(201));
    assert_eq!(ledger.get("faq_de"), Some(MessageId(201)));
    let tracked = ledger.all_messages();
    assert!(tracked.contains(&MessageId(200)));
    assert!(tracked.contains(&MessageId(201)));
}

#[tokio::test]
async fn displaced_message_is_deleted_alongside_the_keyed_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/sendmessage$"))
        .respond_with(NextMessageId(AtomicI32::new(301)))
        .mount(&server)
        .await;
    // One delete for the keyed predecessor, one for the clicked message.
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/deletemessage$"))
        .respond_with(delete_ok())
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(LedgerStore::open(dir.path().join("ledger.json")));
    ledger.record("main_menu_en", MessageId(290)).unwrap();
    ledger.record("faq_en", MessageId(295)).unwrap();

    let publisher = publisher_against(&server, Arc::clone(&ledger)).await;
    let new_id = publisher
        .publish_replacing(
            "main_menu_en",
            PagePayload::Text("body".to_string()),
            InlineKeyboardMarkup::default(),
            Some(MessageId(295)),
        )
        .await
        .unwrap();

    assert_eq!(new_id, MessageId(301));
    assert_eq!(ledger.all_messages(), vec![MessageId(301)]);
}

#[tokio::test]
async fn pin_failure_does_not_fail_the_welcome_publish() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/sendmessage$"))
        .respond_with(NextMessageId(AtomicI32::new(401)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/pinchatmessage$"))
        .respond_with(pin_forbidden())
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(LedgerStore::open(dir.path().join("ledger.json")));

    let publisher = publisher_against(&server, Arc::clone(&ledger)).await;
    let id = publisher
        .publish_pinned_welcome(PagePayload::Text("welcome".to_string()), InlineKeyboardMarkup::default())
        .await
        .unwrap();

    assert_eq!(id, MessageId(401));
    assert_eq!(ledger.get("pinned_welcome"), Some(MessageId(401)));
}

#[tokio::test]
async fn sweep_removes_only_confirmed_deletions() {
    let server = MockServer::start().await;
    // First delete succeeds, the rest fail.
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/deletemessage$"))
        .respond_with(delete_ok())
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)/deletemessage$"))
        .respond_with(delete_not_found())
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(LedgerStore::open(dir.path().join("ledger.json")));
    ledger.record("main_menu_en", MessageId(501)).unwrap();
    ledger.record("faq_en", MessageId(502)).unwrap();

    let publisher = publisher_against(&server, Arc::clone(&ledger)).await;
    let deleted = publisher.sweep().await.unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(ledger.all_messages().len(), 1);
}
