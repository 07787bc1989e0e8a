//! Webhook intake tests: secret validation, body decoding, queueing.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::mpsc;
use tower::ServiceExt;

use vitrina::telegram::{webhook_router, WebhookState, SECRET_TOKEN_HEADER};

fn minimal_update() -> String {
    serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 1,
            "date": 1_700_000_000,
            "chat": { "id": 42, "type": "private", "first_name": "A" },
            "from": { "id": 42, "is_bot": false, "first_name": "A" },
            "text": "/start"
        }
    })
    .to_string()
}

fn router_with_secret(secret: Option<&str>) -> (axum::Router, mpsc::Receiver<teloxide::types::Update>) {
    let (tx, rx) = mpsc::channel(8);
    let router = webhook_router(WebhookState { secret: secret.map(str::to_string), updates: tx });
    (router, rx)
}

fn post(body: String, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/webhook");
    if let Some(s) = secret {
        builder = builder.header(SECRET_TOKEN_HEADER, s);
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn valid_delivery_is_queued() {
    let (router, mut rx) = router_with_secret(Some("s3cret"));

    let response = router.oneshot(post(minimal_update(), Some("s3cret"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let update = rx.try_recv().expect("update should be queued");
    assert_eq!(update.id.0, 1);
}

#[tokio::test]
async fn wrong_secret_is_rejected_with_401() {
    let (router, mut rx) = router_with_secret(Some("s3cret"));

    let response = router.oneshot(post(minimal_update(), Some("wrong"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn missing_secret_header_is_rejected_with_401() {
    let (router, mut rx) = router_with_secret(Some("s3cret"));

    let response = router.oneshot(post(minimal_update(), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn undecodable_body_is_rejected_with_400() {
    let (router, mut rx) = router_with_secret(Some("s3cret"));

    let response = router.oneshot(post("{not an update".to_string(), Some("s3cret"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn without_configured_secret_every_delivery_is_accepted() {
    let (router, mut rx) = router_with_secret(None);

    let response = router.oneshot(post(minimal_update(), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn health_probe_reports_ok() {
    let (router, _rx) = router_with_secret(Some("s3cret"));

    let request = Request::builder().method("GET").uri("/webhook").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["secret_configured"], true);
    // The probe reports configuration as booleans, never values.
    assert!(body.get("secret").is_none());
    assert!(body.get("token").is_none());
}
