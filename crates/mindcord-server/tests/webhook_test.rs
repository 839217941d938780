//! Webhook delivery against a local receiver.

use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use mindcord_core::DeliverySink;
use mindcord_server::webhook::{verify_signature, SIGNATURE_HEADER};
use mindcord_server::{ChannelDirectory, WebhookConfig, WebhookSink};
use serde_json::Value;

#[derive(Clone, Default)]
struct Received {
    calls: Arc<Mutex<Vec<(Option<String>, String)>>>,
}

/// Start a receiver answering every POST with `status`.
async fn receiver(status: StatusCode) -> (String, Received) {
    let received = Received::default();
    let calls = received.calls.clone();
    let app = Router::new().route(
        "/hook",
        post(move |headers: HeaderMap, body: String| {
            let calls = calls.clone();
            async move {
                let signature = headers
                    .get(SIGNATURE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                calls.lock().unwrap().push((signature, body));
                status
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/hook", addr), received)
}

#[tokio::test]
async fn test_signed_message_delivery() {
    let (url, received) = receiver(StatusCode::OK).await;
    let sink = WebhookSink::new(
        WebhookConfig::new(url).with_secret("hook-secret"),
        Arc::new(ChannelDirectory::new()),
    )
    .unwrap();

    sink.send("c1", "hello there").await.unwrap();

    let calls = received.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (signature, body) = &calls[0];
    assert!(verify_signature(body, "hook-secret", signature.as_deref().unwrap()));

    let json: Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["type"], "message");
    assert_eq!(json["channel_id"], "c1");
    assert_eq!(json["text"], "hello there");
}

#[tokio::test]
async fn test_rejected_delivery_is_not_retried() {
    let (url, received) = receiver(StatusCode::SERVICE_UNAVAILABLE).await;
    let sink = WebhookSink::new(WebhookConfig::new(url), Arc::new(ChannelDirectory::new())).unwrap();

    let err = sink.send("c1", "hello").await.unwrap_err();
    assert!(err.is_delivery());

    let calls = received.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.is_none());
}

#[tokio::test]
async fn test_typing_events_when_enabled() {
    let (url, received) = receiver(StatusCode::NO_CONTENT).await;
    let mut config = WebhookConfig::new(url);
    config.typing_events = true;
    let sink = WebhookSink::new(config, Arc::new(ChannelDirectory::new())).unwrap();

    sink.send_typing_indicator("c9").await.unwrap();

    let calls = received.calls.lock().unwrap().clone();
    let json: Value = serde_json::from_str(&calls[0].1).unwrap();
    assert_eq!(json, serde_json::json!({"type": "typing", "channel_id": "c9"}));
}
