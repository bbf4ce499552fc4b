use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use domain::{DataMessage, LinkStatus, Message};
use http_body_util::BodyExt;
use opcb_cache::LastValueCache;
use opcb_config::{CentrifugoConfig, Secret};
use opcb_frontend::SubscriptionProxy;
use opcb_mailbox::{Inbox, Mailbox};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

fn proxy_config() -> CentrifugoConfig {
    CentrifugoConfig {
        api_key: Secret::new("apikey-secret"),
        api_url: Url::parse("http://localhost:8000/api").expect("url"),
        proxy_host: "127.0.0.1".to_string(),
        proxy_port: 8008,
    }
}

fn build_proxy() -> (SubscriptionProxy, Arc<LastValueCache>, Inbox<Message>) {
    let cache = Arc::new(LastValueCache::new());
    let (mailbox, inbox): (Mailbox<Message>, Inbox<Message>) =
        opcb_mailbox::bounded("proxy test", 10);
    let proxy = SubscriptionProxy::new(proxy_config(), cache.clone(), mailbox);
    (proxy, cache, inbox)
}

fn subscribe_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/centrifugo/subscribe")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn data_channel_subscription_replays_cached_entries() {
    let (proxy, cache, mut inbox) = build_proxy();
    cache
        .record(DataMessage::new("\"Pump\"", json!({"speed": 2})))
        .expect("record");

    let response = proxy
        .router()
        .oneshot(subscribe_request(r#"{"channel":"opc_data"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "result": {} }));

    assert_eq!(
        inbox.recv().await,
        Some(Message::Data(DataMessage::new(
            "\"Pump\"",
            json!({"speed": 2})
        )))
    );
}

#[tokio::test]
async fn status_channel_subscription_replays_current_status() {
    let (proxy, cache, mut inbox) = build_proxy();
    cache.set_status(LinkStatus::Up);

    let response = proxy
        .router()
        .oneshot(subscribe_request(r#"{"channel":"opc_status"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "result": {} }));

    assert_eq!(
        inbox.recv().await,
        Some(Message::Status {
            payload: LinkStatus::Up
        })
    );
}

#[tokio::test]
async fn unknown_channel_yields_structured_error_not_http_error() {
    let (proxy, _cache, _inbox) = build_proxy();

    let response = proxy
        .router()
        .oneshot(subscribe_request(r#"{"channel":"weather"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], 102);
    assert_eq!(body["error"]["message"], "unknown channel");
}

#[tokio::test]
async fn missing_channel_field_is_bad_request() {
    let (proxy, _cache, _inbox) = build_proxy();
    let response = proxy
        .router()
        .oneshot(subscribe_request(r#"{"other":"field"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_object_body_is_bad_request() {
    let (proxy, _cache, _inbox) = build_proxy();
    let response = proxy
        .router()
        .oneshot(subscribe_request(r#""just a string""#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn undecodable_body_is_server_error() {
    let (proxy, _cache, _inbox) = build_proxy();
    let response = proxy
        .router()
        .oneshot(subscribe_request("{not json"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (proxy, _cache, _inbox) = build_proxy();
    let response = proxy
        .router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_json(response).await, json!({ "ok": true }));
}
