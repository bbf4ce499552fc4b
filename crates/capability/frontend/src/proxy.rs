//! Centrifugo 订阅代理服务器。
//!
//! Centrifugo 在客户端订阅代理频道时回调 `/centrifugo/subscribe`，
//! 这里据频道名触发缓存回放。未知频道返回应用级错误体（HTTP 仍为 200），
//! 让 Centrifugo 把错误透传给订阅方；格式错误的请求体返回 400，
//! 无法解码的请求体返回 500。

use std::sync::Arc;

use api_contract::{MetricsSnapshotDto, SubscribeReply, SubscribeRequest, UNKNOWN_CHANNEL_CODE};
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use domain::{Message, MessageKind};
use opcb_cache::LastValueCache;
use opcb_config::CentrifugoConfig;
use opcb_mailbox::Mailbox;
use serde_json::Value;
use tracing::{Instrument, error, info};

/// 代理服务器共享状态。
#[derive(Clone)]
struct ProxyState {
    cache: Arc<LastValueCache>,
    outbound: Mailbox<Message>,
}

/// 订阅代理服务器任务。
pub struct SubscriptionProxy {
    config: CentrifugoConfig,
    state: ProxyState,
}

impl SubscriptionProxy {
    pub fn new(
        config: CentrifugoConfig,
        cache: Arc<LastValueCache>,
        outbound: Mailbox<Message>,
    ) -> Self {
        Self {
            config,
            state: ProxyState { cache, outbound },
        }
    }

    /// 代理服务器的路由表。独立出来便于不经监听端口直接测试。
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// 监听配置的地址并服务请求，直到任务被取消。
    pub async fn run(self) -> Result<(), std::io::Error> {
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind((
            self.config.proxy_host.as_str(),
            self.config.proxy_port,
        ))
        .await?;
        info!(
            "Centrifugo proxy server started on {}:{}",
            self.config.proxy_host, self.config.proxy_port
        );
        axum::serve(listener, app).await
    }
}

fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/centrifugo/subscribe", post(centrifugo_subscribe))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn get_metrics() -> Response {
    let snapshot = opcb_telemetry::metrics().snapshot();
    (
        StatusCode::OK,
        Json(MetricsSnapshotDto {
            data_changes: snapshot.data_changes,
            status_transitions: snapshot.status_transitions,
            heartbeats: snapshot.heartbeats,
            frontend_publish_success: snapshot.frontend_publish_success,
            frontend_publish_failure: snapshot.frontend_publish_failure,
            influx_write_success: snapshot.influx_write_success,
            influx_write_failure: snapshot.influx_write_failure,
            mailbox_dropped: snapshot.mailbox_dropped,
            source_retries: snapshot.source_retries,
            replay_requests: snapshot.replay_requests,
        }),
    )
        .into_response()
}

async fn centrifugo_subscribe(State(state): State<ProxyState>, body: String) -> Response {
    let context: Value = match serde_json::from_str(&body) {
        Ok(context) => context,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "JSON decode error").into_response();
        }
    };
    if !context.is_object() {
        return (StatusCode::BAD_REQUEST, "Bad request format").into_response();
    }
    let request: SubscribeRequest = match serde_json::from_value(context) {
        Ok(request) => request,
        Err(_) => return (StatusCode::BAD_REQUEST, "Bad request format").into_response(),
    };
    let Some(channel) = request.channel.as_deref() else {
        return (StatusCode::BAD_REQUEST, "Missing channel field").into_response();
    };

    // Centrifugo 回调携带去掉命名空间前缀的频道名
    if channel == MessageKind::OpcData.as_str() {
        opcb_telemetry::record_replay_request();
        if let Err(err) = state.cache.replay_data_into(&state.outbound) {
            error!("data replay failed: {err}");
        }
    } else if channel == MessageKind::OpcStatus.as_str() {
        opcb_telemetry::record_replay_request();
        state.cache.replay_status_into(&state.outbound);
    } else {
        return Json(SubscribeReply::error(UNKNOWN_CHANNEL_CODE, "unknown channel"))
            .into_response();
    }
    Json(SubscribeReply::ok()).into_response()
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = opcb_telemetry::new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
