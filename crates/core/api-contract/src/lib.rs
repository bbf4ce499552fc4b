//! 稳定的外部接口契约。
//!
//! 覆盖三个外部面：Centrifugo 服务端 API 的 publish 命令、
//! Centrifugo 订阅代理回调的请求/响应体、指标快照 DTO。

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// 订阅代理回调的应用级错误码：未知频道。
pub const UNKNOWN_CHANNEL_CODE: u32 = 102;

/// Centrifugo 服务端 HTTP API 的 publish 命令。
#[derive(Debug, Serialize)]
pub struct PublishCommand {
    pub method: &'static str,
    pub params: PublishParams,
}

/// publish 命令参数。
#[derive(Debug, Serialize)]
pub struct PublishParams {
    pub channel: String,
    pub data: Value,
}

impl PublishCommand {
    pub fn new(channel: impl Into<String>, data: Value) -> Self {
        Self {
            method: "publish",
            params: PublishParams {
                channel: channel.into(),
                data,
            },
        }
    }
}

/// Centrifugo API 错误体（publish 响应与订阅回调响应共用）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayError {
    pub code: u32,
    pub message: String,
}

/// publish 命令的响应体，只关心内嵌的错误。
#[derive(Debug, Deserialize)]
pub struct PublishReply {
    #[serde(default)]
    pub error: Option<RelayError>,
}

/// 订阅代理回调请求体。
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub channel: Option<String>,
}

/// 订阅代理回调响应体：`{"result": {}}` 或 `{"error": {...}}`。
#[derive(Debug, Serialize)]
pub struct SubscribeReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RelayError>,
}

impl SubscribeReply {
    pub fn ok() -> Self {
        Self {
            result: Some(json!({})),
            error: None,
        }
    }

    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RelayError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// 指标快照返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub data_changes: u64,
    pub status_transitions: u64,
    pub heartbeats: u64,
    pub frontend_publish_success: u64,
    pub frontend_publish_failure: u64,
    pub influx_write_success: u64,
    pub influx_write_failure: u64,
    pub mailbox_dropped: u64,
    pub source_retries: u64,
    pub replay_requests: u64,
}
