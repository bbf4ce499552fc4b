//! 组件间交换的消息模型。
//!
//! 所有消息共用一个带判别字段（`message_type`）的联合类型，
//! 发往前端的数据取序列化结果并去掉判别字段。

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// 代理频道前缀：数据与状态频道经 Centrifugo 代理转发，心跳频道不加前缀。
pub const PROXIED_CHANNEL_PREFIX: &str = "proxied:";

/// 消息类型判别值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    OpcData,
    OpcStatus,
    Heartbeat,
}

impl MessageKind {
    /// 判别值的线上表示。
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::OpcData => "opc_data",
            MessageKind::OpcStatus => "opc_status",
            MessageKind::Heartbeat => "heartbeat",
        }
    }

    /// 该消息类型对应的 Centrifugo 频道名。
    pub fn channel(self) -> String {
        match self {
            MessageKind::OpcData | MessageKind::OpcStatus => {
                format!("{}{}", PROXIED_CHANNEL_PREFIX, self.as_str())
            }
            MessageKind::Heartbeat => self.as_str().to_string(),
        }
    }
}

/// 数据源链路状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkStatus {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

/// 单个监控节点的数据变化消息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMessage {
    /// 数据源节点 ID（不透明字符串，作为缓存键）。
    pub node_id: String,
    /// 解码后的节点值：标量、对象或对象列表，不会是 null。
    pub payload: Value,
}

impl DataMessage {
    pub fn new(node_id: impl Into<String>, payload: Value) -> Self {
        Self {
            node_id: node_id.into(),
            payload,
        }
    }
}

/// 应用消息联合类型，判别字段为 `message_type`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type")]
pub enum Message {
    #[serde(rename = "opc_data")]
    Data(DataMessage),
    #[serde(rename = "opc_status")]
    Status { payload: LinkStatus },
    #[serde(rename = "heartbeat")]
    Heartbeat,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Data(_) => MessageKind::OpcData,
            Message::Status { .. } => MessageKind::OpcStatus,
            Message::Heartbeat => MessageKind::Heartbeat,
        }
    }

    /// 消息发布的目标频道名。
    pub fn channel(&self) -> String {
        self.kind().channel()
    }

    /// 前端数据表示：除判别字段以外的全部字段。
    pub fn frontend_data(&self) -> Value {
        match self {
            Message::Data(data) => json!({
                "node_id": data.node_id,
                "payload": data.payload,
            }),
            Message::Status { payload } => json!({ "payload": payload }),
            Message::Heartbeat => json!({}),
        }
    }
}

impl From<DataMessage> for Message {
    fn from(message: DataMessage) -> Self {
        Message::Data(message)
    }
}
