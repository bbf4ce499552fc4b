//! 前端消息发布循环。
//!
//! 消费出站信箱并逐条发布到 Centrifugo HTTP API。信箱空闲超过心跳间隔时
//! 发布一条心跳消息，保证频道静默期不超过一个心跳间隔，
//! 前端可据此独立判断链路存活。
//!
//! 传输失败与 API 错误只记录日志，消息不重投。

use std::time::Duration;

use api_contract::{PublishCommand, PublishReply};
use domain::Message;
use opcb_config::CentrifugoConfig;
use opcb_mailbox::Inbox;
use tokio::time::timeout;
use tracing::{error, info, warn};

const HEARTBEAT_TIMEOUT_SECS: u64 = 5;
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// 前端消息发布端。
pub struct FrontendPublisher {
    config: CentrifugoConfig,
    client: reqwest::Client,
    heartbeat_interval: Duration,
}

impl FrontendPublisher {
    pub fn new(config: CentrifugoConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|err| {
                warn!("failed to build HTTP client with timeout, using default: {err}");
                reqwest::Client::default()
            });
        Self {
            config,
            client,
            heartbeat_interval: Duration::from_secs(HEARTBEAT_TIMEOUT_SECS),
        }
    }

    /// 消费信箱并发布，直到全部投递端关闭。
    pub async fn run(self, mut inbox: Inbox<Message>) {
        info!("frontend messaging publisher task running");
        while let Some(message) = next_outbound(&mut inbox, self.heartbeat_interval).await {
            if matches!(message, Message::Heartbeat) {
                opcb_telemetry::record_heartbeat();
            }
            match self.publish(&message).await {
                Ok(reply) => match reply.error {
                    Some(api_error) => {
                        error!(
                            "Centrifugo API error: {} {}",
                            api_error.code, api_error.message
                        );
                        opcb_telemetry::record_frontend_publish_failure();
                    }
                    None => opcb_telemetry::record_frontend_publish_success(),
                },
                Err(err) => {
                    error!("frontend publishing error: {err}");
                    opcb_telemetry::record_frontend_publish_failure();
                }
            }
        }
    }

    async fn publish(&self, message: &Message) -> Result<PublishReply, reqwest::Error> {
        let command = PublishCommand::new(message.channel(), message.frontend_data());
        let response = self
            .client
            .post(self.config.api_url.clone())
            .header(
                "Authorization",
                format!("apikey {}", self.config.api_key.expose()),
            )
            .json(&command)
            .send()
            .await?
            .error_for_status()?;
        response.json().await
    }
}

/// 取下一条要发布的消息。信箱空闲满一个心跳间隔时返回心跳消息，
/// 信箱关闭时返回 `None`。
async fn next_outbound(inbox: &mut Inbox<Message>, heartbeat: Duration) -> Option<Message> {
    match timeout(heartbeat, inbox.recv()).await {
        Ok(message) => message,
        Err(_) => Some(Message::Heartbeat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DataMessage;
    use serde_json::json;

    #[tokio::test]
    async fn idle_inbox_yields_heartbeat() {
        let (_mailbox, mut inbox) = opcb_mailbox::bounded::<Message>("test", 4);
        let message = next_outbound(&mut inbox, Duration::from_millis(20)).await;
        assert_eq!(message, Some(Message::Heartbeat));
    }

    #[tokio::test]
    async fn pending_message_preempts_heartbeat() {
        let (mailbox, mut inbox) = opcb_mailbox::bounded::<Message>("test", 4);
        let data = Message::Data(DataMessage::new("\"n\"", json!({"v": 1})));
        mailbox.put(data.clone());
        let message = next_outbound(&mut inbox, Duration::from_secs(30)).await;
        assert_eq!(message, Some(data));
    }

    #[tokio::test]
    async fn closed_inbox_ends_consumption() {
        let (mailbox, mut inbox) = opcb_mailbox::bounded::<Message>("test", 4);
        drop(mailbox);
        let message = next_outbound(&mut inbox, Duration::from_secs(30)).await;
        assert_eq!(message, None);
    }
}
