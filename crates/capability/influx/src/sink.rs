//! InfluxDB 写入任务。

use std::time::Duration;

use domain::DataMessage;
use opcb_config::InfluxConfig;
use opcb_mailbox::Inbox;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::codec::{EncodeError, to_line_protocol};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// 写入任务错误。编码失败属于数据契约问题，不重试。
#[derive(Debug, thiserror::Error)]
pub enum InfluxSinkError {
    #[error("invalid write url base: {0}")]
    Url(Url),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// 在基地址的路径后追加 `api/v2/write`，保留已有路径前缀。
fn write_url(base: &Url) -> Result<Url, InfluxSinkError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| InfluxSinkError::Url(base.clone()))?
        .pop_if_empty()
        .extend(["api", "v2", "write"]);
    Ok(url)
}

/// 写入接口的错误响应体。1.8 用 error 字段，2.0 用 message 字段。
#[derive(Debug, Default, Deserialize)]
struct WriteErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// InfluxDB 写入端。
pub struct InfluxSink {
    config: InfluxConfig,
    client: reqwest::Client,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|err| {
                warn!("failed to build HTTP client with timeout, using default: {err}");
                reqwest::Client::default()
            });
        Self { config, client }
    }

    /// 消费信箱并逐条写入，直到全部投递端关闭。
    ///
    /// HTTP 层失败记录日志后继续；编码失败带错误返回。
    pub async fn run(self, mut inbox: Inbox<DataMessage>) -> Result<(), InfluxSinkError> {
        let url = write_url(&self.config.base_url)?;
        info!("influx writer task running");
        while let Some(message) = inbox.recv().await {
            let line_protocol = to_line_protocol(&message)?;
            self.write(&url, line_protocol).await;
        }
        Ok(())
    }

    async fn write(&self, url: &Url, line_protocol: String) {
        let request = self
            .client
            .post(url.clone())
            .query(&[
                ("bucket", self.config.bucket.as_str()),
                ("precision", "s"),
            ])
            .header(
                "Authorization",
                format!("Token {}", self.config.token.expose()),
            )
            .body(line_protocol);
        match request.send().await {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                debug!("influx write accepted");
                opcb_telemetry::record_influx_write_success();
            }
            Ok(response) => {
                let status = response.status();
                let body: WriteErrorBody = response.json().await.unwrap_or_default();
                let reason = body
                    .error
                    .or(body.message)
                    .unwrap_or_else(|| status.to_string());
                error!("write request error: {reason}");
                opcb_telemetry::record_influx_write_failure();
            }
            Err(err) => {
                error!("write request error: {err}");
                opcb_telemetry::record_influx_write_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_url_on_bare_host() {
        let base = Url::parse("http://influx.local:8086").expect("url");
        assert_eq!(
            write_url(&base).expect("write url").as_str(),
            "http://influx.local:8086/api/v2/write"
        );
    }

    #[test]
    fn write_url_keeps_base_path_prefix() {
        let base = Url::parse("http://influx.local:8086/influx").expect("url");
        assert_eq!(
            write_url(&base).expect("write url").as_str(),
            "http://influx.local:8086/influx/api/v2/write"
        );
    }

    #[test]
    fn write_url_tolerates_trailing_slash() {
        let base = Url::parse("http://influx.local:8086/influx/").expect("url");
        assert_eq!(
            write_url(&base).expect("write url").as_str(),
            "http://influx.local:8086/influx/api/v2/write"
        );
    }
}
