//! 数据源客户端任务与重连监督循环。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use domain::{DataMessage, LinkStatus, Message};
use opcb_cache::LastValueCache;
use opcb_config::OpcConfig;
use opcb_mailbox::Mailbox;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info};

use crate::transport::{DataChangeHandler, SourceSession, SourceTransport, TransportError};

/// 西门子 S7 OPC-UA 命名空间 URI。
pub const SIMATIC_NAMESPACE_URI: &str = "http://www.siemens.com/simatic-s7-opcua";
/// 结构化类型字典节点名。
pub const SIMATIC_TYPES_DICTIONARY: &str = "SimaticStructures";
/// 服务器状态节点地址，读取它探测静默断连。
pub const SERVER_STATE_NODE: &str = "i=2259";

const SUBSCRIPTION_PERIOD: Duration = Duration::from_millis(1000);
const SERVER_STATE_POLL_SECS: u64 = 5;

/// 数据变化与状态翻转的扇出：写缓存、投前端信箱、记录节点再投时序信箱。
struct MessageFanout {
    cache: Arc<LastValueCache>,
    frontend: Mailbox<Message>,
    influx: Mailbox<DataMessage>,
    record_nodes: HashSet<String>,
}

impl MessageFanout {
    /// 记录链路状态。非 Up 状态先清缓存；状态总是写入缓存，
    /// 只在实际翻转时向前端发布一条状态消息。
    fn set_status(&self, status: LinkStatus) {
        if status != LinkStatus::Up {
            if let Err(err) = self.cache.clear() {
                error!("cache clear failed: {err}");
            }
        }
        let previous = self.cache.status();
        self.cache.set_status(status);
        if status != previous {
            self.frontend.put(Message::Status { payload: status });
            opcb_telemetry::record_status_transition();
        }
    }
}

impl DataChangeHandler for MessageFanout {
    fn on_data_change(&self, node_id: &str, value: Value) {
        debug!("datachange notification for {node_id} {value}");
        self.set_status(LinkStatus::Up);
        let message = DataMessage::new(node_id, value);
        if let Err(err) = self.cache.record(message.clone()) {
            error!("cache record failed: {err}");
        }
        self.frontend.put(Message::Data(message.clone()));
        if self.record_nodes.contains(node_id) {
            self.influx.put(message);
        }
        opcb_telemetry::record_data_change();
    }
}

/// 数据源客户端：连接、类型发现、订阅、存活轮询，外加固定延迟重连。
pub struct SourceClient {
    config: OpcConfig,
    transport: Arc<dyn SourceTransport>,
    fanout: Arc<MessageFanout>,
}

impl SourceClient {
    pub fn new(
        config: OpcConfig,
        transport: Arc<dyn SourceTransport>,
        cache: Arc<LastValueCache>,
        frontend: Mailbox<Message>,
        influx: Mailbox<DataMessage>,
    ) -> Self {
        let record_nodes = config.record_nodes.iter().cloned().collect();
        Self {
            fanout: Arc::new(MessageFanout {
                cache,
                frontend,
                influx,
                record_nodes,
            }),
            config,
            transport,
        }
    }

    /// 重连监督循环。连接层与超时错误按固定延迟重试，其余错误直接返回。
    pub async fn run(self) -> Result<(), TransportError> {
        info!("OPC client task running");
        loop {
            let err = match self.attempt().await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            if !err.retryable() {
                return Err(err);
            }
            self.fanout.set_status(LinkStatus::Down);
            info!(
                "Retrying OPC client task in {} seconds as it raised: {}",
                self.config.retry_delay_seconds, err
            );
            opcb_telemetry::record_source_retry();
            sleep(Duration::from_secs(self.config.retry_delay_seconds)).await;
        }
    }

    /// 单次连接尝试：连接、类型发现各一次，订阅全部节点，
    /// 然后并发运行两个轮询循环直到其一出错。
    async fn attempt(&self) -> Result<(), TransportError> {
        let session = self.transport.connect(&self.config).await?;
        let ns = session.namespace_index(SIMATIC_NAMESPACE_URI).await?;
        session
            .load_type_dictionary(ns, SIMATIC_TYPES_DICTIONARY)
            .await?;

        let node_ids: Vec<&String> = self
            .config
            .monitor_nodes
            .iter()
            .chain(&self.config.record_nodes)
            .collect();
        let addresses: Vec<String> = node_ids
            .iter()
            .map(|node_id| format!("ns={ns};s={node_id}"))
            .collect();
        let results = session
            .subscribe_data_change(SUBSCRIPTION_PERIOD, &addresses, self.fanout.clone())
            .await?;
        for (node_id, result) in node_ids.iter().zip(results) {
            if let Err(err) = result {
                error!("Error subscribing to node {node_id}: {err}");
                return Err(err);
            }
        }

        tokio::try_join!(
            self.poll_server_state(&session),
            self.poll_record_values(&session, ns),
        )?;
        Ok(())
    }

    /// 以固定间隔读服务器状态节点，读不到视为连接已失效。
    async fn poll_server_state(
        &self,
        session: &Arc<dyn SourceSession>,
    ) -> Result<(), TransportError> {
        loop {
            sleep(Duration::from_secs(SERVER_STATE_POLL_SECS)).await;
            session.read_value(SERVER_STATE_NODE).await?;
        }
    }

    /// 按配置间隔主动读取记录节点并推给时序写入端。
    /// 睡眠时长扣除本轮读取耗时，保持墙钟周期稳定。
    async fn poll_record_values(
        &self,
        session: &Arc<dyn SourceSession>,
        ns: u16,
    ) -> Result<(), TransportError> {
        let interval = Duration::from_secs(self.config.record_interval_seconds);
        loop {
            let started = Instant::now();
            for node_id in &self.config.record_nodes {
                let value = session.read_value(&format!("ns={ns};s={node_id}")).await?;
                self.fanout
                    .influx
                    .put(DataMessage::new(node_id.clone(), value));
            }
            sleep(interval.saturating_sub(started.elapsed())).await;
        }
    }
}
