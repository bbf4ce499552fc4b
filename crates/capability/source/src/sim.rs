//! 进程内模拟传输实现。
//!
//! 不走网络，按订阅周期为每个节点产生合成对象值，供本地接线验证
//! 与测试使用。真实部署时在同一 seam 上换成厂商 OPC-UA 客户端库。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use opcb_config::OpcConfig;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::transport::{
    DataChangeHandler, SourceSession, SourceTransport, TransportError, url_credentials,
};

/// 模拟传输。每次 `connect` 产生一个独立会话。
#[derive(Debug, Default)]
pub struct SimTransport;

impl SimTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceTransport for SimTransport {
    async fn connect(&self, config: &OpcConfig) -> Result<Arc<dyn SourceSession>, TransportError> {
        match url_credentials(&config.server_url) {
            Some((user, _)) => info!("simulated connection to {} as {user}", config.server_url),
            None => info!("simulated anonymous connection to {}", config.server_url),
        }
        if config.cert_file.is_some() {
            debug!("simulated transport encryption enabled");
        }
        Ok(Arc::new(SimSession::default()))
    }
}

/// 模拟会话。订阅在后台任务中按周期推送通知，会话销毁时任务一并终止。
#[derive(Debug, Default)]
struct SimSession {
    ticks: AtomicU64,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
}

impl SimSession {
    fn value_for(node_id: &str, tick: u64) -> Value {
        json!({ "node": node_id, "tick": tick, "simulated": true })
    }
}

/// 去掉 `ns=..;s=` 包装，还原节点标识符。
fn node_identifier(address: &str) -> &str {
    address
        .rsplit_once(";s=")
        .map(|(_, identifier)| identifier)
        .unwrap_or(address)
}

#[async_trait]
impl SourceSession for SimSession {
    async fn namespace_index(&self, _uri: &str) -> Result<u16, TransportError> {
        Ok(3)
    }

    async fn load_type_dictionary(&self, _ns: u16, _name: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn subscribe_data_change(
        &self,
        period: Duration,
        node_addresses: &[String],
        handler: Arc<dyn DataChangeHandler>,
    ) -> Result<Vec<Result<(), TransportError>>, TransportError> {
        let addresses: Vec<String> = node_addresses.to_vec();
        let task = tokio::spawn(async move {
            let mut tick: u64 = 0;
            loop {
                for address in &addresses {
                    let node_id = node_identifier(address);
                    handler.on_data_change(node_id, SimSession::value_for(node_id, tick));
                }
                tick += 1;
                tokio::time::sleep(period).await;
            }
        });
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscriptions.push(task);
        Ok(node_addresses.iter().map(|_| Ok(())).collect())
    }

    async fn read_value(&self, node_address: &str) -> Result<Value, TransportError> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        let node_id = node_identifier(node_address);
        Ok(Self::value_for(node_id, tick))
    }
}

impl Drop for SimSession {
    fn drop(&mut self) {
        let subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for task in subscriptions.iter() {
            task.abort();
        }
    }
}
