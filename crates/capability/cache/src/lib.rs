//! 最近值缓存。
//!
//! 按节点 ID 保存最近一次数据消息，外加一个链路状态槽位。
//! 新订阅者接入时由代理触发回放，立即拿到当前全量状态。
//! 链路断开时数据条目全部清除，状态槽位保留。

use std::collections::HashMap;
use std::sync::RwLock;

use domain::{DataMessage, LinkStatus, Message};
use opcb_mailbox::{LatestCell, Mailbox};

/// 缓存错误。
#[derive(Debug)]
pub struct CacheError {
    message: String,
}

impl CacheError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CacheError {}

/// 最近值缓存。
pub struct LastValueCache {
    data: RwLock<HashMap<String, DataMessage>>,
    status: LatestCell<LinkStatus>,
}

impl LastValueCache {
    /// 创建缓存，链路状态初始为 Down。
    pub fn new() -> Self {
        let status = LatestCell::new();
        status.put(LinkStatus::Down);
        Self {
            data: RwLock::new(HashMap::new()),
            status,
        }
    }

    /// 按节点 ID 记录最近一条数据消息，同节点覆盖旧值。
    pub fn record(&self, message: DataMessage) -> Result<(), CacheError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| CacheError::new("lock failed"))?;
        data.insert(message.node_id.clone(), message);
        Ok(())
    }

    /// 清除全部数据条目，状态槽位不受影响。
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| CacheError::new("lock failed"))?;
        data.clear();
        Ok(())
    }

    /// 记录当前链路状态，静默覆盖旧值。
    pub fn set_status(&self, status: LinkStatus) {
        self.status.put(status);
    }

    /// 当前链路状态。
    pub fn status(&self) -> LinkStatus {
        self.status.get().unwrap_or(LinkStatus::Down)
    }

    /// 把缓存中的每条数据消息投入目标信箱，顺序不作保证。
    pub fn replay_data_into(&self, mailbox: &Mailbox<Message>) -> Result<(), CacheError> {
        let data = self
            .data
            .read()
            .map_err(|_| CacheError::new("lock failed"))?;
        for message in data.values() {
            mailbox.put(Message::Data(message.clone()));
        }
        Ok(())
    }

    /// 把当前链路状态消息投入目标信箱。
    pub fn replay_status_into(&self, mailbox: &Mailbox<Message>) {
        mailbox.put(Message::Status {
            payload: self.status(),
        });
    }

    /// 数据条目数量（用于测试）。
    pub fn len(&self) -> usize {
        self.data.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LastValueCache {
    fn default() -> Self {
        Self::new()
    }
}
