//! 组件间消息信箱。
//!
//! 两种形态：
//! - [`Mailbox`] / [`Inbox`]：有界队列，投递永不阻塞，满时丢弃最新消息并记录日志；
//! - [`LatestCell`]：单槽覆盖位，只保留最新一条，覆盖时不记录日志。
//!
//! 数据采集路径不能因为下游消费慢而停顿，过载时宁可丢数据。

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, error};

/// 信箱默认容量。
pub const DEFAULT_CAPACITY: usize = 10;

/// 创建一对信箱句柄，`purpose` 用于丢弃日志中标识消费方。
pub fn bounded<T>(purpose: &'static str, capacity: usize) -> (Mailbox<T>, Inbox<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Mailbox { purpose, tx }, Inbox { rx })
}

/// 信箱投递端。克隆共享同一队列。
#[derive(Debug)]
pub struct Mailbox<T> {
    purpose: &'static str,
    tx: mpsc::Sender<T>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            purpose: self.purpose,
            tx: self.tx.clone(),
        }
    }
}

impl<T> Mailbox<T> {
    /// 非阻塞投递。队列满时丢弃本条消息，调用方不会得到错误。
    pub fn put(&self, message: T) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                error!("{} message queue full, message discarded", self.purpose);
                opcb_telemetry::record_mailbox_dropped();
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("{} consumer gone, message discarded", self.purpose);
            }
        }
    }
}

/// 信箱消费端。
#[derive(Debug)]
pub struct Inbox<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> Inbox<T> {
    /// 等待下一条消息；全部投递端关闭后返回 `None`。
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

/// 单槽覆盖位。投递替换旧值，读取可窥视或取走。
///
/// 槽位内容只整体替换，锁中毒后槽内值仍然完整，可直接继续使用。
#[derive(Debug, Default)]
pub struct LatestCell<T> {
    slot: Mutex<Option<T>>,
}

impl<T> LatestCell<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// 投递，静默覆盖旧值。
    pub fn put(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(value);
    }

    /// 取走当前值，槽位清空。
    pub fn take(&self) -> Option<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }
}

impl<T: Clone> LatestCell<T> {
    /// 窥视当前值，槽位保持不变。
    pub fn get(&self) -> Option<T> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_recv_in_order() {
        let (mailbox, mut inbox) = bounded::<u32>("test", 4);
        mailbox.put(1);
        mailbox.put(2);
        assert_eq!(inbox.recv().await, Some(1));
        assert_eq!(inbox.recv().await, Some(2));
    }

    fn dropped_count() -> u64 {
        opcb_telemetry::metrics().snapshot().mailbox_dropped
    }

    #[tokio::test]
    async fn full_mailbox_drops_newest() {
        let (mailbox, mut inbox) = bounded::<u32>("test", 2);
        let dropped_before = dropped_count();
        mailbox.put(1);
        mailbox.put(2);
        // 容量内投递不计丢弃
        assert_eq!(dropped_count(), dropped_before);
        // 满后每次投递丢弃恰好一条
        mailbox.put(3);
        assert_eq!(dropped_count(), dropped_before + 1);
        mailbox.put(4);
        assert_eq!(dropped_count(), dropped_before + 2);

        assert_eq!(inbox.recv().await, Some(1));
        assert_eq!(inbox.recv().await, Some(2));
        drop(mailbox);
        assert_eq!(inbox.recv().await, None);
    }

    #[tokio::test]
    async fn put_after_inbox_dropped_is_silent() {
        let (mailbox, inbox) = bounded::<u32>("test", 2);
        drop(inbox);
        mailbox.put(1);
    }

    #[test]
    fn latest_cell_overwrites() {
        let cell = LatestCell::new();
        cell.put(1);
        cell.put(2);
        assert_eq!(cell.get(), Some(2));
        assert_eq!(cell.take(), Some(2));
        assert_eq!(cell.take(), None);
    }

    #[test]
    fn latest_cell_get_keeps_value() {
        let cell = LatestCell::new();
        cell.put("latest");
        assert_eq!(cell.get(), Some("latest"));
        assert_eq!(cell.get(), Some("latest"));
    }
}
