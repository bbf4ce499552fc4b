//! 追踪与请求 ID 生成。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
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

/// 基础指标。
pub struct TelemetryMetrics {
    data_changes: AtomicU64,
    status_transitions: AtomicU64,
    heartbeats: AtomicU64,
    frontend_publish_success: AtomicU64,
    frontend_publish_failure: AtomicU64,
    influx_write_success: AtomicU64,
    influx_write_failure: AtomicU64,
    mailbox_dropped: AtomicU64,
    source_retries: AtomicU64,
    replay_requests: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            data_changes: AtomicU64::new(0),
            status_transitions: AtomicU64::new(0),
            heartbeats: AtomicU64::new(0),
            frontend_publish_success: AtomicU64::new(0),
            frontend_publish_failure: AtomicU64::new(0),
            influx_write_success: AtomicU64::new(0),
            influx_write_failure: AtomicU64::new(0),
            mailbox_dropped: AtomicU64::new(0),
            source_retries: AtomicU64::new(0),
            replay_requests: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            data_changes: self.data_changes.load(Ordering::Relaxed),
            status_transitions: self.status_transitions.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            frontend_publish_success: self.frontend_publish_success.load(Ordering::Relaxed),
            frontend_publish_failure: self.frontend_publish_failure.load(Ordering::Relaxed),
            influx_write_success: self.influx_write_success.load(Ordering::Relaxed),
            influx_write_failure: self.influx_write_failure.load(Ordering::Relaxed),
            mailbox_dropped: self.mailbox_dropped.load(Ordering::Relaxed),
            source_retries: self.source_retries.load(Ordering::Relaxed),
            replay_requests: self.replay_requests.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 初始化 tracing（默认 debug，--verbose 时使用）。
pub fn init_tracing_verbose() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录订阅数据变化次数。
pub fn record_data_change() {
    metrics().data_changes.fetch_add(1, Ordering::Relaxed);
}

/// 记录链路状态翻转次数。
pub fn record_status_transition() {
    metrics()
        .status_transitions
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录心跳发布次数。
pub fn record_heartbeat() {
    metrics().heartbeats.fetch_add(1, Ordering::Relaxed);
}

/// 记录前端发布成功次数。
pub fn record_frontend_publish_success() {
    metrics()
        .frontend_publish_success
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录前端发布失败次数。
pub fn record_frontend_publish_failure() {
    metrics()
        .frontend_publish_failure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录时序写入成功次数。
pub fn record_influx_write_success() {
    metrics()
        .influx_write_success
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录时序写入失败次数。
pub fn record_influx_write_failure() {
    metrics()
        .influx_write_failure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录信箱丢弃次数。
pub fn record_mailbox_dropped() {
    metrics().mailbox_dropped.fetch_add(1, Ordering::Relaxed);
}

/// 记录数据源重连次数。
pub fn record_source_retry() {
    metrics().source_retries.fetch_add(1, Ordering::Relaxed);
}

/// 记录订阅回放请求次数。
pub fn record_replay_request() {
    metrics().replay_requests.fetch_add(1, Ordering::Relaxed);
}
