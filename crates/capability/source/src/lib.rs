//! 数据源接入能力模块。
//!
//! 对接 OPC-UA 数据源并把变化扇出到下游：
//!
//! ```text
//! SourceTransport ──► SourceClient ──► { LastValueCache, 前端信箱, 时序信箱 }
//! ```
//!
//! 传输层是 trait seam：[`SourceTransport`] / [`SourceSession`] 约定
//! 连接、命名空间解析、类型字典加载、订阅与读值；[`SimTransport`]
//! 是进程内模拟实现。[`SourceClient`] 拥有连接状态机与固定延迟重连循环。

mod client;
mod sim;
mod transport;

pub use client::{
    SERVER_STATE_NODE, SIMATIC_NAMESPACE_URI, SIMATIC_TYPES_DICTIONARY, SourceClient,
};
pub use sim::SimTransport;
pub use transport::{
    DataChangeHandler, SourceSession, SourceTransport, TransportError, url_credentials,
};
