//! # 时序写入能力模块
//!
//! 把记录节点的数据消息编码为 InfluxDB line protocol 并写入 v2 写入接口。
//!
//! ```text
//! DataMessage ──► flatten ──► InfluxPoint ──► line protocol ──► POST /api/v2/write
//! ```
//!
//! 写入失败只记录日志不重试；编码失败属于数据契约问题，结束写入任务。

mod codec;
mod sink;

pub use codec::{EncodeError, flatten, to_line_protocol};
pub use sink::{InfluxSink, InfluxSinkError};
