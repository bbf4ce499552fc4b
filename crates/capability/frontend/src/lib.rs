//! 前端推送能力模块。
//!
//! 两个协作组件围绕同一个出站信箱工作：
//!
//! ```text
//! 出站信箱 ──► FrontendPublisher ──► Centrifugo publish API
//! Centrifugo subscribe 回调 ──► SubscriptionProxy ──► 缓存回放 ──► 出站信箱
//! ```
//!
//! [`FrontendPublisher`] 消费信箱并发布（空闲时发心跳）；
//! [`SubscriptionProxy`] 在客户端订阅频道时触发最近值回放，
//! 新订阅者不必等下一次数据变化即可拿到当前状态。

mod proxy;
mod publisher;

pub use proxy::SubscriptionProxy;
pub use publisher::FrontendPublisher;
