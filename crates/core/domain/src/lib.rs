pub mod message;

pub use message::{DataMessage, LinkStatus, Message, MessageKind, PROXIED_CHANNEL_PREFIX};
