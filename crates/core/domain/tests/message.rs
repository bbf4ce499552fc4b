use domain::{DataMessage, LinkStatus, Message, MessageKind};
use serde_json::json;

#[test]
fn data_message_serializes_with_discriminant() {
    let message = Message::Data(DataMessage::new("\"Global_DB\".\"sensors\"", json!({"a": 1})));
    let value = serde_json::to_value(&message).expect("serialize");
    assert_eq!(value["message_type"], "opc_data");
    assert_eq!(value["node_id"], "\"Global_DB\".\"sensors\"");
    assert_eq!(value["payload"], json!({"a": 1}));
}

#[test]
fn status_message_serializes_link_status_uppercase() {
    let message = Message::Status {
        payload: LinkStatus::Up,
    };
    let value = serde_json::to_value(&message).expect("serialize");
    assert_eq!(value["message_type"], "opc_status");
    assert_eq!(value["payload"], "UP");

    let message = Message::Status {
        payload: LinkStatus::Down,
    };
    let value = serde_json::to_value(&message).expect("serialize");
    assert_eq!(value["payload"], "DOWN");
}

#[test]
fn heartbeat_serializes_as_bare_discriminant() {
    let value = serde_json::to_value(Message::Heartbeat).expect("serialize");
    assert_eq!(value, json!({ "message_type": "heartbeat" }));
}

#[test]
fn frontend_data_drops_discriminant() {
    let message = Message::Data(DataMessage::new("node-1", json!([{"x": 2}])));
    let data = message.frontend_data();
    assert!(data.get("message_type").is_none());
    assert_eq!(data["node_id"], "node-1");
    assert_eq!(data["payload"], json!([{"x": 2}]));

    let status = Message::Status {
        payload: LinkStatus::Down,
    };
    assert_eq!(status.frontend_data(), json!({ "payload": "DOWN" }));
    assert_eq!(Message::Heartbeat.frontend_data(), json!({}));
}

#[test]
fn proxied_channels_carry_prefix() {
    assert_eq!(MessageKind::OpcData.channel(), "proxied:opc_data");
    assert_eq!(MessageKind::OpcStatus.channel(), "proxied:opc_status");
    assert_eq!(MessageKind::Heartbeat.channel(), "heartbeat");
}

#[test]
fn message_channel_follows_kind() {
    let message = Message::Data(DataMessage::new("node-1", json!(1)));
    assert_eq!(message.channel(), "proxied:opc_data");
    assert_eq!(Message::Heartbeat.channel(), "heartbeat");
}
