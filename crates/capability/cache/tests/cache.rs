use domain::{DataMessage, LinkStatus, Message};
use opcb_cache::LastValueCache;
use serde_json::json;

fn sample_message(node_id: &str, value: i64) -> DataMessage {
    DataMessage::new(node_id, json!({ "value": value }))
}

#[test]
fn starts_empty_with_status_down() {
    let cache = LastValueCache::new();
    assert!(cache.is_empty());
    assert_eq!(cache.status(), LinkStatus::Down);
}

#[test]
fn record_upserts_by_node_id() {
    let cache = LastValueCache::new();
    cache.record(sample_message("\"Pump\"", 1)).expect("record");
    cache.record(sample_message("\"Valve\"", 2)).expect("record");
    cache.record(sample_message("\"Pump\"", 3)).expect("record");
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn replay_data_enqueues_every_entry() {
    let cache = LastValueCache::new();
    cache.record(sample_message("\"Pump\"", 1)).expect("record");
    cache.record(sample_message("\"Valve\"", 2)).expect("record");

    let (mailbox, mut inbox) = opcb_mailbox::bounded("test", 10);
    cache.replay_data_into(&mailbox).expect("replay");
    drop(mailbox);

    let mut node_ids = Vec::new();
    while let Some(message) = inbox.recv().await {
        match message {
            Message::Data(data) => node_ids.push(data.node_id),
            other => panic!("unexpected message: {other:?}"),
        }
    }
    node_ids.sort();
    assert_eq!(node_ids, vec!["\"Pump\"", "\"Valve\""]);
}

#[tokio::test]
async fn replay_after_clear_enqueues_nothing() {
    let cache = LastValueCache::new();
    cache.record(sample_message("\"Pump\"", 1)).expect("record");
    cache.clear().expect("clear");

    let (mailbox, mut inbox) = opcb_mailbox::bounded("test", 10);
    cache.replay_data_into(&mailbox).expect("replay");
    drop(mailbox);
    assert_eq!(inbox.recv().await, None);
}

#[tokio::test]
async fn replay_status_enqueues_current_status() {
    let cache = LastValueCache::new();
    let (mailbox, mut inbox) = opcb_mailbox::bounded("test", 10);

    cache.replay_status_into(&mailbox);
    cache.set_status(LinkStatus::Up);
    cache.replay_status_into(&mailbox);
    drop(mailbox);

    assert_eq!(
        inbox.recv().await,
        Some(Message::Status {
            payload: LinkStatus::Down
        })
    );
    assert_eq!(
        inbox.recv().await,
        Some(Message::Status {
            payload: LinkStatus::Up
        })
    );
}

#[test]
fn clear_keeps_status() {
    let cache = LastValueCache::new();
    cache.set_status(LinkStatus::Up);
    cache.record(sample_message("\"Pump\"", 1)).expect("record");
    cache.clear().expect("clear");
    assert_eq!(cache.status(), LinkStatus::Up);
    assert!(cache.is_empty());
}
