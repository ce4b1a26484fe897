use std::path::PathBuf;

use assert_matches::assert_matches;
use serde_json::json;

use crate::core::client::queue::{QueueClient, QueueClientExt, QueueError};
use crate::core::client::InMemoryQueue;
use crate::tests::config::TEST_SERVICE;
use crate::types::deployment::ContractReindex;
use crate::types::queue::QueueType;
use crate::types::task::{TaskKind, TaskMessage};

fn message() -> TaskMessage {
    TaskMessage {
        id: 42,
        kind: TaskKind::Verification,
        files: vec![PathBuf::from("/var/verifier/task-x/a.mligo")],
        dir: PathBuf::from("/var/verifier/task-x"),
    }
}

#[test]
fn task_message_wire_format() {
    let encoded = serde_json::to_value(message()).unwrap();
    assert_eq!(
        encoded,
        json!({
            "ID": 42,
            "Kind": "verification",
            "Files": ["/var/verifier/task-x/a.mligo"],
            "Dir": "/var/verifier/task-x",
        })
    );
}

#[test]
fn queue_names_are_namespaced_per_service() {
    assert_eq!(QueueType::Compilations.routing_key(), "compilations");
    assert_eq!(QueueType::Contracts.namespaced("indexer"), "contracts.indexer");
}

#[tokio::test]
async fn every_bound_service_receives_its_own_copy() {
    let queue = InMemoryQueue::new(TEST_SERVICE).await.unwrap();
    queue.bind(QueueType::Contracts, "indexer").await.unwrap();

    let reindex = ContractReindex { address: "KT1abc".to_string(), network: "ghostnet".to_string() };
    queue.send_raw(QueueType::Contracts, serde_json::to_vec(&reindex).unwrap()).await.unwrap();

    let own = queue.consume_message_from_queue(QueueType::Contracts).await.unwrap();
    let indexer = queue.consume_as(QueueType::Contracts, "indexer").await.unwrap();
    assert_eq!(own.payload::<ContractReindex>().unwrap(), reindex);
    assert_eq!(indexer.payload::<ContractReindex>().unwrap(), reindex);
    own.ack().await.unwrap();
    indexer.ack().await.unwrap();

    // compilations are not bound to the indexer
    assert_matches!(
        queue.consume_as(QueueType::Compilations, "indexer").await,
        Err(QueueError::QueueNotFound(name)) if name == "compilations.indexer"
    );
}

#[tokio::test]
async fn nack_puts_the_message_back() {
    let queue = InMemoryQueue::new(TEST_SERVICE).await.unwrap();
    queue.send(&message()).await.unwrap();

    let first = queue.consume_message_from_queue(QueueType::Compilations).await.unwrap();
    assert_eq!(first.routing_key(), "compilations");
    first.nack().await.unwrap();

    let second = queue.consume_message_from_queue(QueueType::Compilations).await.unwrap();
    assert_eq!(second.payload::<TaskMessage>().unwrap(), message());
    second.ack().await.unwrap();

    assert_matches!(queue.consume_message_from_queue(QueueType::Compilations).await, Err(e) if e.is_no_data());
}

#[tokio::test]
async fn undecodable_payload_is_a_serialization_error() {
    let queue = InMemoryQueue::new(TEST_SERVICE).await.unwrap();
    queue.send_raw(QueueType::Compilations, b"{\"ID\":\"not a number\"}".to_vec()).await.unwrap();

    let delivery = queue.consume_message_from_queue(QueueType::Compilations).await.unwrap();
    assert_matches!(delivery.payload::<TaskMessage>(), Err(QueueError::SerializationError(_)));
    delivery.ack().await.unwrap();
}
