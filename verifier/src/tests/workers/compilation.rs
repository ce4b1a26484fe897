use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use mockall::predicate::eq;
use rstest::rstest;
use verifier_chain_client_interface::{ChainClientError, MockChainClient};

use crate::core::client::database::{DatabaseError, MockDatabaseClient};
use crate::core::client::queue::{QueueClient, QueueClientExt};
use crate::core::client::storage::{MockStorageClient, StorageError};
use crate::core::client::InMemoryQueue;
use crate::tests::common::{
    database_with_task, deployment_task, michelson_registry, script, verification_task, write_task_files,
    CONTRACT_ADDRESS, MICHELSON_SOURCE,
};
use crate::tests::config::{TestConfigBuilder, TEST_SERVICE};
use crate::types::queue::QueueType;
use crate::types::task::{CompilationTask, Language, TaskMessage, TaskStatus};
use crate::worker::compilation::{handle_message, handle_task, Settlement};

fn storage_accepting_uploads() -> (MockStorageClient, Arc<Mutex<Vec<String>>>) {
    let keys = Arc::new(Mutex::new(Vec::new()));
    let sink = keys.clone();
    let mut storage = MockStorageClient::new();
    storage.expect_put_data().returning(move |_, key| {
        sink.lock().unwrap().push(key.to_string());
        Ok(format!("s3://contract-artifacts/{key}"))
    });
    (storage, keys)
}

#[rstest]
#[tokio::test]
async fn verification_with_one_match_and_one_mismatch_succeeds(verification_task: CompilationTask) {
    let (database, persisted) = database_with_task(verification_task.clone());
    let (storage, uploads) = storage_accepting_uploads();

    let mut chain = MockChainClient::new();
    chain
        .expect_get_code()
        .withf(|address, level| address.to_string() == CONTRACT_ADDRESS && level.is_none())
        .times(1)
        .returning(|_, _| Ok(script("int")));

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_storage(storage)
        .configure_chain(chain)
        .configure_compilers(michelson_registry(vec![("a.tz", script("int")), ("b.tz", script("nat"))]))
        .build()
        .await;

    let (dir, files) = write_task_files(&test.root(), &[("b.tz", MICHELSON_SOURCE), ("a.tz", MICHELSON_SOURCE)]);
    let message = TaskMessage { id: verification_task.id, kind: verification_task.kind, files, dir: dir.clone() };

    let settlement = handle_task(test.config.clone(), message).await;
    assert_eq!(settlement, Settlement::Ack);

    let (id, status, results) = persisted.lock().unwrap().take().expect("results persisted");
    assert_eq!(id, verification_task.id);
    assert_eq!(status, TaskStatus::Success);
    assert_eq!(results.len(), 2);
    assert_eq!((results[0].file.as_str(), results[0].status), ("a.tz", TaskStatus::Success));
    assert_eq!((results[1].file.as_str(), results[1].status), ("b.tz", TaskStatus::Mismatch));
    assert_eq!(results[0].language, Some(Language::Michelson));
    assert!(results[0].artifact.is_some());
    assert!(results[1].artifact.is_none());

    // only the successful result is uploaded
    assert_eq!(uploads.lock().unwrap().len(), 1);
    assert!(!dir.exists(), "task directory is removed once the outcome is persisted");
}

#[rstest]
#[tokio::test]
async fn verification_with_only_a_compile_error_fails(verification_task: CompilationTask) {
    let (database, persisted) = database_with_task(verification_task.clone());
    let mut chain = MockChainClient::new();
    chain.expect_get_code().never();

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_chain(chain)
        .configure_compilers(michelson_registry(vec![]))
        .build()
        .await;

    let (dir, files) = write_task_files(&test.root(), &[("broken.tz", MICHELSON_SOURCE)]);
    let message = TaskMessage { id: verification_task.id, kind: verification_task.kind, files, dir };

    assert_eq!(handle_task(test.config.clone(), message).await, Settlement::Ack);

    let (_, status, results) = persisted.lock().unwrap().take().expect("results persisted");
    assert_eq!(status, TaskStatus::Failed);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, TaskStatus::Error);
    assert!(results[0].error.contains("Ill typed contract"));
    assert!(results[0].script.is_none());
}

#[rstest]
#[tokio::test]
async fn deployment_with_three_files_uploads_three_artifacts(deployment_task: CompilationTask) {
    let (database, persisted) = database_with_task(deployment_task.clone());
    let (storage, uploads) = storage_accepting_uploads();
    let mut chain = MockChainClient::new();
    chain.expect_get_code().never();

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_storage(storage)
        .configure_chain(chain)
        .configure_compilers(michelson_registry(vec![
            ("one.tz", script("int")),
            ("two.tz", script("nat")),
            ("three.tz", script("unit")),
        ]))
        .build()
        .await;

    let (dir, files) = write_task_files(
        &test.root(),
        &[("one.tz", MICHELSON_SOURCE), ("nested/two.tz", MICHELSON_SOURCE), ("three.tz", MICHELSON_SOURCE)],
    );
    let dir_name = dir.file_name().unwrap().to_string_lossy().into_owned();
    let message = TaskMessage { id: deployment_task.id, kind: deployment_task.kind, files, dir };

    assert_eq!(handle_task(test.config.clone(), message).await, Settlement::Ack);

    let (_, status, results) = persisted.lock().unwrap().take().expect("results persisted");
    assert_eq!(status, TaskStatus::Success);
    assert!(results.iter().all(|r| r.status == TaskStatus::Success));

    let mut keys = uploads.lock().unwrap().clone();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            format!("{dir_name}/nested/two.tz.json"),
            format!("{dir_name}/one.tz.json"),
            format!("{dir_name}/three.tz.json"),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn failing_file_does_not_abort_its_siblings(deployment_task: CompilationTask) {
    let (database, persisted) = database_with_task(deployment_task.clone());
    let (storage, _) = storage_accepting_uploads();

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_storage(storage)
        .configure_compilers(michelson_registry(vec![("a.tz", script("int")), ("c.tz", script("int"))]))
        .build()
        .await;

    let (dir, files) = write_task_files(
        &test.root(),
        &[("a.tz", MICHELSON_SOURCE), ("b.tz", MICHELSON_SOURCE), ("c.tz", MICHELSON_SOURCE)],
    );
    let message = TaskMessage { id: deployment_task.id, kind: deployment_task.kind, files, dir };
    handle_task(test.config.clone(), message).await;

    let (_, status, results) = persisted.lock().unwrap().take().expect("results persisted");
    let statuses: Vec<_> = results.iter().map(|r| (r.file.as_str(), r.status)).collect();
    assert_eq!(
        statuses,
        vec![("a.tz", TaskStatus::Success), ("b.tz", TaskStatus::Error), ("c.tz", TaskStatus::Success)]
    );
    assert_eq!(status, TaskStatus::Success);
}

#[rstest]
#[tokio::test]
async fn content_not_matching_the_extension_is_a_file_error(deployment_task: CompilationTask) {
    let (database, persisted) = database_with_task(deployment_task.clone());
    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_compilers(michelson_registry(vec![("a.tz", script("int"))]))
        .build()
        .await;

    let (dir, files) = write_task_files(&test.root(), &[("a.tz", "let main = fun x -> x")]);
    let message = TaskMessage { id: deployment_task.id, kind: deployment_task.kind, files, dir };
    handle_task(test.config.clone(), message).await;

    let (_, status, results) = persisted.lock().unwrap().take().expect("results persisted");
    assert_eq!(status, TaskStatus::Failed);
    assert!(results[0].error.contains("does not look like a michelson contract"));
}

#[rstest]
#[tokio::test]
async fn chain_failure_is_recorded_per_file(verification_task: CompilationTask) {
    let (database, persisted) = database_with_task(verification_task.clone());
    let mut chain = MockChainClient::new();
    chain.expect_get_code().times(1).returning(|_, _| {
        Err(ChainClientError::NetworkError { operation: "get_code".to_string(), message: "timed out".to_string() })
    });

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_chain(chain)
        .configure_compilers(michelson_registry(vec![("a.tz", script("int")), ("b.tz", script("int"))]))
        .build()
        .await;

    let (dir, files) = write_task_files(&test.root(), &[("a.tz", MICHELSON_SOURCE), ("b.tz", MICHELSON_SOURCE)]);
    let message = TaskMessage { id: verification_task.id, kind: verification_task.kind, files, dir };
    handle_task(test.config.clone(), message).await;

    let (_, status, results) = persisted.lock().unwrap().take().expect("results persisted");
    assert_eq!(status, TaskStatus::Failed);
    assert!(results.iter().all(|r| r.status == TaskStatus::Error && r.error.contains("timed out")));
}

#[rstest]
#[tokio::test]
async fn upload_failure_turns_the_result_into_an_error(deployment_task: CompilationTask) {
    let (database, persisted) = database_with_task(deployment_task.clone());
    let mut storage = MockStorageClient::new();
    storage.expect_put_data().returning(|_, _| Err(StorageError::InvalidBucketName("missing".to_string())));

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_storage(storage)
        .configure_compilers(michelson_registry(vec![("a.tz", script("int"))]))
        .build()
        .await;

    let (dir, files) = write_task_files(&test.root(), &[("a.tz", MICHELSON_SOURCE)]);
    let message = TaskMessage { id: deployment_task.id, kind: deployment_task.kind, files, dir };
    handle_task(test.config.clone(), message).await;

    let (_, status, results) = persisted.lock().unwrap().take().expect("results persisted");
    assert_eq!(status, TaskStatus::Failed);
    assert_eq!(results[0].status, TaskStatus::Error);
    assert!(results[0].error.starts_with("failed to upload artifact"));
}

#[rstest]
#[tokio::test]
async fn missing_task_is_dropped_and_its_directory_removed(deployment_task: CompilationTask) {
    let mut database = MockDatabaseClient::new();
    database.expect_get_task().times(1).returning(|_| Ok(None));
    database.expect_update_task_results().never();

    let test = TestConfigBuilder::new().configure_database(database).build().await;
    let (dir, files) = write_task_files(&test.root(), &[("a.tz", MICHELSON_SOURCE)]);
    let message = TaskMessage { id: deployment_task.id, kind: deployment_task.kind, files, dir: dir.clone() };

    assert_eq!(handle_task(test.config.clone(), message).await, Settlement::Ack);
    assert!(!dir.exists());
}

#[rstest]
#[tokio::test]
async fn unreachable_store_leaves_the_message_for_redelivery(deployment_task: CompilationTask) {
    let mut database = MockDatabaseClient::new();
    database
        .expect_get_task()
        .returning(|_| Err(DatabaseError::UpdateFailed("connection refused".to_string())));

    let test = TestConfigBuilder::new().configure_database(database).build().await;
    let (dir, files) = write_task_files(&test.root(), &[("a.tz", MICHELSON_SOURCE)]);
    let message = TaskMessage { id: deployment_task.id, kind: deployment_task.kind, files, dir: dir.clone() };

    assert_eq!(handle_task(test.config.clone(), message).await, Settlement::Nack);
    assert!(dir.exists(), "sources are kept for the redelivered message");
}

#[rstest]
#[tokio::test]
async fn persistence_failure_redelivers_the_message(deployment_task: CompilationTask) {
    let task = deployment_task.clone();
    let mut database = MockDatabaseClient::new();
    database.expect_get_task().returning(move |_| Ok(Some(task.clone())));
    database
        .expect_update_task_results()
        .times(1)
        .returning(|_, _, _| Err(DatabaseError::UpdateFailed("primary stepped down".to_string())));

    let (storage, _) = storage_accepting_uploads();
    let queue = InMemoryQueue::new(TEST_SERVICE).await.unwrap();
    let test = TestConfigBuilder::new()
        .configure_queue(queue)
        .configure_database(database)
        .configure_storage(storage)
        .configure_compilers(michelson_registry(vec![("a.tz", script("int"))]))
        .build()
        .await;

    let (dir, files) = write_task_files(&test.root(), &[("a.tz", MICHELSON_SOURCE)]);
    let message = TaskMessage { id: deployment_task.id, kind: deployment_task.kind, files, dir: dir.clone() };
    test.config.queue().send(&message).await.unwrap();

    let delivery = test.config.queue().consume_message_from_queue(QueueType::Compilations).await.unwrap();
    handle_message(test.config.clone(), delivery).await;

    let redelivered = test.config.queue().consume_message_from_queue(QueueType::Compilations).await.unwrap();
    assert_eq!(redelivered.payload::<TaskMessage>().unwrap(), message);
    assert!(dir.exists());
}

#[rstest]
#[tokio::test]
async fn undecodable_message_is_acknowledged_and_dropped() {
    let test = TestConfigBuilder::new().build().await;
    test.config.queue().send_raw(QueueType::Compilations, b"not json".to_vec()).await.unwrap();

    let delivery = test.config.queue().consume_message_from_queue(QueueType::Compilations).await.unwrap();
    handle_message(test.config.clone(), delivery).await;

    let next = test.config.queue().consume_message_from_queue(QueueType::Compilations).await;
    assert_matches!(next, Err(e) if e.is_no_data());
}

#[rstest]
#[tokio::test]
async fn panicking_task_is_marked_failed(deployment_task: CompilationTask) {
    let task = deployment_task.clone();
    let mut database = MockDatabaseClient::new();
    database.expect_get_task().returning(move |_| Ok(Some(task.clone())));
    database.expect_update_task_results().never();
    database
        .expect_update_task_status()
        .with(eq(deployment_task.id), eq(TaskStatus::Failed))
        .times(1)
        .returning(|_, _| Ok(()));

    let mut storage = MockStorageClient::new();
    storage.expect_put_data().returning(|_, _| panic!("storage driver bug"));

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_storage(storage)
        .configure_compilers(michelson_registry(vec![("a.tz", script("int"))]))
        .build()
        .await;

    let (dir, files) = write_task_files(&test.root(), &[("a.tz", MICHELSON_SOURCE)]);
    let message = TaskMessage { id: deployment_task.id, kind: deployment_task.kind, files, dir: dir.clone() };

    assert_eq!(handle_task(test.config.clone(), message).await, Settlement::Ack);
    assert!(!dir.exists());
}

#[tokio::test]
async fn message_stream_skips_empty_polls() {
    use futures::StreamExt;

    let queue = InMemoryQueue::new(TEST_SERVICE).await.unwrap();
    let producer = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        queue.send_raw(QueueType::Compilations, b"{}".to_vec()).await.unwrap();
    };
    let consumer = async {
        let mut stream = queue.consume(QueueType::Compilations, Duration::from_millis(50));
        stream.next().await.expect("stream is endless").expect("delivery")
    };

    let (_, delivery) = tokio::join!(producer, consumer);
    assert_eq!(delivery.body(), b"{}");
    delivery.ack().await.unwrap();
}
