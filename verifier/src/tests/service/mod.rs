use std::path::Path;

use assert_matches::assert_matches;
use httpmock::prelude::*;
use mockall::predicate::eq;
use rstest::rstest;
use url::Url;

use crate::core::client::database::MockDatabaseClient;
use crate::core::client::queue::{MockQueueClient, QueueClient, QueueError};
use crate::error::TaskError;
use crate::source::upload::UploadedFile;
use crate::source::AcquisitionError;
use crate::tests::common::{deployment_task, michelson_registry, tarball, CONTRACT_ADDRESS, MICHELSON_SOURCE};
use crate::tests::config::{TestConfigBuilder, TEST_NETWORK};
use crate::types::deployment::Deployment;
use crate::types::queue::QueueType;
use crate::types::task::{CompilationTask, NewTask, TaskKind, TaskMessage, TaskSource, TaskStatus};
use crate::worker::service::{Submission, TaskService};
use crate::VerifierError;

fn submission(kind: TaskKind, address: Option<&str>) -> Submission {
    Submission { user_id: Some("alice".to_string()), kind, address: address.map(str::to_string), network: None }
}

/// Database mock that assigns id 7 to whatever task is created.
fn database_creating_task() -> MockDatabaseClient {
    let mut database = MockDatabaseClient::new();
    database.expect_create_task().times(1).returning(|new_task: NewTask| Ok(new_task.into_task(7)));
    database
}

fn leftover_dirs(root: &Path) -> usize {
    std::fs::read_dir(root).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn uploaded_files_are_queued_for_compilation() {
    let test = TestConfigBuilder::new()
        .configure_database(database_creating_task())
        .configure_compilers(michelson_registry(vec![]))
        .build()
        .await;

    let files = vec![UploadedFile::new("b.tz", MICHELSON_SOURCE), UploadedFile::new("a.tz", MICHELSON_SOURCE)];
    let task = TaskService::submit_files(&test.config, submission(TaskKind::Verification, Some(CONTRACT_ADDRESS)), files)
        .await
        .unwrap();

    assert_eq!(task.id, 7);
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.address.as_deref(), Some(CONTRACT_ADDRESS));
    assert_eq!(task.network.as_deref(), Some(TEST_NETWORK));
    assert_eq!(task.source, Some(TaskSource::Upload { files: vec!["b.tz".to_string(), "a.tz".to_string()] }));

    let delivery = test.config.queue().consume_message_from_queue(QueueType::Compilations).await.unwrap();
    let message: TaskMessage = delivery.payload().unwrap();
    assert_eq!(message.id, 7);
    assert_eq!(message.kind, TaskKind::Verification);
    assert_eq!(message.files, vec![message.dir.join("a.tz"), message.dir.join("b.tz")]);
    assert!(message.dir.starts_with(test.root()));
    assert!(message.files.iter().all(|f| f.exists()));
}

#[tokio::test]
async fn unsupported_upload_fails_the_task_without_queueing() {
    let mut database = database_creating_task();
    database.expect_update_task_status().with(eq(7), eq(TaskStatus::Failed)).times(1).returning(|_, _| Ok(()));
    let mut queue = MockQueueClient::new();
    queue.expect_send_raw().never();

    let test = TestConfigBuilder::new()
        .configure_queue(queue)
        .configure_database(database)
        .configure_compilers(michelson_registry(vec![]))
        .build()
        .await;

    let files = vec![UploadedFile::new("a.tz", MICHELSON_SOURCE), UploadedFile::new("notes.txt", "hello")];
    let result = TaskService::submit_files(&test.config, submission(TaskKind::Deployment, None), files).await;

    assert_matches!(
        result,
        Err(VerifierError::AcquisitionError(AcquisitionError::UnsupportedExtension { file })) if file == "notes.txt"
    );
    assert_eq!(leftover_dirs(&test.root()), 0);
}

#[tokio::test]
async fn verification_without_address_is_refused_before_a_task_exists() {
    let mut database = MockDatabaseClient::new();
    database.expect_create_task().never();

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_compilers(michelson_registry(vec![]))
        .build()
        .await;

    let files = vec![UploadedFile::new("a.tz", MICHELSON_SOURCE)];
    let result = TaskService::submit_files(&test.config, submission(TaskKind::Verification, None), files).await;
    assert_matches!(result, Err(VerifierError::TaskError(TaskError::InvalidSubmission(_))));
}

#[tokio::test]
async fn enqueue_failure_fails_the_task_and_cleans_up() {
    let mut database = database_creating_task();
    database.expect_update_task_status().with(eq(7), eq(TaskStatus::Failed)).times(1).returning(|_, _| Ok(()));
    let mut queue = MockQueueClient::new();
    queue
        .expect_send_raw()
        .times(1)
        .returning(|_, _| Err(QueueError::QueueNotFound("compilations.compiler".to_string())));

    let test = TestConfigBuilder::new()
        .configure_queue(queue)
        .configure_database(database)
        .configure_compilers(michelson_registry(vec![]))
        .build()
        .await;

    let files = vec![UploadedFile::new("a.tz", MICHELSON_SOURCE)];
    let result = TaskService::submit_files(&test.config, submission(TaskKind::Deployment, None), files).await;

    assert_matches!(result, Err(VerifierError::TaskError(TaskError::Enqueue { id: 7, .. })));
    assert_eq!(leftover_dirs(&test.root()), 0);
}

#[tokio::test]
async fn repository_is_fetched_and_queued() {
    let server = MockServer::start();
    let archive = server.mock(|when, then| {
        when.method(GET).path("/acme/token/archive/v1.0.0.tar.gz");
        then.status(200).body(tarball(
            "token-1.0.0",
            &[("contracts/token.tz", MICHELSON_SOURCE), ("README.md", "# token")],
        ));
    });

    let test = TestConfigBuilder::new()
        .configure_database(database_creating_task())
        .configure_compilers(michelson_registry(vec![]))
        .configure_archive_base_url(Url::parse(&server.base_url()).unwrap())
        .build()
        .await;

    let task = TaskService::submit_repository(
        &test.config,
        submission(TaskKind::Deployment, None),
        "acme",
        "token",
        "v1.0.0",
    )
    .await
    .unwrap();
    archive.assert();

    assert_eq!(
        task.source,
        Some(TaskSource::Repository {
            owner: "acme".to_string(),
            repo: "token".to_string(),
            reference: "v1.0.0".to_string()
        })
    );

    let delivery = test.config.queue().consume_message_from_queue(QueueType::Compilations).await.unwrap();
    let message: TaskMessage = delivery.payload().unwrap();
    assert_eq!(message.files, vec![message.dir.join("contracts/token.tz")]);
}

#[tokio::test]
async fn missing_repository_fails_the_task() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/acme/missing/archive/main.tar.gz");
        then.status(404);
    });

    let mut database = database_creating_task();
    database.expect_update_task_status().with(eq(7), eq(TaskStatus::Failed)).times(1).returning(|_, _| Ok(()));

    let test = TestConfigBuilder::new()
        .configure_database(database)
        .configure_compilers(michelson_registry(vec![]))
        .configure_archive_base_url(Url::parse(&server.base_url()).unwrap())
        .build()
        .await;

    let result =
        TaskService::submit_repository(&test.config, submission(TaskKind::Deployment, None), "acme", "missing", "main")
            .await;

    assert_matches!(result, Err(VerifierError::AcquisitionError(AcquisitionError::ArchiveNotFound { .. })));
    assert_eq!(leftover_dirs(&test.root()), 0);
}

#[rstest]
#[tokio::test]
async fn deployment_is_registered_for_a_deployment_task(deployment_task: CompilationTask) {
    let mut task = deployment_task;
    task.status = TaskStatus::Success;
    let task_id = task.id;

    let mut database = MockDatabaseClient::new();
    database.expect_get_task().with(eq(task_id)).returning(move |_| Ok(Some(task.clone())));
    database
        .expect_create_deployment()
        .withf(move |d: &Deployment| d.task_id == task_id && d.operation_hash == "opHash" && d.is_pending())
        .times(1)
        .returning(|d| Ok(d));

    let test = TestConfigBuilder::new().configure_database(database).build().await;
    let deployment = TaskService::register_deployment(&test.config, task_id, "opHash").await.unwrap();
    assert_eq!(deployment.operation_hash, "opHash");
}

#[rstest]
#[case::verification_task(Some(TaskKind::Verification))]
#[case::missing_task(None)]
#[tokio::test]
async fn deployment_registration_requires_a_deployment_task(#[case] kind: Option<TaskKind>) {
    let mut database = MockDatabaseClient::new();
    database.expect_get_task().returning(move |id| {
        Ok(kind.map(|kind| {
            NewTask { user_id: None, kind, address: None, network: None, source: None }.into_task(id)
        }))
    });
    database.expect_create_deployment().never();

    let test = TestConfigBuilder::new().configure_database(database).build().await;
    let result = TaskService::register_deployment(&test.config, 3, "opHash").await;

    match kind {
        Some(_) => assert_matches!(result, Err(VerifierError::TaskError(TaskError::InvalidSubmission(_)))),
        None => assert_matches!(result, Err(VerifierError::TaskError(TaskError::TaskNotFound { id: 3 }))),
    }
}
