use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument, UpdateOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use serde::Serialize;

use super::constant::{COUNTERS_COLLECTION, DEPLOYMENTS_COLLECTION, TASKS_COLLECTION, VERIFICATIONS_COLLECTION};
use super::error::DatabaseError;
use crate::core::client::database::DatabaseClient;
use crate::types::deployment::{Deployment, Verification};
use crate::types::params::database::DatabaseArgs;
use crate::types::task::{CompilationTask, NewTask, TaskResult, TaskStatus};

pub trait ToDocument {
    fn to_document(&self) -> Result<Document, DatabaseError>;
}

impl<T: Serialize> ToDocument for T {
    fn to_document(&self) -> Result<Document, DatabaseError> {
        let doc = mongodb::bson::to_bson(self)?;

        if let Bson::Document(doc) = doc {
            Ok(doc)
        } else {
            Err(DatabaseError::FailedToSerializeDocument(format!("Failed to serialize document: {}", doc)))
        }
    }
}

fn now() -> Bson {
    Bson::DateTime(Utc::now().round_subsecs(0).into())
}

/// MongoDB client implementation
pub struct MongoDbClient {
    database: Arc<Database>,
}

impl MongoDbClient {
    pub async fn new(config: &DatabaseArgs) -> Result<Self, DatabaseError> {
        let client = Client::with_uri_str(&config.connection_uri).await?;
        let database = Arc::new(client.database(&config.database_name));
        Ok(Self { database })
    }

    fn tasks(&self) -> Collection<CompilationTask> {
        self.database.collection(TASKS_COLLECTION)
    }

    fn deployments(&self) -> Collection<Deployment> {
        self.database.collection(DEPLOYMENTS_COLLECTION)
    }

    fn verifications(&self) -> Collection<Verification> {
        self.database.collection(VERIFICATIONS_COLLECTION)
    }

    fn counters(&self) -> Collection<Document> {
        self.database.collection(COUNTERS_COLLECTION)
    }

    /// Atomically bump and return the sequence named `name`. The first call yields 1.
    async fn next_sequence(&self, name: &str) -> Result<u64, DatabaseError> {
        let options = FindOneAndUpdateOptions::builder().upsert(true).return_document(ReturnDocument::After).build();
        let counter = self
            .counters()
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1_i64 } }, options)
            .await?
            .ok_or_else(|| DatabaseError::KeyNotFound(format!("counter {}", name)))?;
        let seq = counter.get_i64("seq").map_err(|_| DatabaseError::KeyNotFound("seq".to_string()))?;
        Ok(seq as u64)
    }

    /// Unique indexes backing the lookups below. Idempotent.
    pub async fn create_indexes(&self) -> Result<(), DatabaseError> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.tasks().create_index(IndexModel::builder().keys(doc! { "id": 1 }).options(unique()).build(), None).await?;
        self.deployments()
            .create_index(IndexModel::builder().keys(doc! { "operation_hash": 1 }).options(unique()).build(), None)
            .await?;
        self.deployments().create_index(IndexModel::builder().keys(doc! { "address": 1 }).build(), None).await?;
        self.verifications()
            .create_index(
                IndexModel::builder().keys(doc! { "address": 1, "network": 1 }).options(unique()).build(),
                None,
            )
            .await?;

        tracing::info!(database = %self.database.name(), "Database indexes created");
        Ok(())
    }

    async fn set_task_fields(&self, id: u64, mut fields: Document) -> Result<(), DatabaseError> {
        fields.insert("updated_at", now());
        let result = self.tasks().update_one(doc! { "id": id as i64 }, doc! { "$set": fields }, None).await?;
        if result.matched_count == 0 {
            return Err(DatabaseError::NotFound(format!("task {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseClient for MongoDbClient {
    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn create_task(&self, task: NewTask) -> Result<CompilationTask, DatabaseError> {
        let start = Instant::now();
        let id = self.next_sequence(TASKS_COLLECTION).await?;
        let task = task.into_task(id);

        match self.tasks().insert_one(&task, None).await {
            Ok(_) => {
                tracing::debug!(task_id = id, duration = %start.elapsed().as_millis(), "Task created in MongoDB");
                Ok(task)
            }
            Err(e) if e.to_string().contains("E11000") => {
                Err(DatabaseError::ItemAlreadyExists(format!("Task already exists for id {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn get_task(&self, id: u64) -> Result<Option<CompilationTask>, DatabaseError> {
        tracing::debug!(task_id = id, category = "db_call", "Fetching task by id");
        Ok(self.tasks().find_one(doc! { "id": id as i64 }, None).await?)
    }

    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn update_task_status(&self, id: u64, status: TaskStatus) -> Result<(), DatabaseError> {
        self.set_task_fields(id, doc! { "status": mongodb::bson::to_bson(&status)? }).await?;
        tracing::debug!(task_id = id, status = %status, category = "db_call", "Task status updated");
        Ok(())
    }

    #[tracing::instrument(skip(self, results), fields(function_type = "db_call", results = results.len()), err)]
    async fn update_task_results(
        &self,
        id: u64,
        status: TaskStatus,
        results: Vec<TaskResult>,
    ) -> Result<(), DatabaseError> {
        let fields = doc! {
            "status": mongodb::bson::to_bson(&status)?,
            "results": mongodb::bson::to_bson(&results)?,
        };
        self.set_task_fields(id, fields).await?;
        tracing::debug!(task_id = id, status = %status, category = "db_call", "Task results updated");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn set_task_address(&self, id: u64, address: &str, network: &str) -> Result<(), DatabaseError> {
        self.set_task_fields(id, doc! { "address": address, "network": network }).await
    }

    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn create_deployment(&self, deployment: Deployment) -> Result<Deployment, DatabaseError> {
        let options = UpdateOptions::builder().upsert(true).build();
        let filter = doc! { "operation_hash": &deployment.operation_hash };
        let updates = doc! {
            // only set when the document is inserted for the first time
            "$setOnInsert": deployment.to_document()?
        };

        let result = self.deployments().update_one(filter, updates, options).await?;
        if result.matched_count == 0 {
            tracing::debug!(operation_hash = %deployment.operation_hash, "Deployment recorded");
            Ok(deployment)
        } else {
            Err(DatabaseError::ItemAlreadyExists(format!(
                "Deployment already exists for operation {}",
                deployment.operation_hash
            )))
        }
    }

    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn get_pending_deployments(&self) -> Result<Vec<Deployment>, DatabaseError> {
        // `null` also matches documents where the field is absent
        let cursor = self.deployments().find(doc! { "address": Bson::Null, "rejected": Bson::Null }, None).await?;
        Ok(cursor.try_collect().await?)
    }

    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn update_deployment(
        &self,
        operation_hash: &str,
        address: &str,
        network: &str,
    ) -> Result<(), DatabaseError> {
        let result = self
            .deployments()
            .update_one(
                doc! { "operation_hash": operation_hash },
                doc! { "$set": { "address": address, "network": network } },
                None,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(DatabaseError::NotFound(format!("deployment {}", operation_hash)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn reject_deployment(&self, operation_hash: &str, status: &str) -> Result<(), DatabaseError> {
        let result = self
            .deployments()
            .update_one(doc! { "operation_hash": operation_hash }, doc! { "$set": { "rejected": status } }, None)
            .await?;
        if result.matched_count == 0 {
            return Err(DatabaseError::NotFound(format!("deployment {}", operation_hash)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(function_type = "db_call"), err)]
    async fn upsert_verification(&self, verification: Verification) -> Result<(), DatabaseError> {
        let options = UpdateOptions::builder().upsert(true).build();
        let filter = doc! { "address": &verification.address, "network": &verification.network };
        self.verifications().update_one(filter, doc! { "$set": verification.to_document()? }, options).await?;
        tracing::debug!(address = %verification.address, network = %verification.network, "Verification stored");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
