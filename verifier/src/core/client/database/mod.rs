pub mod constant;
pub mod error;
pub mod mongodb;

use async_trait::async_trait;
pub use error::DatabaseError;

use crate::types::deployment::{Deployment, Verification};
use crate::types::task::{CompilationTask, NewTask, TaskResult, TaskStatus};

/// Trait defining the persistence operations of the verifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// create_task - Allocate an id and store a new pending task
    async fn create_task(&self, task: NewTask) -> Result<CompilationTask, DatabaseError>;
    /// get_task - Get a task by its id
    async fn get_task(&self, id: u64) -> Result<Option<CompilationTask>, DatabaseError>;
    /// update_task_status - Overwrite the status of a task
    async fn update_task_status(&self, id: u64, status: TaskStatus) -> Result<(), DatabaseError>;
    /// update_task_results - Persist the per-file results and the derived status in one write
    async fn update_task_results(
        &self,
        id: u64,
        status: TaskStatus,
        results: Vec<TaskResult>,
    ) -> Result<(), DatabaseError>;
    /// set_task_address - Attach the on-chain address a deployment task ended up at
    async fn set_task_address(&self, id: u64, address: &str, network: &str) -> Result<(), DatabaseError>;

    /// create_deployment - Record a broadcast origination
    async fn create_deployment(&self, deployment: Deployment) -> Result<Deployment, DatabaseError>;
    /// get_pending_deployments - Deployments neither confirmed nor rejected yet
    async fn get_pending_deployments(&self) -> Result<Vec<Deployment>, DatabaseError>;
    /// update_deployment - Fill in the address and network of a confirmed deployment
    async fn update_deployment(&self, operation_hash: &str, address: &str, network: &str)
        -> Result<(), DatabaseError>;
    /// reject_deployment - Close out a deployment whose origination was included but not applied
    async fn reject_deployment(&self, operation_hash: &str, status: &str) -> Result<(), DatabaseError>;

    /// upsert_verification - Create or replace the verification of an address on a network
    async fn upsert_verification(&self, verification: Verification) -> Result<(), DatabaseError>;

    /// health_check - Ping the database
    async fn health_check(&self) -> Result<(), DatabaseError>;
}
