use thiserror::Error;

use crate::core::client::database::DatabaseError;
use crate::core::client::queue::QueueError;

/// Errors raised while driving a task through its lifecycle.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task not found for id {id:?}")]
    TaskNotFound { id: u64 },

    /// The store could not be reached or rejected the write. The message is
    /// redelivered so the task is retried.
    #[error("Failed to persist task {id:?}: {source}")]
    Persistence {
        id: u64,
        #[source]
        source: DatabaseError,
    },

    #[error("Failed to enqueue task {id:?}: {source}")]
    Enqueue {
        id: u64,
        #[source]
        source: QueueError,
    },

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("Task {id:?} processing panicked: {message}")]
    Panicked { id: u64, message: String },
}

impl TaskError {
    /// Transient failures leave the message unacknowledged for redelivery.
    pub fn is_transient(&self) -> bool {
        matches!(self, TaskError::Persistence { .. } | TaskError::Enqueue { .. })
    }
}
