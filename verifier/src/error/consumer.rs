use thiserror::Error;

/// Failures while pulling a message off a queue and settling it.
#[derive(Error, Debug)]
pub enum ConsumptionError {
    #[error("Failed to consume message from queue, error {error_msg:?}")]
    FailedToConsumeFromQueue { error_msg: String },

    #[error("Failed to handle task with id {task_id:?}. Error: {error_msg:?}")]
    FailedToHandleTask { task_id: u64, error_msg: String },

    #[error("Failed to acknowledge message: {0}")]
    FailedToAcknowledgeMessage(String),

    #[error("Failed to decode message: {0}")]
    FailedToDecodeMessage(String),
}
