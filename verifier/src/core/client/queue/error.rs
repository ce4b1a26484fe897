use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue error from omniqueue: {0}")]
    ErrorFromQueueError(#[from] omniqueue::QueueError),

    #[error("Failed to declare broker topology: {0}")]
    TopologyError(#[from] lapin::Error),

    #[error("No queue bound for {0}")]
    QueueNotFound(String),

    #[error("Failed to serialize message: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to acknowledge message: {0}")]
    AcknowledgementError(String),

    #[error("Delivery has no payload")]
    EmptyPayload,
}

impl QueueError {
    /// True when the queue was simply empty.
    pub fn is_no_data(&self) -> bool {
        matches!(self, QueueError::ErrorFromQueueError(omniqueue::QueueError::NoData))
    }
}
