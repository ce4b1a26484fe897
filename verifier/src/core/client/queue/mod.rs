pub mod error;
pub mod in_memory;
pub mod rabbitmq;

use std::time::Duration;

use async_trait::async_trait;
pub use error::QueueError;
use futures::stream::{self, BoxStream, StreamExt};
use omniqueue::Delivery;
use serde::de::DeserializeOwned;

use crate::types::queue::{QueueMessage, QueueType};

/// How long a single receive call waits for a delivery before reporting `NoData`.
pub const QUEUE_RECEIVE_WAIT: Duration = Duration::from_millis(500);

/// Broker agnostic queue operations. Backends are selected once at start-up.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Publish raw bytes under the queue's routing key. Every service bound to
    /// the queue receives its own copy.
    async fn send_raw(&self, queue: QueueType, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Pull the next delivery from this service's copy of `queue`.
    /// Returns `omniqueue::QueueError::NoData` when nothing arrived in time.
    async fn consume_message_from_queue(&self, queue: QueueType) -> Result<QueueData, QueueError>;

    /// Perform a health check on the broker
    ///
    /// # Returns
    /// * `Ok(())` - If the broker is reachable
    /// * `Err(QueueError)` - If the health check fails
    async fn health_check(&self) -> Result<(), QueueError>;
}

/// Typed publishing and streaming consumption on top of any [`QueueClient`].
#[async_trait]
pub trait QueueClientExt: QueueClient {
    async fn send<M>(&self, message: &M) -> Result<(), QueueError>
    where
        M: QueueMessage + Sync,
    {
        let payload = serde_json::to_vec(message)?;
        self.send_raw(M::QUEUE, payload).await
    }

    /// Endless stream of deliveries. Empty polls are absorbed here, so every
    /// item is either a delivery or a broker failure.
    fn consume(&self, queue: QueueType, poll_interval: Duration) -> BoxStream<'_, Result<QueueData, QueueError>> {
        stream::unfold((), move |()| async move {
            loop {
                match self.consume_message_from_queue(queue).await {
                    Ok(data) => return Some((Ok(data), ())),
                    Err(e) if e.is_no_data() => tokio::time::sleep(poll_interval).await,
                    Err(e) => return Some((Err(e), ())),
                }
            }
        })
        .boxed()
    }
}

impl<T: QueueClient + ?Sized> QueueClientExt for T {}

/// A delivery together with the routing key it was published under.
/// It must be settled exactly once with [`QueueData::ack`] or [`QueueData::nack`].
pub struct QueueData {
    routing_key: String,
    delivery: Delivery,
}

impl QueueData {
    pub fn new(routing_key: impl Into<String>, delivery: Delivery) -> Self {
        Self { routing_key: routing_key.into(), delivery }
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn body(&self) -> &[u8] {
        self.delivery.borrow_payload().unwrap_or_default()
    }

    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, QueueError> {
        let body = self.delivery.borrow_payload().ok_or(QueueError::EmptyPayload)?;
        Ok(serde_json::from_slice(body)?)
    }

    /// Remove the message from the queue.
    pub async fn ack(self) -> Result<(), QueueError> {
        self.delivery.ack().await.map_err(|e| QueueError::AcknowledgementError(e.0.to_string()))
    }

    /// Hand the message back to the broker for redelivery.
    pub async fn nack(self) -> Result<(), QueueError> {
        self.delivery.nack().await.map_err(|e| QueueError::AcknowledgementError(e.0.to_string()))
    }
}

impl std::fmt::Debug for QueueData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueData").field("routing_key", &self.routing_key).field("len", &self.body().len()).finish()
    }
}
