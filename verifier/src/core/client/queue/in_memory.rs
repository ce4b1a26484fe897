use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use omniqueue::backends::{InMemoryBackend, InMemoryConsumer, InMemoryProducer};
use strum::IntoEnumIterator;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::core::client::queue::{QueueClient, QueueData, QueueError, QUEUE_RECEIVE_WAIT};
use crate::types::queue::QueueType;

struct InMemoryChannel {
    producer: InMemoryProducer,
    consumer: Mutex<InMemoryConsumer>,
}

/// In-process broker with the same routing as the networked backend: a publish
/// on a queue type is copied into every `<queue>.<service>` bound to it.
/// Nothing survives the process, nack puts the payload back in line.
pub struct InMemoryQueue {
    service: String,
    channels: RwLock<HashMap<String, Arc<InMemoryChannel>>>,
    bindings: RwLock<HashMap<QueueType, Vec<String>>>,
}

impl InMemoryQueue {
    pub async fn new(service: &str) -> Result<Self, QueueError> {
        let queue = Self {
            service: service.to_string(),
            channels: RwLock::new(HashMap::new()),
            bindings: RwLock::new(HashMap::new()),
        };
        for queue_type in QueueType::iter() {
            queue.bind(queue_type, service).await?;
        }
        Ok(queue)
    }

    /// Bind another service's queue so it receives its own copy of every publish.
    pub async fn bind(&self, queue: QueueType, service: &str) -> Result<(), QueueError> {
        let name = queue.namespaced(service);
        {
            let mut channels = self.channels.write().await;
            if !channels.contains_key(&name) {
                let (producer, consumer) = InMemoryBackend::builder().build_pair().await?;
                channels.insert(name.clone(), Arc::new(InMemoryChannel { producer, consumer: Mutex::new(consumer) }));
            }
        }
        let mut bindings = self.bindings.write().await;
        let bound = bindings.entry(queue).or_default();
        if !bound.contains(&name) {
            bound.push(name);
        }
        Ok(())
    }

    /// Consume `queue` as `service` rather than as the owning service.
    pub async fn consume_as(&self, queue: QueueType, service: &str) -> Result<QueueData, QueueError> {
        let name = queue.namespaced(service);
        let channel = self.channels.read().await.get(&name).cloned().ok_or(QueueError::QueueNotFound(name))?;
        let mut consumer = channel.consumer.lock().await;
        let mut deliveries = consumer.receive_all(1, QUEUE_RECEIVE_WAIT).await?;
        match deliveries.pop() {
            Some(delivery) => Ok(QueueData::new(queue.routing_key(), delivery)),
            None => Err(omniqueue::QueueError::NoData.into()),
        }
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn send_raw(&self, queue: QueueType, payload: Vec<u8>) -> Result<(), QueueError> {
        let targets = self.bindings.read().await.get(&queue).cloned().unwrap_or_default();
        if targets.is_empty() {
            return Err(QueueError::QueueNotFound(queue.to_string()));
        }
        let channels = self.channels.read().await;
        for target in targets {
            let channel = channels.get(&target).ok_or_else(|| QueueError::QueueNotFound(target.clone()))?;
            channel.producer.send_raw(&payload).await?;
            debug!(queue = %target, "Published in-memory message");
        }
        Ok(())
    }

    async fn consume_message_from_queue(&self, queue: QueueType) -> Result<QueueData, QueueError> {
        self.consume_as(queue, &self.service).await
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }
}
