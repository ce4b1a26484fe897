use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties, ExchangeKind};
use omniqueue::backends::{RabbitMqBackend, RabbitMqConfig, RabbitMqConsumer, RabbitMqProducer};
use strum::IntoEnumIterator;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::client::queue::{QueueClient, QueueData, QueueError, QUEUE_RECEIVE_WAIT};
use crate::types::params::RabbitMqArgs;
use crate::types::queue::QueueType;

/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// RabbitMQ backend. Publishing goes through one durable direct exchange; each
/// service consumes its own durable `<queue>.<service>` queue bound to it.
pub struct RabbitMq {
    args: RabbitMqArgs,
    service: String,
    producers: Mutex<HashMap<QueueType, Arc<RabbitMqProducer>>>,
    consumers: Mutex<HashMap<QueueType, Arc<Mutex<RabbitMqConsumer>>>>,
}

impl RabbitMq {
    /// Connects lazily: producers and consumers are opened on first use.
    /// The topology for `service` is declared up front so consuming never races setup.
    pub async fn new(args: &RabbitMqArgs, service: &str) -> Result<Self, QueueError> {
        let client = Self::without_topology(args, service);
        client.declare_topology(&[service.to_string()]).await?;
        Ok(client)
    }

    pub fn without_topology(args: &RabbitMqArgs, service: &str) -> Self {
        Self {
            args: args.clone(),
            service: service.to_string(),
            producers: Mutex::new(HashMap::new()),
            consumers: Mutex::new(HashMap::new()),
        }
    }

    /// Declare the exchange and, for every service, a durable queue per queue type
    /// bound by routing key. Safe to run repeatedly.
    pub async fn declare_topology(&self, services: &[String]) -> Result<(), QueueError> {
        let connection = Connection::connect(&self.args.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .exchange_declare(
                &self.args.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions { durable: true, auto_delete: false, ..Default::default() },
                FieldTable::default(),
            )
            .await?;

        for queue in QueueType::iter() {
            for service in services {
                let queue_name = queue.namespaced(service);
                channel
                    .queue_declare(
                        &queue_name,
                        QueueDeclareOptions { durable: true, auto_delete: false, ..Default::default() },
                        FieldTable::default(),
                    )
                    .await?;
                channel
                    .queue_bind(
                        &queue_name,
                        &self.args.exchange,
                        &queue.routing_key(),
                        QueueBindOptions::default(),
                        FieldTable::default(),
                    )
                    .await?;
                info!(exchange = %self.args.exchange, queue = %queue_name, "Declared queue");
            }
        }

        connection.close(200, "topology declared").await?;
        Ok(())
    }

    fn config_for(&self, queue: QueueType) -> RabbitMqConfig {
        RabbitMqConfig {
            uri: self.args.url.clone(),
            connection_properties: ConnectionProperties::default(),
            publish_exchange: self.args.exchange.clone(),
            publish_routing_key: queue.routing_key(),
            publish_options: BasicPublishOptions::default(),
            publish_properties: BasicProperties::default().with_delivery_mode(PERSISTENT_DELIVERY_MODE),
            consume_queue: queue.namespaced(&self.service),
            consumer_tag: format!("{}-{}", self.service, Uuid::new_v4()),
            consume_options: BasicConsumeOptions::default(),
            consume_arguments: FieldTable::default(),
            consume_prefetch_count: Some(self.args.prefetch),
            requeue_on_nack: true,
        }
    }

    async fn producer(&self, queue: QueueType) -> Result<Arc<RabbitMqProducer>, QueueError> {
        let mut producers = self.producers.lock().await;
        if let Some(producer) = producers.get(&queue) {
            return Ok(producer.clone());
        }
        let producer = Arc::new(RabbitMqBackend::builder(self.config_for(queue)).build_producer().await?);
        producers.insert(queue, producer.clone());
        Ok(producer)
    }

    async fn consumer(&self, queue: QueueType) -> Result<Arc<Mutex<RabbitMqConsumer>>, QueueError> {
        let mut consumers = self.consumers.lock().await;
        if let Some(consumer) = consumers.get(&queue) {
            return Ok(consumer.clone());
        }
        let consumer = Arc::new(Mutex::new(RabbitMqBackend::builder(self.config_for(queue)).build_consumer().await?));
        consumers.insert(queue, consumer.clone());
        Ok(consumer)
    }
}

#[async_trait]
impl QueueClient for RabbitMq {
    async fn send_raw(&self, queue: QueueType, payload: Vec<u8>) -> Result<(), QueueError> {
        let producer = self.producer(queue).await?;
        producer.send_raw(&payload).await?;
        debug!(exchange = %self.args.exchange, routing_key = %queue.routing_key(), "Published message");
        Ok(())
    }

    async fn consume_message_from_queue(&self, queue: QueueType) -> Result<QueueData, QueueError> {
        let consumer = self.consumer(queue).await?;
        let mut consumer = consumer.lock().await;
        let mut deliveries = consumer.receive_all(1, QUEUE_RECEIVE_WAIT).await?;
        match deliveries.pop() {
            Some(delivery) => Ok(QueueData::new(queue.routing_key(), delivery)),
            None => Err(omniqueue::QueueError::NoData.into()),
        }
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        let connection = Connection::connect(&self.args.url, ConnectionProperties::default()).await?;
        connection.close(200, "health check").await?;
        Ok(())
    }
}
