pub mod database;
pub mod queue;
pub mod storage;

pub use database::{mongodb::MongoDbClient, DatabaseClient};
pub use queue::{in_memory::InMemoryQueue, rabbitmq::RabbitMq, QueueClient};
pub use storage::{s3::AWSS3, StorageClient};
