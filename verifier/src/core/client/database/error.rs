use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Mongo error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("Failed to serialize document: {0}")]
    BsonSerializationError(#[from] mongodb::bson::ser::Error),

    #[error("Failed to deserialize document: {0}")]
    BsonDeserializationError(#[from] mongodb::bson::de::Error),

    #[error("Failed to serialize document: {0}")]
    FailedToSerializeDocument(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Item already exists: {0}")]
    ItemAlreadyExists(String),

    #[error("No record matched: {0}")]
    NotFound(String),

    #[error("Update failed: {0}")]
    UpdateFailed(String),
}
