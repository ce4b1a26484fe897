use crate::cli::database::mongodb::MongoDBCliArgs;
use crate::VerifierError;

/// Validated MongoDB parameters
#[derive(Debug, Clone)]
pub struct DatabaseArgs {
    pub connection_uri: String,
    pub database_name: String,
}

impl TryFrom<MongoDBCliArgs> for DatabaseArgs {
    type Error = VerifierError;
    fn try_from(args: MongoDBCliArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            connection_uri: args
                .mongodb_connection_url
                .ok_or_else(|| VerifierError::ConfigError("MongoDB connection url is required".to_string()))?,
            database_name: args
                .mongodb_database_name
                .ok_or_else(|| VerifierError::ConfigError("MongoDB database name is required".to_string()))?,
        })
    }
}
