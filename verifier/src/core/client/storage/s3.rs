use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::core::client::storage::{StorageClient, StorageError};
use crate::types::params::StorageArgs;

#[derive(Clone, Debug)]
pub struct AWSS3 {
    pub(crate) client: Arc<Client>,
    bucket_name: String,
    region: Option<String>,
}

impl AWSS3 {
    /// Creates a new instance of AWSS3 with the provided AWS configuration.
    /// # Arguments
    /// * `aws_config` - The AWS configuration.
    /// * `args` - The storage arguments with bucket_identifier (name or ARN).
    pub fn new(aws_config: &SdkConfig, args: &StorageArgs) -> Self {
        let (bucket_name, region) = Self::parse_bucket_identifier(&args.bucket_identifier);

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(aws_config);

        // Only override region if it was explicitly provided in the ARN
        if let Some(region) = &region {
            s3_config_builder = s3_config_builder.region(Region::new(region.clone()));
        }

        // Path style keeps S3 compatible endpoints (localstack, minio) working
        s3_config_builder = s3_config_builder.use_arn_region(true).force_path_style(true);

        let client = Client::from_conf(s3_config_builder.build());

        Self { client: Arc::new(client), bucket_name, region }
    }

    /// Parse a bucket identifier (name or ARN) into bucket name and optional region
    fn parse_bucket_identifier(identifier: &str) -> (String, Option<String>) {
        if identifier.starts_with("arn:aws:s3:") {
            let parts: Vec<&str> = identifier.split(':').collect();

            if parts.len() >= 6 {
                let region = if !parts[3].is_empty() { Some(parts[3].to_string()) } else { None };

                // Format: arn:aws:s3:region:account-id:bucket/bucket-name or arn:aws:s3:::bucket-name
                let bucket_name = match parts[5].split_once('/') {
                    Some(("bucket", name)) if !name.is_empty() => name.to_string(),
                    _ => parts[5].to_string(),
                };

                return (bucket_name, region);
            }
        }

        (identifier.to_string(), None)
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Returns the region extracted from ARN, if available
    pub fn region(&self) -> Option<String> {
        self.region.clone()
    }

    /// Location string recorded in task results for an object key
    pub fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket_name, key)
    }

    /// Create the bucket unless it already exists.
    pub async fn create_bucket(&self) -> Result<(), StorageError> {
        if self.client.head_bucket().bucket(&self.bucket_name).send().await.is_ok() {
            tracing::info!(bucket = %self.bucket_name, "Bucket already exists, skipping creation");
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket_name);
        // us-east-1 rejects an explicit location constraint
        let region = self.region.clone().or_else(|| self.client.config().region().map(|r| r.to_string()));
        if let Some(region) = region.filter(|r| r != "us-east-1") {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region.as_str()))
                    .build(),
            );
        }
        request.send().await?;
        tracing::info!(bucket = %self.bucket_name, "Bucket created");
        Ok(())
    }
}

#[async_trait]
impl StorageClient for AWSS3 {
    /// Get the data from the bucket with the specified key.
    async fn get_data(&self, key: &str) -> Result<Bytes, StorageError> {
        let output = self.client.get_object().bucket(&self.bucket_name).key(key).send().await?;

        let data = output.body.collect().await.map_err(|e| StorageError::ObjectStreamError(e.to_string()))?;

        Ok(data.into_bytes())
    }

    /// Put the data into the bucket with the specified key.
    ///
    /// # Returns
    /// * `Result<String, StorageError>` - The `s3://` location of the stored object.
    async fn put_data(&self, data: Bytes, key: &str) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type("application/json")
            .body(data.into())
            .send()
            .await?;

        Ok(self.location(key))
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.client.head_bucket().bucket(&self.bucket_name).send().await?;
        Ok(())
    }
}
