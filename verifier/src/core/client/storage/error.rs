use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::operation::put_object::PutObjectError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to put object : {0}")]
    UnableToPutObject(#[from] SdkError<PutObjectError>),
    /// AWS S3 error
    #[error("Failed to get data from S3: {0}")]
    GetObjectError(#[from] SdkError<GetObjectError>),
    #[error("Failed to reach bucket: {0}")]
    HeadBucketError(#[from] SdkError<HeadBucketError>),
    #[error("Failed to create bucket: {0}")]
    CreateBucketError(#[from] SdkError<CreateBucketError>),
    #[error("Failed to stream object: {0}")]
    ObjectStreamError(String),
    #[error("Invalid Bucket Name is given: {0}")]
    InvalidBucketName(String),
}
