use clap::Args;

/// Parameters used to config AWS S3.
#[derive(Debug, Clone, Args)]
#[group()] // Note: we are not using bucket_identifier in requires_all because it has a default value.
pub struct AWSS3CliArgs {
    /// Use the AWS s3 client
    #[arg(long)]
    pub aws_s3: bool,

    /// The ARN / Name of the S3 bucket compiled artifacts are stored in.
    /// ARN: arn:aws:s3:::name
    #[arg(env = "VERIFIER_AWS_S3_BUCKET_IDENTIFIER", long, default_value = Some("contract-artifacts"))]
    pub bucket_identifier: Option<String>,
}
