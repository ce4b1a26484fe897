use clap::Args;
use serde::Serialize;

/// Parameters used to config AWS.
#[derive(Debug, Clone, Args, Serialize)]
pub struct AWSConfigCliArgs {
    /// Use this flag to enable AWS provider.
    #[arg(long)]
    pub aws: bool,

    /// Custom endpoint for every AWS service, e.g. a localstack instance.
    #[arg(env = "AWS_ENDPOINT_URL", long)]
    pub aws_endpoint_url: Option<String>,
}
