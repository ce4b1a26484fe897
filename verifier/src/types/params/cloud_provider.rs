use aws_config::SdkConfig;

use crate::cli::provider::aws::AWSConfigCliArgs;

#[derive(Debug, Clone)]
pub struct AWSCredentials {
    pub endpoint_url: Option<String>,
}

impl AWSCredentials {
    pub async fn get_aws_config(&self) -> SdkConfig {
        let loader = aws_config::from_env();
        match &self.endpoint_url {
            Some(endpoint) => loader.endpoint_url(endpoint).load().await,
            None => loader.load().await,
        }
    }
}

impl From<AWSConfigCliArgs> for AWSCredentials {
    fn from(args: AWSConfigCliArgs) -> Self {
        Self { endpoint_url: args.aws_endpoint_url }
    }
}
