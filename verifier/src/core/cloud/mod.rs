use aws_config::SdkConfig;

use super::error::VerifierCoreError;
use crate::cli::{RunCmd, SetupCmd};
use crate::types::params::cloud_provider::AWSCredentials;

/// Cloud provider
/// This enum represents the different cloud providers that the verifier can interact with.
#[derive(Clone)]
pub enum CloudProvider {
    AWS(Box<SdkConfig>),
}

impl CloudProvider {
    /// Load the provider selected on the command line.
    ///
    /// # Errors
    /// Returns an error if no supported provider flag was set
    pub async fn from_flags(aws: bool, credentials: AWSCredentials) -> Result<Self, VerifierCoreError> {
        if aws {
            Ok(CloudProvider::AWS(Box::new(credentials.get_aws_config().await)))
        } else {
            Err(VerifierCoreError::InvalidProvider("AWS".to_string()))
        }
    }

    pub async fn from_run_cmd(cmd: &RunCmd) -> Result<Self, VerifierCoreError> {
        Self::from_flags(cmd.aws_config_args.aws, AWSCredentials::from(cmd.aws_config_args.clone())).await
    }

    pub async fn from_setup_cmd(cmd: &SetupCmd) -> Result<Self, VerifierCoreError> {
        Self::from_flags(cmd.aws_config_args.aws, AWSCredentials::from(cmd.aws_config_args.clone())).await
    }

    pub fn get_aws_config(&self) -> &SdkConfig {
        match self {
            CloudProvider::AWS(config) => config.as_ref(),
        }
    }

    pub fn get_provider_name(&self) -> String {
        match self {
            CloudProvider::AWS(_) => "AWS".to_string(),
        }
    }
}

impl std::fmt::Debug for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.get_provider_name().as_str())
    }
}
