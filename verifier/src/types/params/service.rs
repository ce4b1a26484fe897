use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::cli::compiler::CompilerCliArgs;
use crate::cli::ServiceParams as ServiceCliArgs;
use crate::VerifierError;

/// Validated service parameters
#[derive(Debug, Clone)]
pub struct ServiceParams {
    pub service_name: String,
    pub working_dir: PathBuf,
    pub stale_dir_ttl: Duration,
    pub reconcile_interval: Option<Duration>,
    pub archive_timeout: Duration,
    pub archive_base_url: Url,
}

/// The working root is made absolute here: task directories are created below it
/// as absolute paths, and removal only accepts direct children of this exact root.
impl TryFrom<ServiceCliArgs> for ServiceParams {
    type Error = VerifierError;
    fn try_from(args: ServiceCliArgs) -> Result<Self, Self::Error> {
        let working_dir = std::path::absolute(&args.working_dir).map_err(|e| {
            VerifierError::ConfigError(format!("Invalid working directory {}: {}", args.working_dir.display(), e))
        })?;
        Ok(Self {
            service_name: args.service_name,
            working_dir,
            stale_dir_ttl: Duration::from_secs(args.stale_dir_ttl_seconds),
            reconcile_interval: args.reconcile_interval_seconds.map(Duration::from_secs),
            archive_timeout: Duration::from_secs(args.archive_timeout_seconds),
            archive_base_url: args.archive_base_url,
        })
    }
}

/// Toolchain locations and the per-invocation timeout
#[derive(Debug, Clone)]
pub struct CompilerParams {
    pub ligo_binary: String,
    pub octez_client_binary: String,
    pub smartpy_binary: String,
    pub timeout: Duration,
}

impl From<CompilerCliArgs> for CompilerParams {
    fn from(args: CompilerCliArgs) -> Self {
        Self {
            ligo_binary: args.ligo_binary,
            octez_client_binary: args.octez_client_binary,
            smartpy_binary: args.smartpy_binary,
            timeout: Duration::from_secs(args.compiler_timeout_seconds),
        }
    }
}
