use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct ServiceCliArgs {
    /// Name of this service. Each service consumes its own `<queue>.<service>` queues.
    #[arg(env = "VERIFIER_SERVICE_NAME", long, default_value = "compiler")]
    pub service_name: String,

    /// Root directory task sources are materialized under.
    #[arg(env = "VERIFIER_WORKING_DIR", long, default_value = "/tmp/contract-verifier")]
    pub working_dir: PathBuf,

    /// Task directories older than this are removed at start-up.
    #[arg(env = "VERIFIER_STALE_DIR_TTL_SECONDS", long, default_value = "3600")]
    pub stale_dir_ttl_seconds: u64,

    /// Overrides the reconciliation interval otherwise derived from the chain block time.
    #[arg(env = "VERIFIER_RECONCILE_INTERVAL_SECONDS", long)]
    pub reconcile_interval_seconds: Option<u64>,

    /// Timeout for repository archive downloads.
    #[arg(env = "VERIFIER_ARCHIVE_TIMEOUT_SECONDS", long, default_value = "60")]
    pub archive_timeout_seconds: u64,

    /// Base URL repository archives are fetched from.
    #[arg(env = "VERIFIER_ARCHIVE_BASE_URL", long, default_value = "https://github.com")]
    pub archive_base_url: url::Url,
}
