use std::time::Duration;

/// Prefix of every task working directory, used by the stale directory sweep.
pub const TASK_DIR_PREFIX: &str = "task-";

/// Reconciliation interval used when the chain cannot report its block time.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);

pub const VERIFIER_VERSION: &str = env!("CARGO_PKG_VERSION");
