pub mod comparator;
pub mod compilation;
pub mod reconciliation;
pub mod service;
pub mod ticker;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::client::queue::QueueClientExt;
use crate::core::config::Config;
use crate::error::ConsumptionError;
use crate::source::sweep_stale_dirs;
use crate::types::queue::QueueType;
use crate::worker::compilation::handle_message;
use crate::worker::reconciliation::reconcile_deployments;
use crate::worker::ticker::{reconcile_interval, Ticker};
use crate::VerifierResult;

const QUEUE_NO_MESSAGE_SLEEP_DURATION: Duration = Duration::from_millis(1000);
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Drives the two paths of a worker process: consuming compilation messages and
/// the periodic deployment reconciliation. Both are multiplexed on one select loop,
/// so a task is fully handled before the next message or tick is looked at.
#[derive(Clone)]
pub struct WorkerController {
    config: Arc<Config>,
    cancellation_token: CancellationToken,
}

impl WorkerController {
    pub fn new(config: Arc<Config>, cancellation_token: CancellationToken) -> Self {
        Self { config, cancellation_token }
    }

    /// Triggers a graceful shutdown
    pub fn shutdown(&self) {
        info!("Triggering worker shutdown");
        self.cancellation_token.cancel();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Remove task directories a previous process left behind.
    pub async fn recover_working_dir(&self) {
        let params = self.config.params();
        match sweep_stale_dirs(&params.working_dir, params.stale_dir_ttl).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Removed stale task directories"),
            Err(e) => warn!(error = %e, "Failed to sweep the working directory"),
        }
    }

    /// Run until shutdown is requested or the queue stream ends.
    pub async fn run(&self) -> VerifierResult<()> {
        self.recover_working_dir().await;

        let period = reconcile_interval(self.config.params().reconcile_interval, self.config.chain()).await;
        let mut ticker = Ticker::new(period);
        let mut messages = self.config.queue().consume(QueueType::Compilations, QUEUE_NO_MESSAGE_SLEEP_DURATION);
        info!(reconcile_interval_secs = period.as_secs(), "Worker started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!("Shutdown requested, stopping worker");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = reconcile_deployments(&self.config).await {
                        error!(error = %e, error_chain = ?e, "Deployment reconciliation failed");
                    }
                }
                next = messages.next() => match next {
                    Some(Ok(message)) => handle_message(self.config.clone(), message).await,
                    Some(Err(e)) => {
                        let error = ConsumptionError::FailedToConsumeFromQueue { error_msg: e.to_string() };
                        error!(queue = %QueueType::Compilations, error = %error, "Failed to consume message");
                        tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
                    }
                    None => {
                        warn!(queue = %QueueType::Compilations, "Message stream ended");
                        break;
                    }
                },
            }
        }
        Ok(())
    }
}
