use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use verifier_chain_client_interface::ChainClient;

use crate::types::constant::DEFAULT_RECONCILE_INTERVAL;

/// Fixed period schedule driven by the tokio clock, so paused-time tests can
/// advance it deterministically. The first tick fires one period after creation.
#[derive(Debug)]
pub struct Ticker {
    interval: Interval,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

/// Configured override, else the chain's block time, else [`DEFAULT_RECONCILE_INTERVAL`].
pub async fn reconcile_interval(configured: Option<Duration>, chain: &dyn ChainClient) -> Duration {
    if let Some(interval) = configured.filter(|i| !i.is_zero()) {
        return interval;
    }
    match chain.get_block_time().await {
        Ok(block_time) if !block_time.is_zero() => block_time,
        Ok(_) => DEFAULT_RECONCILE_INTERVAL,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read block time, using the default reconciliation interval");
            DEFAULT_RECONCILE_INTERVAL
        }
    }
}
