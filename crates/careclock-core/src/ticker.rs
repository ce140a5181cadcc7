//! Background sweep loop.
//!
//! Drives [`HealthService::tick`] at a fixed cadence. The loop itself never
//! exits on error: a failed sweep is logged and the next interval retried.

use chrono::Utc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::service::HealthService;
use crate::storage::TickerConfig;

pub struct Ticker {
    service: HealthService,
    interval: Duration,
}

impl Ticker {
    pub fn new(service: HealthService, config: &TickerConfig) -> Self {
        Self {
            service,
            interval: Duration::from_secs(config.interval_secs.max(1)),
        }
    }

    /// Run sweeps until the task is cancelled.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "ticker started");
        let mut interval = tokio::time::interval(self.interval);
        // Catching up on missed ticks would only repeat idempotent sweeps.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if let Err(err) = self.service.tick(Utc::now()).await {
                warn!(error = %err, "sweep failed");
            }
        }
    }
}
