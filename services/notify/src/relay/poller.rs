use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::repository::OutboxRepository;
use crate::relay::dispatcher::EventDispatcher;

/// Poll cadence and batch bound for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Time between ticks.
    pub poll_interval: Duration,
    /// Maximum number of entries claimed per tick.
    pub batch_size: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            batch_size: 10,
        }
    }
}

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub processed: usize,
    /// Entries left `PENDING` because dispatch or the status update failed.
    pub retained: usize,
    /// The batch could not be read; nothing was attempted.
    pub fetch_failed: bool,
}

/// Drains the outbox on a fixed interval.
///
/// Assumes it is the only poller: batches are read without claim locks, so two
/// instances against one database would deliver every event twice.
pub struct RelayPoller<O> {
    outbox: O,
    dispatcher: EventDispatcher,
    config: RelayConfig,
}

impl<O: OutboxRepository> RelayPoller<O> {
    pub fn new(outbox: O, dispatcher: EventDispatcher, config: RelayConfig) -> Self {
        Self {
            outbox,
            dispatcher,
            config,
        }
    }

    /// Tick until `cancel` fires.
    ///
    /// Cancellation is only observed between ticks: a tick that has started
    /// always runs to completion.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval = ?self.config.poll_interval,
            batch_size = self.config.batch_size,
            "outbox relay started"
        );
        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
        info!("outbox relay stopped");
    }

    /// Fetch one batch and dispatch it in creation order.
    pub async fn tick(&self) -> TickReport {
        let batch = match self.outbox.fetch_pending_batch(self.config.batch_size).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = ?e, "failed to fetch outbox batch");
                return TickReport {
                    fetch_failed: true,
                    ..TickReport::default()
                };
            }
        };

        let mut report = TickReport {
            fetched: batch.len(),
            ..TickReport::default()
        };
        if batch.is_empty() {
            return report;
        }
        debug!(fetched = report.fetched, "outbox batch fetched");

        for entry in &batch {
            if let Err(e) = self.dispatcher.dispatch(entry).await {
                warn!(
                    event_id = %entry.id,
                    event_type = %entry.event_type,
                    error = %e,
                    "failed to dispatch outbox entry, will retry"
                );
                report.retained += 1;
                continue;
            }

            match self.outbox.mark_processed(entry.id).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    // Delivery already happened; the entry will be delivered again next tick.
                    error!(event_id = %entry.id, error = ?e, "failed to mark outbox entry processed");
                    report.retained += 1;
                }
            }
        }

        info!(
            fetched = report.fetched,
            processed = report.processed,
            retained = report.retained,
            "outbox batch relayed"
        );
        report
    }
}
