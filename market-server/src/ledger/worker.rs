//! Ledger worker
//!
//! Drains the credit outbox. Entering `delivered` writes a [`LedgerJob`] in
//! the same transaction as the status change; this worker turns jobs into
//! ledger credits. It is woken by delivered events from the router and also
//! rescans the outbox on an interval, so a missed wake-up only delays a
//! credit.

use super::engine::LedgerEngine;
use crate::orders::OrderEvent;
use crate::storage::{LedgerJob, MarketStorage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const MAX_RETRY_COUNT: u32 = 5;
const RETRY_BASE_DELAY_SECS: u64 = 5;
const RETRY_MAX_DELAY_SECS: u64 = 300;

pub struct LedgerWorker {
    storage: MarketStorage,
    engine: LedgerEngine,
    scan_interval: Duration,
}

impl LedgerWorker {
    pub fn new(storage: MarketStorage, engine: LedgerEngine, scan_interval: Duration) -> Self {
        Self {
            storage,
            engine,
            scan_interval,
        }
    }

    pub async fn run(
        self,
        mut event_rx: mpsc::Receiver<Arc<OrderEvent>>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Ledger worker started");

        // Jobs left over from a previous run
        self.process_pending(shared::util::now_millis());

        let mut scan = tokio::time::interval(self.scan_interval);
        scan.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Ledger worker stopping");
                    break;
                }
                event = event_rx.recv() => match event {
                    Some(event) => {
                        tracing::debug!(order_id = %event.order_id, "Delivered event received");
                        self.process_order(&event.order_id);
                    }
                    None => {
                        tracing::info!("Ledger channel closed, ledger worker stopping");
                        break;
                    }
                },
                _ = scan.tick() => {
                    self.process_pending(shared::util::now_millis());
                }
            }
        }
    }

    /// Retry every job whose back-off has elapsed; returns how many ran
    pub fn process_pending(&self, now: i64) -> usize {
        let jobs = match self.storage.pending_ledger_jobs() {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read ledger outbox");
                return 0;
            }
        };

        let mut processed = 0;
        for job in jobs {
            if self.should_retry(&job, now) {
                self.process_order(&job.order_id);
                processed += 1;
            }
        }
        processed
    }

    fn should_retry(&self, job: &LedgerJob, now: i64) -> bool {
        if job.retry_count >= MAX_RETRY_COUNT {
            let error = job.last_error.as_deref().unwrap_or("Unknown error");
            tracing::error!(
                order_id = %job.order_id,
                retry_count = job.retry_count,
                last_error = %error,
                "Ledger credit exhausted its retries, moving to dead letter"
            );
            if let Err(e) = self
                .storage
                .move_ledger_job_to_dead_letter(&job.order_id, error, now)
            {
                tracing::error!(order_id = %job.order_id, error = %e, "Failed to dead-letter ledger job");
            }
            return false;
        }
        if job.retry_count == 0 {
            return true;
        }

        let delay_secs = (RETRY_BASE_DELAY_SECS * 2u64.pow(job.retry_count)).min(RETRY_MAX_DELAY_SECS);
        now >= job.created_at + (delay_secs as i64 * 1000)
    }

    fn process_order(&self, order_id: &str) {
        match self.engine.post_order_completion(order_id) {
            Ok(_) => {}
            Err(e) => {
                tracing::error!(order_id = %order_id, error = %e, "Posting completion credit failed");
                if let Err(e2) = self.storage.mark_ledger_job_failed(order_id, &e.to_string()) {
                    tracing::error!(order_id = %order_id, error = %e2, "Failed to record ledger job failure");
                }
            }
        }
    }
}
