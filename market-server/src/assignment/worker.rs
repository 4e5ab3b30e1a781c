use super::scheduler::AssignmentScheduler;
use crate::orders::OrderEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Opens assignment tasks for confirmed orders and drives due retries
pub struct AssignmentWorker {
    scheduler: Arc<AssignmentScheduler>,
    tick: Duration,
}

impl AssignmentWorker {
    pub fn new(scheduler: Arc<AssignmentScheduler>, tick: Duration) -> Self {
        Self { scheduler, tick }
    }

    pub async fn run(
        self,
        mut event_rx: mpsc::Receiver<Arc<OrderEvent>>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(tick_secs = self.tick.as_secs(), "Assignment worker started");

        let mut tick = tokio::time::interval(self.tick);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Assignment worker stopping");
                    break;
                }
                event = event_rx.recv() => match event {
                    Some(event) => {
                        let now = shared::util::now_millis();
                        if let Err(e) = self.scheduler.start(&event.order_id, now).await {
                            tracing::error!(order_id = %event.order_id, error = %e, "Failed to start assignment");
                        }
                    }
                    None => {
                        tracing::info!("Assignment channel closed, worker stopping");
                        break;
                    }
                },
                _ = tick.tick() => {
                    self.scheduler.process_due(shared::util::now_millis()).await;
                }
            }
        }
    }
}
