use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use super::DeliveryGate;
use crate::domain::ChangeNotification;

// ============================================================================
// Delivery Workers
// ============================================================================
//
// Stand-in for the delivery framework's consumer pool when the bridge runs on
// its own. A fixed number of workers drain one bounded channel; each worker
// takes a notification and runs it through the gate to completion before
// taking the next. Arrival order across workers is not preserved.
//
// ============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub handled: u64,
    pub declined: u64,
}

/// Run `consumers` workers until the channel is closed and drained
pub async fn run_workers(
    gate: Arc<DeliveryGate>,
    receiver: mpsc::Receiver<ChangeNotification>,
    consumers: usize,
) -> WorkerStats {
    let receiver = Arc::new(Mutex::new(receiver));
    let mut workers = JoinSet::new();

    for worker_id in 0..consumers.max(1) {
        let gate = gate.clone();
        let receiver = receiver.clone();

        workers.spawn(async move {
            tracing::debug!(worker_id, "Delivery worker started");
            let mut stats = WorkerStats::default();

            loop {
                // Hold the lock only while waiting for the next item
                let next = receiver.lock().await.recv().await;
                let Some(notification) = next else {
                    break;
                };

                if gate.before_delivery(&notification).await {
                    stats.declined += 1;
                } else {
                    stats.handled += 1;
                }
            }

            tracing::debug!(worker_id, handled = stats.handled, "Delivery worker stopped");
            stats
        });
    }

    let mut total = WorkerStats::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(stats) => {
                total.handled += stats.handled;
                total.declined += stats.declined;
            }
            Err(e) => tracing::error!(error = %e, "Delivery worker panicked"),
        }
    }
    total
}
