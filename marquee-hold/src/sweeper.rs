use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use marquee_core::SeatRepository;

/// Periodic reconciliation pass over seat leases.
///
/// Lock entries expire in the store on their own; this sweep brings the seat
/// records back in line with them, including seats left pending by a process
/// that died between claim and mirror write. The sweep predicate
/// (`locked_until` in the past, seat unbooked) is its own guard: a seat
/// re-locked by a new holder carries a future lease and is never touched, so
/// racing a release or commit is a safe no-op.
pub struct LeaseSweeper {
    handle: JoinHandle<()>,
}

impl LeaseSweeper {
    pub fn start(seats: Arc<dyn SeatRepository>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match seats.clear_expired_locks(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(n) => info!("Swept {} expired seat locks", n),
                    Err(e) => warn!("Lease sweep failed: {}", e),
                }
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}
