use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::debug;

use crate::metrics::LEDGER_ENTRIES;
use crate::state::AppState;

// Periodic eviction of counters whose window has passed. Nothing on
// the request path depends on this, but without it a long-running
// process accumulates dead entries forever.
pub async fn sweep_loop(state: Arc<AppState>, every: Duration) {
    let mut interval = interval(every);
    loop {
        interval.tick().await;
        let evicted = state.ledger.sweep() + state.burst.sweep() + state.cost.sweep();
        LEDGER_ENTRIES.set(state.ledger.len() as f64);
        if evicted > 0 {
            debug!(evicted, "evicted expired rate limit entries");
        }
    }
}
