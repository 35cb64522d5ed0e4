//! Shared health state for the /health endpoint.
//! Updated by RetentionSweeper, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Epoch milliseconds of the last completed retention sweep (0 = none yet).
    pub last_sweep_at_ms: AtomicU64,
    /// Rows deleted by the last sweep.
    pub last_sweep_deleted: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sweep(&self, at_ms: i64, deleted: u64) {
        self.last_sweep_at_ms
            .store(u64::try_from(at_ms).unwrap_or(0), Ordering::Relaxed);
        self.last_sweep_deleted.store(deleted, Ordering::Relaxed);
    }

    pub fn last_sweep_at_ms(&self) -> u64 {
        self.last_sweep_at_ms.load(Ordering::Relaxed)
    }

    pub fn last_sweep_deleted(&self) -> u64 {
        self.last_sweep_deleted.load(Ordering::Relaxed)
    }
}
