use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::db::models::PruneReport;
use crate::db::Store;
use crate::error::Result;
use crate::types::now_ms;

/// Background task that prunes the append-only logs on a fixed interval.
/// Odds snapshots and EV records older than the retention window are deleted;
/// fair odds are kept since each row is the current estimate for its market.
pub struct RetentionSweeper {
    store: Store,
    health: Arc<HealthState>,
    retention_ms: i64,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Store, health: Arc<HealthState>, retention_ms: i64, interval: Duration) -> Self {
        Self {
            store,
            health,
            retention_ms,
            interval,
        }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // consume immediate first tick

        loop {
            interval.tick().await;
            if let Err(e) = self.sweep().await {
                error!("Retention sweep error: {e}");
            }
        }
    }

    async fn sweep(&self) -> Result<PruneReport> {
        let now = now_ms();
        let report = self.store.prune_older_than(now - self.retention_ms).await?;
        self.health
            .record_sweep(now, report.odds_deleted + report.ev_deleted);
        info!(
            "Retention sweep removed {} odds / {} ev rows",
            report.odds_deleted, report.ev_deleted
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::types::NewOddsSnapshot;

    #[tokio::test]
    async fn sweep_prunes_and_updates_health() {
        let store = Store::new(connect_in_memory().await.unwrap());
        let stale = NewOddsSnapshot {
            timestamp: Some(now_ms() - 10 * 86_400_000),
            ..NewOddsSnapshot::new("m1", "BookA", 1.9, 1.9)
        };
        store.insert_odds_snapshot(&stale).await.unwrap();
        store
            .insert_odds_snapshot(&NewOddsSnapshot::new("m1", "BookB", 1.9, 1.9))
            .await
            .unwrap();

        let health = Arc::new(HealthState::new());
        let sweeper = RetentionSweeper::new(
            store.clone(),
            Arc::clone(&health),
            86_400_000,
            Duration::from_secs(60),
        );
        let report = sweeper.sweep().await.unwrap();

        assert_eq!(report.odds_deleted, 1);
        assert_eq!(report.odds_remaining, 1);
        assert_eq!(health.last_sweep_deleted(), 1);
        assert!(health.last_sweep_at_ms() > 0);
    }
}
