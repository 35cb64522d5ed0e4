use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::config::{
    clamp_limit, DEFAULT_EV_LIMIT, DEFAULT_ODDS_LIMIT, DEFAULT_SPORT_EV_LIMIT, DEFAULT_SPORT_MIN_EV,
};
use crate::db::models::{
    EvBetRow, FairOddsRow, MarketHistory, OddsSnapshotRow, PruneReport, TableCount,
};
use crate::error::{AppError, Result};
use crate::types::{now_ms, FairOddsWrite, NewEvBet, NewFairOdds, NewOddsSnapshot};

const TABLES: [&str; 3] = ["odds_data", "fair_odds", "ev_bets"];

pub(crate) const MARKET_ODDS_SQL: &str = r#"
    SELECT id, market_id, book_name, odds_for, odds_against, timestamp,
           sport, market_type, team_home, team_away
    FROM odds_data
    WHERE market_id = ? AND (? IS NULL OR timestamp >= ?)
    ORDER BY timestamp ASC, id ASC
    LIMIT ?
"#;

const RECENT_ODDS_SQL: &str = r#"
    SELECT id, market_id, book_name, odds_for, odds_against, timestamp,
           sport, market_type, team_home, team_away
    FROM odds_data
    WHERE ? IS NULL OR timestamp >= ?
    ORDER BY timestamp DESC, id DESC
    LIMIT ?
"#;

pub(crate) const POSITIVE_EV_SQL: &str = r#"
    SELECT id, market_id, book_name, offered_odds, fair_odds, fair_prob, ev_percentage,
           timestamp, sport, market_type, is_positive_ev
    FROM ev_bets
    WHERE is_positive_ev = 1 AND ev_percentage >= ?
    ORDER BY ev_percentage DESC, timestamp DESC
    LIMIT ?
"#;

const SPORT_POSITIVE_EV_SQL: &str = r#"
    SELECT id, market_id, book_name, offered_odds, fair_odds, fair_prob, ev_percentage,
           timestamp, sport, market_type, is_positive_ev
    FROM ev_bets
    WHERE is_positive_ev = 1 AND ev_percentage >= ? AND sport = ?
    ORDER BY ev_percentage DESC, timestamp DESC
    LIMIT ?
"#;

const FAIR_ODDS_COLUMNS: &str = "id, market_id, fair_prob, fair_odds_decimal, fair_odds_american, \
     books_used, exchanges_used, timestamp, sport, market_type";

/// Typed access to the three odds tables.
/// Cloning is cheap; every clone shares the same pool.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // -----------------------------------------------------------------------
    // odds_data
    // -----------------------------------------------------------------------

    pub async fn insert_odds_snapshot(&self, snapshot: &NewOddsSnapshot) -> Result<i64> {
        snapshot.validate()?;
        let id = insert_odds(&self.pool, snapshot).await?;
        debug!(market_id = %snapshot.market_id, book = %snapshot.book_name, id, "odds snapshot stored");
        Ok(id)
    }

    /// Store quotes from several books in one transaction. Nothing is written if any row fails.
    pub async fn insert_odds_batch(&self, snapshots: &[NewOddsSnapshot]) -> Result<Vec<i64>> {
        for snapshot in snapshots {
            snapshot.validate()?;
        }

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            ids.push(insert_odds(&mut *tx, snapshot).await?);
        }
        tx.commit().await?;

        debug!(rows = ids.len(), "odds batch stored");
        Ok(ids)
    }

    /// With `market_id`: that market's quotes, oldest first.
    /// Without: the most recent quotes across all markets, newest first.
    pub async fn query_recent_odds(
        &self,
        market_id: Option<&str>,
        since: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<OddsSnapshotRow>> {
        let limit = clamp_limit(limit, DEFAULT_ODDS_LIMIT);
        let rows = match market_id {
            Some(market_id) => {
                sqlx::query_as::<_, OddsSnapshotRow>(MARKET_ODDS_SQL)
                    .bind(market_id)
                    .bind(since)
                    .bind(since)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, OddsSnapshotRow>(RECENT_ODDS_SQL)
                    .bind(since)
                    .bind(since)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // fair_odds
    // -----------------------------------------------------------------------

    /// Strict insert. A second estimate for the same market fails with `AppError::Conflict`.
    pub async fn insert_fair_odds(&self, fair: &NewFairOdds) -> Result<i64> {
        fair.validate()?;
        let market_type = fair.market_type.map(|m| m.to_string());

        let result = sqlx::query(
            r#"
            INSERT INTO fair_odds (
                market_id, fair_prob, fair_odds_decimal, fair_odds_american,
                books_used, exchanges_used, timestamp, sport, market_type
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fair.market_id)
        .bind(fair.fair_prob)
        .bind(fair.fair_odds_decimal)
        .bind(&fair.fair_odds_american)
        .bind(fair.books_used)
        .bind(fair.exchanges_used)
        .bind(fair.timestamp.unwrap_or_else(now_ms))
        .bind(&fair.sport)
        .bind(market_type)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &fair.market_id))?;

        let id = result.last_insert_rowid();
        debug!(market_id = %fair.market_id, id, "fair odds inserted");
        Ok(id)
    }

    /// Latest-wins write. Replaces the stored estimate in place (keeping its id) when the
    /// incoming timestamp is at least as new; otherwise leaves it untouched.
    pub async fn upsert_fair_odds(&self, fair: &NewFairOdds) -> Result<FairOddsWrite> {
        fair.validate()?;
        let market_type = fair.market_type.map(|m| m.to_string());

        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO fair_odds (
                market_id, fair_prob, fair_odds_decimal, fair_odds_american,
                books_used, exchanges_used, timestamp, sport, market_type
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(market_id) DO UPDATE SET
                fair_prob = excluded.fair_prob,
                fair_odds_decimal = excluded.fair_odds_decimal,
                fair_odds_american = excluded.fair_odds_american,
                books_used = excluded.books_used,
                exchanges_used = excluded.exchanges_used,
                timestamp = excluded.timestamp,
                sport = excluded.sport,
                market_type = excluded.market_type
            WHERE fair_odds.timestamp IS NULL OR excluded.timestamp >= fair_odds.timestamp
            RETURNING id
            "#,
        )
        .bind(&fair.market_id)
        .bind(fair.fair_prob)
        .bind(fair.fair_odds_decimal)
        .bind(&fair.fair_odds_american)
        .bind(fair.books_used)
        .bind(fair.exchanges_used)
        .bind(fair.timestamp.unwrap_or_else(now_ms))
        .bind(&fair.sport)
        .bind(market_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &fair.market_id))?;

        match id {
            Some(id) => {
                debug!(market_id = %fair.market_id, id, "fair odds written");
                Ok(FairOddsWrite::Written { id })
            }
            None => {
                debug!(market_id = %fair.market_id, "fair odds older than stored estimate, skipped");
                Ok(FairOddsWrite::Stale)
            }
        }
    }

    pub async fn get_fair_odds(&self, market_id: &str) -> Result<Option<FairOddsRow>> {
        let sql = format!("SELECT {FAIR_ODDS_COLUMNS} FROM fair_odds WHERE market_id = ?");
        let row = sqlx::query_as::<_, FairOddsRow>(&sql)
            .bind(market_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Estimates computed at or after `since_ms`, newest first.
    pub async fn recent_fair_odds(&self, since_ms: i64) -> Result<Vec<FairOddsRow>> {
        let sql = format!(
            "SELECT {FAIR_ODDS_COLUMNS} FROM fair_odds WHERE timestamp >= ? ORDER BY timestamp DESC"
        );
        let rows = sqlx::query_as::<_, FairOddsRow>(&sql)
            .bind(since_ms)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // ev_bets
    // -----------------------------------------------------------------------

    pub async fn insert_ev_bet(&self, bet: &NewEvBet) -> Result<i64> {
        bet.validate()?;
        let market_type = bet.market_type.map(|m| m.to_string());

        let result = sqlx::query(
            r#"
            INSERT INTO ev_bets (
                market_id, book_name, offered_odds, fair_odds, fair_prob, ev_percentage,
                timestamp, sport, market_type, is_positive_ev
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bet.market_id)
        .bind(&bet.book_name)
        .bind(bet.offered_odds)
        .bind(bet.fair_odds)
        .bind(bet.fair_prob)
        .bind(bet.ev_percentage)
        .bind(bet.timestamp.unwrap_or_else(now_ms))
        .bind(&bet.sport)
        .bind(market_type)
        .bind(bet.is_positive_ev.unwrap_or(true))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::from_write(e, &bet.market_id))?;

        let id = result.last_insert_rowid();
        debug!(
            market_id = %bet.market_id,
            book = %bet.book_name,
            ev = bet.ev_percentage,
            id,
            "ev bet stored"
        );
        Ok(id)
    }

    /// Flagged +EV rows at or above `min_ev`, best edge first.
    pub async fn query_positive_ev(
        &self,
        min_ev: Option<f64>,
        limit: Option<i64>,
    ) -> Result<Vec<EvBetRow>> {
        let rows = sqlx::query_as::<_, EvBetRow>(POSITIVE_EV_SQL)
            .bind(min_ev.unwrap_or(0.0))
            .bind(clamp_limit(limit, DEFAULT_EV_LIMIT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn positive_ev_by_sport(
        &self,
        sport: &str,
        min_ev: Option<f64>,
        limit: Option<i64>,
    ) -> Result<Vec<EvBetRow>> {
        let rows = sqlx::query_as::<_, EvBetRow>(SPORT_POSITIVE_EV_SQL)
            .bind(min_ev.unwrap_or(DEFAULT_SPORT_MIN_EV))
            .bind(sport)
            .bind(clamp_limit(limit, DEFAULT_SPORT_EV_LIMIT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Cross-table
    // -----------------------------------------------------------------------

    pub async fn market_history(&self, market_id: &str) -> Result<MarketHistory> {
        let odds_data = sqlx::query_as::<_, OddsSnapshotRow>(
            r#"
            SELECT id, market_id, book_name, odds_for, odds_against, timestamp,
                   sport, market_type, team_home, team_away
            FROM odds_data
            WHERE market_id = ?
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(market_id)
        .fetch_all(&self.pool)
        .await?;

        let ev_opportunities = sqlx::query_as::<_, EvBetRow>(
            r#"
            SELECT id, market_id, book_name, offered_odds, fair_odds, fair_prob, ev_percentage,
                   timestamp, sport, market_type, is_positive_ev
            FROM ev_bets
            WHERE market_id = ?
            ORDER BY ev_percentage DESC
            "#,
        )
        .bind(market_id)
        .fetch_all(&self.pool)
        .await?;

        let fair_odds = self.get_fair_odds(market_id).await?;

        Ok(MarketHistory {
            market_id: market_id.to_string(),
            fair_odds,
            odds_data,
            ev_opportunities,
        })
    }

    /// Delete odds and EV rows stamped before `cutoff_ms`, plus rows with no timestamp at all.
    /// Fair odds are current state and stay.
    pub async fn prune_older_than(&self, cutoff_ms: i64) -> Result<PruneReport> {
        let mut tx = self.pool.begin().await?;

        let odds_deleted = sqlx::query(
            "DELETE FROM odds_data WHERE timestamp IS NULL OR timestamp < ?",
        )
            .bind(cutoff_ms)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let ev_deleted = sqlx::query(
            "DELETE FROM ev_bets WHERE timestamp IS NULL OR timestamp < ?",
        )
            .bind(cutoff_ms)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let odds_remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM odds_data")
            .fetch_one(&mut *tx)
            .await?;
        let ev_remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ev_bets")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            odds_deleted,
            ev_deleted, odds_remaining, ev_remaining, "Pruned records older than {cutoff_ms}"
        );
        Ok(PruneReport {
            odds_deleted,
            ev_deleted,
            odds_remaining,
            ev_remaining,
        })
    }

    pub async fn table_counts(&self) -> Result<Vec<TableCount>> {
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
                .fetch_one(&self.pool)
                .await?;
            counts.push(TableCount {
                table: table.to_string(),
                rows,
            });
        }
        Ok(counts)
    }
}

async fn insert_odds<'e, E>(executor: E, s: &NewOddsSnapshot) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let market_type = s.market_type.map(|m| m.to_string());

    let result = sqlx::query(
        r#"
        INSERT INTO odds_data (
            market_id, book_name, odds_for, odds_against, timestamp,
            sport, market_type, team_home, team_away
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&s.market_id)
    .bind(&s.book_name)
    .bind(s.odds_for)
    .bind(s.odds_against)
    .bind(s.timestamp.unwrap_or_else(now_ms))
    .bind(&s.sport)
    .bind(market_type)
    .bind(&s.team_home)
    .bind(&s.team_away)
    .execute(executor)
    .await
    .map_err(|e| AppError::from_write(e, &s.market_id))?;

    Ok(result.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::types::MarketType;
    use sqlx::Row;

    const KC_BAL: &str = "nfl-2024-w1-KC-BAL-ML";

    async fn store() -> Store {
        Store::new(connect_in_memory().await.expect("in-memory db"))
    }

    fn quote(market_id: &str, book: &str, ts: i64) -> NewOddsSnapshot {
        NewOddsSnapshot {
            timestamp: Some(ts),
            ..NewOddsSnapshot::new(market_id, book, -150.0, 130.0)
        }
    }

    fn bet(market_id: &str, book: &str, ev: f64, positive: Option<bool>) -> NewEvBet {
        NewEvBet {
            market_id: market_id.to_string(),
            book_name: book.to_string(),
            offered_odds: 2.1,
            fair_odds: 2.0,
            fair_prob: 0.5,
            ev_percentage: ev,
            timestamp: Some(1_000),
            sport: Some("NFL".to_string()),
            market_type: Some(MarketType::Moneyline),
            is_positive_ev: positive,
        }
    }

    fn fair(market_id: &str, prob: f64, ts: i64) -> NewFairOdds {
        NewFairOdds {
            timestamp: Some(ts),
            ..NewFairOdds::from_probability(market_id, prob, 7, 2).unwrap()
        }
    }

    async fn query_plan(store: &Store, sql: &str, binds: usize) -> Vec<String> {
        let explain = format!("EXPLAIN QUERY PLAN {sql}");
        let mut query = sqlx::query(&explain);
        for _ in 0..binds {
            query = query.bind(Option::<i64>::None);
        }
        query
            .fetch_all(store.pool())
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.get::<String, _>("detail"))
            .collect()
    }

    #[tokio::test]
    async fn snapshot_is_retrievable_by_market() {
        let store = store().await;
        let snapshot = NewOddsSnapshot {
            sport: Some("NFL".to_string()),
            market_type: Some(MarketType::Moneyline),
            ..NewOddsSnapshot::new(KC_BAL, "BookA", -150.0, 130.0)
        };
        let id = store.insert_odds_snapshot(&snapshot).await.unwrap();

        let rows = store.query_recent_odds(Some(KC_BAL), None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].book_name, "BookA");
        assert_eq!(rows[0].odds_for, -150.0);
        assert_eq!(rows[0].odds_against, 130.0);
        assert_eq!(rows[0].market_type.as_deref(), Some("moneyline"));
        assert!(rows[0].timestamp.is_some(), "omitted timestamp is filled in");
    }

    #[tokio::test]
    async fn snapshot_ids_increase() {
        let store = store().await;
        let a = store.insert_odds_snapshot(&quote("m1", "BookA", 1)).await.unwrap();
        let b = store.insert_odds_snapshot(&quote("m1", "BookB", 1)).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn snapshot_missing_required_field_is_rejected() {
        let store = store().await;
        let err = store
            .insert_odds_snapshot(&NewOddsSnapshot::new("", "BookA", -150.0, 130.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Raw writes that bypass validation still hit the NOT NULL constraint.
        let err = sqlx::query("INSERT INTO odds_data (market_id, book_name, odds_for) VALUES ('m1', 'BookA', 1.9)")
            .execute(store.pool())
            .await
            .map_err(|e| AppError::from_write(e, "m1"))
            .unwrap_err();
        assert!(matches!(err, AppError::Constraint(_)), "got {err:?}");

        assert_eq!(store.query_recent_odds(None, None, None).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn schema_defaults_fill_timestamp_and_positive_flag() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO ev_bets (market_id, book_name, offered_odds, fair_odds, fair_prob, ev_percentage)
             VALUES ('m1', 'BookA', 2.1, 2.0, 0.5, 5.0)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let rows = store.query_positive_ev(None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].is_positive_ev, Some(true));
        let ts = rows[0].timestamp.expect("default timestamp");
        assert!((ts - now_ms()).abs() < 60_000, "default is epoch millis, got {ts}");
    }

    #[tokio::test]
    async fn market_history_is_ordered_by_timestamp() {
        let store = store().await;
        store.insert_odds_snapshot(&quote("m1", "BookA", 300)).await.unwrap();
        store.insert_odds_snapshot(&quote("m2", "BookA", 200)).await.unwrap();
        store.insert_odds_snapshot(&quote("m1", "BookB", 100)).await.unwrap();
        store.insert_odds_snapshot(&quote("m1", "BookC", 200)).await.unwrap();

        let rows = store.query_recent_odds(Some("m1"), None, None).await.unwrap();
        let stamps: Vec<_> = rows.iter().map(|r| r.timestamp.unwrap()).collect();
        assert_eq!(stamps, vec![100, 200, 300]);

        let since = store.query_recent_odds(Some("m1"), Some(200), None).await.unwrap();
        assert_eq!(since.len(), 2);

        let all = store.query_recent_odds(None, None, Some(2)).await.unwrap();
        let stamps: Vec<_> = all.iter().map(|r| r.timestamp.unwrap()).collect();
        assert_eq!(stamps, vec![300, 200]);
    }

    #[tokio::test]
    async fn market_lookup_uses_market_index() {
        let store = store().await;
        let plan = query_plan(&store, MARKET_ODDS_SQL, 4).await;
        assert!(
            plan.iter().any(|d| d.contains("idx_odds_market")),
            "plan: {plan:?}"
        );
    }

    #[tokio::test]
    async fn positive_ev_scan_uses_composite_index() {
        let store = store().await;
        let plan = query_plan(&store, POSITIVE_EV_SQL, 2).await;
        assert!(
            plan.iter().any(|d| d.contains("idx_ev_positive")),
            "plan: {plan:?}"
        );
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = store().await;
        let batch = vec![quote("m1", "BookA", 1), quote("m1", "", 1)];
        assert!(store.insert_odds_batch(&batch).await.is_err());
        assert!(store.query_recent_odds(None, None, None).await.unwrap().is_empty());

        let batch = vec![quote("m1", "BookA", 1), quote("m1", "BookB", 1)];
        let ids = store.insert_odds_batch(&batch).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.query_recent_odds(Some("m1"), None, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_fair_odds_insert_conflicts() {
        let store = store().await;
        store.insert_fair_odds(&fair(KC_BAL, 0.6, 1)).await.unwrap();

        let err = store.insert_fair_odds(&fair(KC_BAL, 0.55, 2)).await.unwrap_err();
        match err {
            AppError::Conflict { market_id } => assert_eq!(market_id, KC_BAL),
            other => panic!("expected conflict, got {other:?}"),
        }

        let stored = store.get_fair_odds(KC_BAL).await.unwrap().unwrap();
        assert!((stored.fair_prob - 0.6).abs() < 1e-9, "first estimate untouched");
    }

    #[tokio::test]
    async fn upsert_replaces_older_estimate_in_place() {
        let store = store().await;
        let first = store.upsert_fair_odds(&fair("m1", 0.5, 100)).await.unwrap();
        let FairOddsWrite::Written { id } = first else {
            panic!("first write must land");
        };

        let second = store.upsert_fair_odds(&fair("m1", 0.4, 200)).await.unwrap();
        assert_eq!(second, FairOddsWrite::Written { id });

        let row = store.get_fair_odds("m1").await.unwrap().unwrap();
        assert!((row.fair_prob - 0.4).abs() < 1e-9);
        assert_eq!(row.fair_odds_american, "+150");
        assert_eq!(row.timestamp, Some(200));
    }

    #[tokio::test]
    async fn upsert_skips_stale_estimate() {
        let store = store().await;
        store.upsert_fair_odds(&fair("m1", 0.4, 200)).await.unwrap();

        let outcome = store.upsert_fair_odds(&fair("m1", 0.7, 100)).await.unwrap();
        assert_eq!(outcome, FairOddsWrite::Stale);

        let row = store.get_fair_odds("m1").await.unwrap().unwrap();
        assert!((row.fair_prob - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn recent_fair_odds_filters_by_time() {
        let store = store().await;
        store.upsert_fair_odds(&fair("old", 0.5, 100)).await.unwrap();
        store.upsert_fair_odds(&fair("new", 0.5, 500)).await.unwrap();
        store.upsert_fair_odds(&fair("newer", 0.5, 900)).await.unwrap();

        let rows = store.recent_fair_odds(400).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.market_id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "new"]);
    }

    #[tokio::test]
    async fn ev_flag_defaults_to_true() {
        let store = store().await;
        store.insert_ev_bet(&bet("m1", "BookA", 3.0, None)).await.unwrap();
        let rows = store.query_positive_ev(None, None).await.unwrap();
        assert_eq!(rows[0].is_positive_ev, Some(true));
    }

    #[tokio::test]
    async fn ev_duplicates_are_kept() {
        let store = store().await;
        let a = store.insert_ev_bet(&bet("m1", "BookA", 3.0, None)).await.unwrap();
        let b = store.insert_ev_bet(&bet("m1", "BookA", 3.0, None)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.query_positive_ev(None, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn top_positive_ev_is_sorted_and_filtered() {
        let store = store().await;
        for (i, ev) in [1.5, 7.0, 3.2, 9.1, 0.4, 4.4, 2.2].into_iter().enumerate() {
            store
                .insert_ev_bet(&bet("m1", &format!("Book{i}"), ev, Some(true)))
                .await
                .unwrap();
        }
        store.insert_ev_bet(&bet("m1", "Flagged", 50.0, Some(false))).await.unwrap();

        let top = store.query_positive_ev(None, Some(5)).await.unwrap();
        let evs: Vec<_> = top.iter().map(|r| r.ev_percentage).collect();
        assert_eq!(evs, vec![9.1, 7.0, 4.4, 3.2, 2.2]);
        assert!(top.iter().all(|r| r.is_positive_ev == Some(true)));

        let above = store.query_positive_ev(Some(4.0), None).await.unwrap();
        assert_eq!(above.len(), 3);
    }

    #[tokio::test]
    async fn positive_ev_by_sport_restricts_sport() {
        let store = store().await;
        store.insert_ev_bet(&bet("m1", "BookA", 5.0, None)).await.unwrap();
        store.insert_ev_bet(&bet("m1", "BookB", 1.0, None)).await.unwrap();
        let nba = NewEvBet {
            sport: Some("NBA".to_string()),
            ..bet("m2", "BookA", 8.0, None)
        };
        store.insert_ev_bet(&nba).await.unwrap();

        let rows = store.positive_ev_by_sport("NFL", None, None).await.unwrap();
        assert_eq!(rows.len(), 1, "default minimum edge excludes 1%");
        assert_eq!(rows[0].book_name, "BookA");
        assert_eq!(rows[0].sport.as_deref(), Some("NFL"));
    }

    #[tokio::test]
    async fn market_history_collects_all_tables() {
        let store = store().await;
        store.insert_odds_snapshot(&quote("m1", "BookA", 100)).await.unwrap();
        store.insert_odds_snapshot(&quote("m1", "BookB", 200)).await.unwrap();
        store.insert_odds_snapshot(&quote("m2", "BookA", 200)).await.unwrap();
        store.insert_ev_bet(&bet("m1", "BookA", 1.0, None)).await.unwrap();
        store.insert_ev_bet(&bet("m1", "BookB", 4.0, None)).await.unwrap();
        store.upsert_fair_odds(&fair("m1", 0.5, 100)).await.unwrap();

        let history = store.market_history("m1").await.unwrap();
        assert_eq!(history.odds_data.len(), 2);
        assert_eq!(history.odds_data[0].timestamp, Some(200), "newest first");
        assert_eq!(history.ev_opportunities[0].ev_percentage, 4.0);
        assert!(history.fair_odds.is_some());

        let empty = store.market_history("missing").await.unwrap();
        assert!(empty.odds_data.is_empty() && empty.fair_odds.is_none());
    }

    #[tokio::test]
    async fn prune_removes_old_logs_but_keeps_fair_odds() {
        let store = store().await;
        store.insert_odds_snapshot(&quote("m1", "BookA", 100)).await.unwrap();
        store.insert_odds_snapshot(&quote("m1", "BookB", 900)).await.unwrap();
        store.insert_ev_bet(&bet("m1", "BookA", 3.0, None)).await.unwrap(); // ts 1_000
        store.upsert_fair_odds(&fair("m1", 0.5, 10)).await.unwrap();

        let report = store.prune_older_than(500).await.unwrap();
        assert_eq!(
            report,
            PruneReport {
                odds_deleted: 1,
                ev_deleted: 0,
                odds_remaining: 1,
                ev_remaining: 1,
            }
        );
        assert!(store.get_fair_odds("m1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn prune_removes_rows_without_timestamp() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO odds_data (market_id, book_name, odds_for, odds_against, timestamp)
             VALUES ('m1', 'BookA', 1.9, 1.9, NULL)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO ev_bets (market_id, book_name, offered_odds, fair_odds, fair_prob, ev_percentage, timestamp)
             VALUES ('m1', 'BookA', 2.1, 2.0, 0.5, 5.0, NULL)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        store.insert_odds_snapshot(&quote("m1", "BookB", 900)).await.unwrap();

        let report = store.prune_older_than(500).await.unwrap();
        assert_eq!(report.odds_deleted, 1);
        assert_eq!(report.ev_deleted, 1);
        assert_eq!(report.odds_remaining, 1);
        assert_eq!(report.ev_remaining, 0);
    }

    #[tokio::test]
    async fn table_counts_cover_every_table() {
        let store = store().await;
        store.insert_odds_snapshot(&quote("m1", "BookA", 1)).await.unwrap();
        let counts = store.table_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                TableCount { table: "odds_data".to_string(), rows: 1 },
                TableCount { table: "fair_odds".to_string(), rows: 0 },
                TableCount { table: "ev_bets".to_string(), rows: 0 },
            ]
        );
    }
}
