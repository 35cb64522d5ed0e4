//! Database row types matching migrations/0001_init.sql.
//! Used by sqlx for typed queries and serialized as-is by the HTTP API.

use serde::Serialize;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OddsSnapshotRow {
    pub id: i64,
    pub market_id: String,
    pub book_name: String,
    pub odds_for: f64,
    pub odds_against: f64,
    pub timestamp: Option<i64>,
    pub sport: Option<String>,
    pub market_type: Option<String>,
    pub team_home: Option<String>,
    pub team_away: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FairOddsRow {
    pub id: i64,
    pub market_id: String,
    pub fair_prob: f64,
    pub fair_odds_decimal: f64,
    pub fair_odds_american: String,
    pub books_used: Option<i64>,
    pub exchanges_used: Option<i64>,
    pub timestamp: Option<i64>,
    pub sport: Option<String>,
    pub market_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EvBetRow {
    pub id: i64,
    pub market_id: String,
    pub book_name: String,
    pub offered_odds: f64,
    pub fair_odds: f64,
    pub fair_prob: f64,
    pub ev_percentage: f64,
    pub timestamp: Option<i64>,
    pub sport: Option<String>,
    pub market_type: Option<String>,
    pub is_positive_ev: Option<bool>,
}

/// Everything stored for one market.
#[derive(Debug, Clone, Serialize)]
pub struct MarketHistory {
    pub market_id: String,
    pub fair_odds: Option<FairOddsRow>,
    pub odds_data: Vec<OddsSnapshotRow>,
    pub ev_opportunities: Vec<EvBetRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub odds_deleted: u64,
    pub ev_deleted: u64,
    pub odds_remaining: i64,
    pub ev_remaining: i64,
}
