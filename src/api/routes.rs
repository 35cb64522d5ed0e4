use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::config::{DEFAULT_FAIR_ODDS_HOURS, MS_PER_HOUR};
use crate::db::models::{EvBetRow, FairOddsRow, MarketHistory, OddsSnapshotRow, TableCount};
use crate::db::Store;
use crate::error::AppError;
use crate::types::{now_ms, FairOddsWrite, NewEvBet, NewFairOdds, NewOddsSnapshot};

#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/odds", get(get_odds).post(post_odds))
        .route("/odds/batch", post(post_odds_batch))
        .route(
            "/fair-odds",
            get(get_recent_fair_odds)
                .post(post_fair_odds)
                .put(put_fair_odds),
        )
        .route("/fair-odds/:market_id", get(get_fair_odds))
        .route("/ev-bets", post(post_ev_bet))
        .route("/ev-bets/positive", get(get_positive_ev))
        .route("/markets/:market_id/history", get(get_market_history))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct OddsQuery {
    pub market_id: Option<String>,
    pub since: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FairOddsQuery {
    pub hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PositiveEvQuery {
    pub min_ev: Option<f64>,
    pub limit: Option<i64>,
    pub sport: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct IdsResponse {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub tables: Vec<TableCount>,
    pub last_sweep_at_ms: Option<u64>,
    pub last_sweep_deleted: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let tables = state.store.table_counts().await?;
    let last_sweep = state.health.last_sweep_at_ms();
    Ok(Json(HealthResponse {
        status: "ok",
        tables,
        last_sweep_at_ms: (last_sweep > 0).then_some(last_sweep),
        last_sweep_deleted: state.health.last_sweep_deleted(),
    }))
}

async fn get_odds(
    State(state): State<ApiState>,
    Query(params): Query<OddsQuery>,
) -> Result<Json<Vec<OddsSnapshotRow>>, AppError> {
    let rows = state
        .store
        .query_recent_odds(params.market_id.as_deref(), params.since, params.limit)
        .await?;
    Ok(Json(rows))
}

async fn post_odds(
    State(state): State<ApiState>,
    Json(snapshot): Json<NewOddsSnapshot>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    let id = state.store.insert_odds_snapshot(&snapshot).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn post_odds_batch(
    State(state): State<ApiState>,
    Json(snapshots): Json<Vec<NewOddsSnapshot>>,
) -> Result<(StatusCode, Json<IdsResponse>), AppError> {
    let ids = state.store.insert_odds_batch(&snapshots).await?;
    Ok((StatusCode::CREATED, Json(IdsResponse { ids })))
}

async fn get_recent_fair_odds(
    State(state): State<ApiState>,
    Query(params): Query<FairOddsQuery>,
) -> Result<Json<Vec<FairOddsRow>>, AppError> {
    let hours = params.hours.unwrap_or(DEFAULT_FAIR_ODDS_HOURS).max(0);
    let since = now_ms() - hours.saturating_mul(MS_PER_HOUR);
    let rows = state.store.recent_fair_odds(since).await?;
    Ok(Json(rows))
}

async fn get_fair_odds(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
) -> Result<Json<FairOddsRow>, AppError> {
    state
        .store
        .get_fair_odds(&market_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("fair odds for market {market_id}")))
}

async fn post_fair_odds(
    State(state): State<ApiState>,
    Json(fair): Json<NewFairOdds>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    let id = state.store.insert_fair_odds(&fair).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn put_fair_odds(
    State(state): State<ApiState>,
    Json(fair): Json<NewFairOdds>,
) -> Result<Json<FairOddsWrite>, AppError> {
    let outcome = state.store.upsert_fair_odds(&fair).await?;
    Ok(Json(outcome))
}

async fn post_ev_bet(
    State(state): State<ApiState>,
    Json(bet): Json<NewEvBet>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    let id = state.store.insert_ev_bet(&bet).await?;
    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn get_positive_ev(
    State(state): State<ApiState>,
    Query(params): Query<PositiveEvQuery>,
) -> Result<Json<Vec<EvBetRow>>, AppError> {
    let rows = match params.sport.as_deref() {
        Some(sport) => {
            state
                .store
                .positive_ev_by_sport(sport, params.min_ev, params.limit)
                .await?
        }
        None => state.store.query_positive_ev(params.min_ev, params.limit).await?,
    };
    Ok(Json(rows))
}

async fn get_market_history(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
) -> Result<Json<MarketHistory>, AppError> {
    let history = state.store.market_history(&market_id).await?;
    Ok(Json(history))
}
