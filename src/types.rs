use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::odds;

// ---------------------------------------------------------------------------
// Market type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Moneyline,
    Spread,
    Total,
    Props,
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketType::Moneyline => "moneyline",
            MarketType::Spread => "spread",
            MarketType::Total => "total",
            MarketType::Props => "props",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MarketType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "moneyline" => Ok(MarketType::Moneyline),
            "spread" => Ok(MarketType::Spread),
            "total" => Ok(MarketType::Total),
            "props" => Ok(MarketType::Props),
            other => Err(AppError::Validation(format!("unknown market type: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Insert payloads
// ---------------------------------------------------------------------------

/// One observed quote from one sportsbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOddsSnapshot {
    pub market_id: String,
    pub book_name: String,
    pub odds_for: f64,
    pub odds_against: f64,
    /// Epoch milliseconds; None stamps the row with the insert time.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub market_type: Option<MarketType>,
    #[serde(default)]
    pub team_home: Option<String>,
    #[serde(default)]
    pub team_away: Option<String>,
}

impl NewOddsSnapshot {
    pub fn new(market_id: &str, book_name: &str, odds_for: f64, odds_against: f64) -> Self {
        Self {
            market_id: market_id.to_string(),
            book_name: book_name.to_string(),
            odds_for,
            odds_against,
            timestamp: None,
            sport: None,
            market_type: None,
            team_home: None,
            team_away: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_text("market_id", &self.market_id)?;
        require_text("book_name", &self.book_name)?;
        require_finite("odds_for", self.odds_for)?;
        require_finite("odds_against", self.odds_against)
    }
}

/// Consensus no-vig estimate for one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFairOdds {
    pub market_id: String,
    pub fair_prob: f64,
    pub fair_odds_decimal: f64,
    pub fair_odds_american: String,
    #[serde(default)]
    pub books_used: Option<i64>,
    #[serde(default)]
    pub exchanges_used: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub market_type: Option<MarketType>,
}

impl NewFairOdds {
    /// Derive both price notations from a fair probability.
    pub fn from_probability(
        market_id: &str,
        fair_prob: f64,
        books_used: i64,
        exchanges_used: i64,
    ) -> Result<Self> {
        let fair_odds_decimal = odds::fair_decimal(fair_prob)?;
        let fair_odds_american = odds::decimal_to_american(fair_odds_decimal)?;
        Ok(Self {
            market_id: market_id.to_string(),
            fair_prob,
            fair_odds_decimal,
            fair_odds_american,
            books_used: Some(books_used),
            exchanges_used: Some(exchanges_used),
            timestamp: None,
            sport: None,
            market_type: None,
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_text("market_id", &self.market_id)?;
        require_probability("fair_prob", self.fair_prob)?;
        require_finite("fair_odds_decimal", self.fair_odds_decimal)?;
        require_text("fair_odds_american", &self.fair_odds_american)?;
        for (field, count) in [
            ("books_used", self.books_used),
            ("exchanges_used", self.exchanges_used),
        ] {
            if count.is_some_and(|n| n < 0) {
                return Err(AppError::Validation(format!("{field} must not be negative")));
            }
        }
        Ok(())
    }
}

/// One book's price measured against the fair line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvBet {
    pub market_id: String,
    pub book_name: String,
    pub offered_odds: f64,
    pub fair_odds: f64,
    pub fair_prob: f64,
    pub ev_percentage: f64,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub market_type: Option<MarketType>,
    /// None stores the column default (true).
    #[serde(default)]
    pub is_positive_ev: Option<bool>,
}

impl NewEvBet {
    /// Price an offer against a fair probability. The positive-EV flag follows the EV sign.
    pub fn priced(market_id: &str, book_name: &str, offered_odds: f64, fair_prob: f64) -> Result<Self> {
        let ev_percentage = odds::ev_percentage(offered_odds, fair_prob)?;
        Ok(Self {
            market_id: market_id.to_string(),
            book_name: book_name.to_string(),
            offered_odds,
            fair_odds: odds::fair_decimal(fair_prob)?,
            fair_prob,
            ev_percentage,
            timestamp: None,
            sport: None,
            market_type: None,
            is_positive_ev: Some(ev_percentage > 0.0),
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_text("market_id", &self.market_id)?;
        require_text("book_name", &self.book_name)?;
        require_finite("offered_odds", self.offered_odds)?;
        require_finite("fair_odds", self.fair_odds)?;
        require_probability("fair_prob", self.fair_prob)?;
        require_finite("ev_percentage", self.ev_percentage)
    }
}

// ---------------------------------------------------------------------------
// Write outcomes
// ---------------------------------------------------------------------------

/// Result of a latest-wins fair odds write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FairOddsWrite {
    /// Inserted, or replaced an older estimate in place.
    Written { id: i64 },
    /// An estimate with an equal-or-newer timestamp is already stored.
    Stale,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_finite(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(AppError::Validation(format!("{field} must be a finite number")));
    }
    Ok(())
}

fn require_probability(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::Validation(format!("{field} must be within [0, 1], got {value}")));
    }
    Ok(())
}

/// Current wall clock as Unix epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
