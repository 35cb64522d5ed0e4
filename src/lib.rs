//! SQLite store for sportsbook odds, fair-odds estimates and detected +EV bets.
//!
//! Three flat tables correlated only by `market_id`:
//! `odds_data` (append-only quotes), `fair_odds` (one current estimate per market)
//! and `ev_bets` (append-only edges).

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod odds;
pub mod types;
