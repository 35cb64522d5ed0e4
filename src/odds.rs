//! Price notation arithmetic shared by the record builders.
//! Decimal odds are the canonical form; American odds are text ("+150", "-110").

use crate::error::{AppError, Result};

/// Format decimal odds as signed American odds.
pub fn decimal_to_american(decimal: f64) -> Result<String> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return Err(AppError::Validation(format!(
            "decimal odds must be greater than 1.0, got {decimal}"
        )));
    }
    if decimal >= 2.0 {
        Ok(format!("+{}", whole_price((decimal - 1.0) * 100.0)))
    } else {
        Ok(format!("{}", whole_price(-100.0 / (decimal - 1.0))))
    }
}

/// Truncate to a whole price, snapping float noise like 129.99999999999997 to 130 first.
fn whole_price(raw: f64) -> i64 {
    let nearest = raw.round();
    if (raw - nearest).abs() < 1e-9 {
        nearest as i64
    } else {
        raw.trunc() as i64
    }
}

/// Convert signed American odds to decimal odds.
pub fn american_to_decimal(american: f64) -> Result<f64> {
    if !american.is_finite() || american.abs() < 100.0 {
        return Err(AppError::Validation(format!(
            "American odds must be <= -100 or >= +100, got {american}"
        )));
    }
    if american > 0.0 {
        Ok(1.0 + american / 100.0)
    } else {
        Ok(1.0 + 100.0 / american.abs())
    }
}

/// Implied win probability of a decimal price, vig included.
pub fn implied_probability(decimal: f64) -> Result<f64> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return Err(AppError::Validation(format!(
            "decimal odds must be greater than 1.0, got {decimal}"
        )));
    }
    Ok(1.0 / decimal)
}

/// Decimal price that exactly pays out a fair probability.
pub fn fair_decimal(prob: f64) -> Result<f64> {
    if !(prob > 0.0 && prob <= 1.0) {
        return Err(AppError::Validation(format!(
            "probability must be in (0, 1], got {prob}"
        )));
    }
    Ok(1.0 / prob)
}

/// Expected value of a unit stake at `offered` decimal odds, as a percentage.
pub fn ev_percentage(offered: f64, fair_prob: f64) -> Result<f64> {
    if !offered.is_finite() || offered <= 1.0 {
        return Err(AppError::Validation(format!(
            "offered odds must be greater than 1.0, got {offered}"
        )));
    }
    if !(fair_prob > 0.0 && fair_prob < 1.0) {
        return Err(AppError::Validation(format!(
            "fair probability must be in (0, 1), got {fair_prob}"
        )));
    }
    Ok((fair_prob * (offered - 1.0) - (1.0 - fair_prob)) * 100.0)
}
