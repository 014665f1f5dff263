// core/src/validation.rs

//! Request shape checks run before any service logic.

use crate::error::{MarketError, MarketResult};

/// Implemented by every request payload the API accepts.
pub trait Validate {
  fn validate(&self) -> MarketResult<()>;
}

pub fn required(field: &str, value: &str) -> MarketResult<()> {
  if value.trim().is_empty() {
    return Err(MarketError::validation(format!("{} is required", field)));
  }
  Ok(())
}

pub fn max_len(field: &str, value: &str, max: usize) -> MarketResult<()> {
  if value.chars().count() > max {
    return Err(MarketError::validation(format!(
      "{} must be at most {} characters",
      field, max
    )));
  }
  Ok(())
}

pub fn positive(field: &str, value: f64) -> MarketResult<()> {
  if !value.is_finite() || value <= 0.0 {
    return Err(MarketError::validation(format!("{} must be a positive number", field)));
  }
  Ok(())
}

pub fn non_negative(field: &str, value: f64) -> MarketResult<()> {
  if !value.is_finite() || value < 0.0 {
    return Err(MarketError::validation(format!("{} must not be negative", field)));
  }
  Ok(())
}

pub fn in_range(field: &str, value: f64, min: f64, max: f64) -> MarketResult<()> {
  if !value.is_finite() || value < min || value > max {
    return Err(MarketError::validation(format!(
      "{} must be between {} and {}",
      field, min, max
    )));
  }
  Ok(())
}

/// `YYYY-MM-DD`.
pub fn date(field: &str, value: &str) -> MarketResult<()> {
  chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
    .map(|_| ())
    .map_err(|_| MarketError::validation(format!("{} must be a date formatted YYYY-MM-DD", field)))
}

pub fn email(field: &str, value: &str) -> MarketResult<()> {
  let value = value.trim();
  match value.split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => Ok(()),
    _ => Err(MarketError::validation(format!("{} must be a valid email address", field))),
  }
}
