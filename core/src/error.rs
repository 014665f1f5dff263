// core/src/error.rs
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the marketplace services.
///
/// Each variant maps onto one HTTP status class; see [`MarketError::status_code`].
#[derive(Debug, Error)]
pub enum MarketError {
  /// Request shape or business-rule failure.
  #[error("{0}")]
  Validation(String),

  /// Wrong role, not a participant, not the owner.
  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("Document store error: {0}")]
  Store(#[from] StoreError),

  #[error("Object storage error: {0}")]
  Storage(#[source] anyhow::Error),

  #[error("Payment provider error: {0}")]
  Payment(#[source] anyhow::Error),

  #[error(transparent)]
  Internal(#[from] anyhow::Error),
}

impl MarketError {
  pub fn validation(message: impl Into<String>) -> Self {
    MarketError::Validation(message.into())
  }

  pub fn forbidden(message: impl Into<String>) -> Self {
    MarketError::Forbidden(message.into())
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    MarketError::NotFound(message.into())
  }

  pub fn status_code(&self) -> u16 {
    match self {
      MarketError::Validation(_) => 400,
      // A malformed id in a path is the caller's mistake.
      MarketError::Store(StoreError::InvalidPath(_)) => 400,
      MarketError::Forbidden(_) => 403,
      MarketError::NotFound(_) => 404,
      MarketError::Store(_) | MarketError::Storage(_) | MarketError::Payment(_) | MarketError::Internal(_) => 500,
    }
  }

  /// Whether the message is safe to hand back to API clients verbatim.
  pub fn is_client_error(&self) -> bool {
    self.status_code() < 500
  }
}

pub type MarketResult<T, E = MarketError> = std::result::Result<T, E>;
