// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use market::{MarketError, StoreError};
use thiserror::Error;

use crate::web::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error(transparent)]
  Domain(#[from] MarketError),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Handlers and adapters use `?` on anyhow results as well.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(format!("{:#}", other)),
    }
  }
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    AppError::Domain(MarketError::Store(err))
  }
}

impl AppError {
  /// Text placed in the envelope's `message`. Server-side failures never
  /// leak their cause to the client.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::NotFound(m) => m.clone(),
      AppError::Domain(err) if err.is_client_error() => err.to_string(),
      _ => "Internal server error".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Domain(err) => StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::debug!(application_error = %self, status = status.as_u16(), "Rejecting request");
    }
    HttpResponse::build(status).json(ApiResponse::<()>::failure(self.public_message()))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn domain_errors_keep_their_status() {
    assert_eq!(
      AppError::from(MarketError::forbidden("not yours")).status_code(),
      StatusCode::FORBIDDEN
    );
    assert_eq!(
      AppError::from(StoreError::InvalidPath("x".into())).status_code(),
      StatusCode::BAD_REQUEST
    );
  }

  #[test]
  fn server_errors_hide_their_cause() {
    let err = AppError::from(anyhow::anyhow!("disk on fire"));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.public_message(), "Internal server error");

    let payment = AppError::from(MarketError::Payment(anyhow::anyhow!("timeout")));
    assert_eq!(payment.public_message(), "Internal server error");

    let client = AppError::from(MarketError::validation("hours is required"));
    assert_eq!(client.public_message(), "hours is required");
  }
}
