// server/src/web/response.rs

//! The `{success, message, data, pagination?}` envelope every endpoint answers with.

use actix_web::HttpResponse;
use market::{Page, Pagination};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
  pub success: bool,
  pub message: String,
  pub data: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
  pub fn success(message: impl Into<String>, data: T) -> Self {
    ApiResponse {
      success: true,
      message: message.into(),
      data: Some(data),
      pagination: None,
    }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    ApiResponse {
      success: false,
      message: message.into(),
      data: None,
      pagination: None,
    }
  }
}

pub fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
  HttpResponse::Ok().json(ApiResponse::success(message, data))
}

pub fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
  HttpResponse::Created().json(ApiResponse::success(message, data))
}

/// 204 responses carry no body.
pub fn no_content() -> HttpResponse {
  HttpResponse::NoContent().finish()
}

pub fn page<T: Serialize>(message: &str, page: Page<T>) -> HttpResponse {
  HttpResponse::Ok().json(ApiResponse {
    success: true,
    message: message.to_string(),
    data: Some(page.data),
    pagination: page.pagination,
  })
}
