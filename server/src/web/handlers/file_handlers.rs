// server/src/web/handlers/file_handlers.rs

//! Serves uploads from local storage behind signed URLs.

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::content_type_for;

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
  pub expires: i64,
  pub sig: String,
}

pub async fn serve_file_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  query: web::Query<SignedQuery>,
) -> Result<HttpResponse, AppError> {
  let object_path = path.into_inner();
  if !app_state.storage.signer().verify(&object_path, query.expires, &query.sig) {
    debug!(%object_path, "Rejected file request with a bad or expired signature.");
    return Err(AppError::Forbidden("Invalid or expired file signature".to_string()));
  }
  let bytes = app_state
    .storage
    .read(&object_path)
    .await?
    .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
  Ok(
    HttpResponse::Ok()
      .insert_header((header::CONTENT_TYPE, content_type_for(&object_path)))
      .insert_header((header::CACHE_CONTROL, "private, max-age=86400"))
      .body(bytes),
  )
}
