// server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::services::auth_service::{self, SigninRequest};
use crate::state::AppState;
use crate::web::extract::Valid;
use crate::web::response;

#[instrument(name = "handler::signin", skip(app_state, payload), fields(req_email = %payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  payload: Valid<SigninRequest>,
) -> Result<HttpResponse, AppError> {
  let session = auth_service::signin(&app_state.store, &app_state.identity, payload.into_inner()).await?;
  Ok(response::ok("Signed in", session))
}
