// server/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use market::services::payment::{self, PaymentRequest};
use market::Role;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

#[instrument(name = "handler::khqr_generate", skip(app_state, user, payload), fields(uid = %user.uid, order_id = %payload.order_id))]
pub async fn generate_khqr_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<PaymentRequest>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  let status = payment::generate_khqr(&app_state.store, app_state.gateway.as_ref(), &caller, &payload.order_id).await?;
  Ok(response::ok("KHQR generated", status))
}

#[instrument(name = "handler::khqr_check", skip(app_state, user, payload), fields(uid = %user.uid, order_id = %payload.order_id))]
pub async fn check_khqr_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<PaymentRequest>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder, Role::Provider])?;
  let status = payment::check_khqr(&app_state.store, app_state.gateway.as_ref(), &caller, &payload.order_id).await?;
  Ok(response::ok("KHQR status checked", status))
}
