// server/src/web/handlers/finder_handlers.rs

use actix_web::{web, HttpResponse};
use market::services::finder::{self, FinderProfileInput};
use market::Role;
use tracing::instrument;

use super::ANY_ROLE;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

pub async fn get_me_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  let profile = finder::get_profile(&app_state.store, &caller.uid).await?;
  Ok(response::ok("Finder profile fetched", profile))
}

#[instrument(name = "handler::update_finder", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn update_me_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<FinderProfileInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  let profile = finder::upsert_profile(&app_state.store, &caller, payload.into_inner()).await?;
  Ok(response::ok("Finder profile updated", profile))
}

pub async fn get_finder_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  user.require(ANY_ROLE)?;
  let profile = finder::get_profile(&app_state.store, &path).await?;
  Ok(response::ok("Finder profile fetched", profile))
}
