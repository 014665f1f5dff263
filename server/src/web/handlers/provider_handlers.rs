// server/src/web/handlers/provider_handlers.rs

use actix_web::{web, HttpResponse};
use market::services::provider::{self, ProviderProfileInput};
use market::{PageRequest, Role};
use serde::Deserialize;
use tracing::instrument;

use super::PageQuery;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

#[derive(Debug, Deserialize)]
pub struct ProviderListQuery {
  pub category: Option<String>,
  pub page: Option<usize>,
  pub limit: Option<usize>,
}

pub async fn list_providers_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ProviderListQuery>,
) -> Result<HttpResponse, AppError> {
  let page = PageRequest::new(query.page, query.limit);
  let providers = provider::list_providers(&app_state.store, query.category.as_deref(), page).await?;
  Ok(response::page("Providers fetched", providers))
}

pub async fn get_provider_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let profile = provider::get_profile(&app_state.store, &path).await?;
  Ok(response::ok("Provider fetched", profile))
}

pub async fn list_reviews_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let reviews = provider::list_reviews(&app_state.store, &path, query.request()).await?;
  Ok(response::page("Reviews fetched", reviews))
}

#[instrument(name = "handler::update_provider", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn update_me_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<ProviderProfileInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Provider])?;
  let profile = provider::update_profile(&app_state.store, &caller, payload.into_inner()).await?;
  Ok(response::ok("Provider profile updated", profile))
}
