// server/src/web/handlers/catalog_handlers.rs

use actix_web::{web, HttpResponse};
use market::services::catalog::{self, CategoryInput, ServiceInput};
use market::Role;
use serde::Deserialize;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuery {
  pub category_id: Option<String>,
}

pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories = catalog::list_categories(&app_state.store).await?;
  Ok(response::ok("Categories fetched", categories))
}

pub async fn get_category_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let category = catalog::get_category(&app_state.store, &path).await?;
  Ok(response::ok("Category fetched", category))
}

#[instrument(name = "handler::create_category", skip_all)]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<CategoryInput>,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let category = catalog::create_category(&app_state.store, payload.into_inner()).await?;
  Ok(response::created("Category created", category))
}

#[instrument(name = "handler::update_category", skip(app_state, user, payload))]
pub async fn update_category_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
  payload: Valid<CategoryInput>,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let category = catalog::update_category(&app_state.store, &path, payload.into_inner()).await?;
  Ok(response::ok("Category updated", category))
}

pub async fn list_services_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ServiceQuery>,
) -> Result<HttpResponse, AppError> {
  let services = catalog::list_services(&app_state.store, query.category_id.as_deref()).await?;
  Ok(response::ok("Services fetched", services))
}

pub async fn get_service_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let service = catalog::get_service(&app_state.store, &path).await?;
  Ok(response::ok("Service fetched", service))
}

#[instrument(name = "handler::create_service", skip_all)]
pub async fn create_service_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<ServiceInput>,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let service = catalog::create_service(&app_state.store, payload.into_inner()).await?;
  Ok(response::created("Service created", service))
}
