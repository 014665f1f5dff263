// server/src/web/handlers/order_handlers.rs

//! Quoting, booking and the order status lifecycle.

use actix_web::{web, HttpResponse};
use market::models::OrderStatus;
use market::services::order::{self, CreateOrderInput, QuoteRequest, ReviewInput, StatusUpdateInput};
use market::{PageRequest, Role};
use serde::Deserialize;
use tracing::instrument;

use super::{CursorQuery, PageQuery, ANY_ROLE};
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

#[derive(Debug, Deserialize)]
pub struct ProviderOrdersQuery {
  pub status: Option<OrderStatus>,
  pub page: Option<usize>,
  pub limit: Option<usize>,
}

#[instrument(name = "handler::quote", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn quote_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<QuoteRequest>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  let quote = order::quote(&app_state.store, &caller, payload.into_inner()).await?;
  Ok(response::ok("Quote calculated", quote))
}

#[instrument(name = "handler::create_order", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<CreateOrderInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  let created = order::create_order(&app_state.store, &caller, payload.into_inner()).await?;
  Ok(response::created("Order created", created))
}

pub async fn list_finder_orders_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<CursorQuery>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  let orders = order::list_for_finder(&app_state.store, &caller, query.cursor.as_deref(), query.limit).await?;
  Ok(response::page("Orders fetched", orders))
}

pub async fn list_provider_orders_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<ProviderOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Provider])?;
  let page = PageRequest::new(query.page, query.limit);
  let orders = order::list_for_provider(&app_state.store, &caller, query.status, page).await?;
  Ok(response::page("Orders fetched", orders))
}

pub async fn list_available_orders_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Provider])?;
  let orders = order::list_available(&app_state.store, query.request()).await?;
  Ok(response::page("Available orders fetched", orders))
}

pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(ANY_ROLE)?;
  let found = order::get_order(&app_state.store, &caller, &path).await?;
  Ok(response::ok("Order fetched", found))
}

#[instrument(name = "handler::update_order_status", skip(app_state, user, payload), fields(uid = %user.uid, to = %payload.status))]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
  payload: Valid<StatusUpdateInput>,
) -> Result<HttpResponse, AppError> {
  // Terminal orders answer 400 for every actor, so the service decides roles here.
  let caller = user.require(ANY_ROLE)?;
  let updated = order::update_status(&app_state.store, &caller, &path, payload.status).await?;
  Ok(response::ok("Order status updated", updated))
}

#[instrument(name = "handler::review_order", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn review_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
  payload: Valid<ReviewInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  let reviewed = order::submit_review(&app_state.store, &caller, &path, payload.into_inner()).await?;
  Ok(response::ok("Review submitted", reviewed))
}
