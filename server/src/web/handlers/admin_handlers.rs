// server/src/web/handlers/admin_handlers.rs

//! Back office. Every route here is admin only.

use actix_web::{web, HttpResponse};
use market::models::OrderStatus;
use market::services::admin::{self, BroadcastInput, PromoCodeInput, UserFilter};
use market::{PageRequest, Role};
use serde::Deserialize;
use tracing::instrument;

use super::PageQuery;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

#[derive(Debug, Deserialize)]
pub struct AdminUsersQuery {
  pub role: Option<Role>,
  pub page: Option<usize>,
  pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
  pub status: Option<OrderStatus>,
  pub page: Option<usize>,
  pub limit: Option<usize>,
}

pub async fn overview_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let overview = admin::overview(&app_state.store).await?;
  Ok(response::ok("Overview fetched", overview))
}

pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<AdminUsersQuery>,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let filter = UserFilter { role: query.role };
  let users = admin::list_users(&app_state.store, &filter, PageRequest::new(query.page, query.limit)).await?;
  Ok(response::page("Users fetched", users))
}

pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let orders = admin::list_orders(&app_state.store, query.status, PageRequest::new(query.page, query.limit)).await?;
  Ok(response::page("Orders fetched", orders))
}

pub async fn list_broadcasts_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let broadcasts = admin::list_broadcasts(&app_state.store, query.request()).await?;
  Ok(response::page("Broadcasts fetched", broadcasts))
}

#[instrument(name = "handler::create_broadcast", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn create_broadcast_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<BroadcastInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Admin])?;
  let broadcast = admin::create_broadcast(&app_state.store, &caller, payload.into_inner()).await?;
  Ok(response::created("Broadcast published", broadcast))
}

pub async fn list_promo_codes_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let codes = admin::list_promo_codes(&app_state.store).await?;
  Ok(response::ok("Promo codes fetched", codes))
}

#[instrument(name = "handler::create_promo_code", skip(app_state, user, payload), fields(uid = %user.uid, code = %payload.code))]
pub async fn create_promo_code_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<PromoCodeInput>,
) -> Result<HttpResponse, AppError> {
  user.require(&[Role::Admin])?;
  let promo = admin::create_promo_code(&app_state.store, payload.into_inner()).await?;
  Ok(response::created("Promo code created", promo))
}
