// server/src/web/handlers/user_handlers.rs

//! `/api/users`: registration, own profile, settings, addresses and help tickets.

use actix_web::{web, HttpResponse};
use market::services::user::{
  self, AddressInput, HelpTicketInput, RegisterInput, SettingsInput, TicketMessageInput, UpdateUserInput,
};
use tracing::instrument;

use super::PageQuery;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

/// Open to any verified token: the caller has no stored role yet.
#[instrument(name = "handler::register", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<RegisterInput>,
) -> Result<HttpResponse, AppError> {
  let profile = user::register(&app_state.store, &user, payload.into_inner()).await?;
  Ok(response::created("User registered", profile))
}

pub async fn get_me_handler(app_state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let profile = user::get_me(&app_state.store, &user).await?;
  Ok(response::ok("Profile fetched", profile))
}

#[instrument(name = "handler::update_me", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn update_me_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<UpdateUserInput>,
) -> Result<HttpResponse, AppError> {
  let profile = user::update_me(&app_state.store, &user, payload.into_inner()).await?;
  Ok(response::ok("Profile updated", profile))
}

pub async fn get_settings_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let settings = user::get_settings(&app_state.store, &user).await?;
  Ok(response::ok("Settings fetched", settings))
}

pub async fn update_settings_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<SettingsInput>,
) -> Result<HttpResponse, AppError> {
  let settings = user::update_settings(&app_state.store, &user, payload.into_inner()).await?;
  Ok(response::ok("Settings updated", settings))
}

pub async fn list_addresses_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let addresses = user::list_addresses(&app_state.store, &user).await?;
  Ok(response::ok("Addresses fetched", addresses))
}

pub async fn add_address_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<AddressInput>,
) -> Result<HttpResponse, AppError> {
  let address = user::add_address(&app_state.store, &user, payload.into_inner()).await?;
  Ok(response::created("Address added", address))
}

pub async fn update_address_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
  payload: Valid<AddressInput>,
) -> Result<HttpResponse, AppError> {
  let address = user::update_address(&app_state.store, &user, &path, payload.into_inner()).await?;
  Ok(response::ok("Address updated", address))
}

pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  user::delete_address(&app_state.store, &user, &path).await?;
  Ok(response::no_content())
}

pub async fn list_help_tickets_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let tickets = user::list_help_tickets(&app_state.store, &user, query.request()).await?;
  Ok(response::page("Help tickets fetched", tickets))
}

#[instrument(name = "handler::create_help_ticket", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn create_help_ticket_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<HelpTicketInput>,
) -> Result<HttpResponse, AppError> {
  let ticket = user::create_help_ticket(&app_state.store, &user, payload.into_inner()).await?;
  Ok(response::created("Help ticket created", ticket))
}

pub async fn list_ticket_messages_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let messages = user::list_ticket_messages(&app_state.store, &user, &path).await?;
  Ok(response::ok("Ticket messages fetched", messages))
}

pub async fn add_ticket_message_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
  payload: Valid<TicketMessageInput>,
) -> Result<HttpResponse, AppError> {
  let message = user::add_ticket_message(&app_state.store, &user, &path, payload.into_inner()).await?;
  Ok(response::created("Message added", message))
}
