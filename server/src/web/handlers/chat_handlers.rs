// server/src/web/handlers/chat_handlers.rs

use actix_web::{web, HttpResponse};
use market::services::chat::{self, OpenDirectInput, SendMessageInput};
use tracing::instrument;

use super::ANY_ROLE;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

pub async fn list_threads_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(ANY_ROLE)?;
  let threads = chat::list_threads(&app_state.store, &caller).await?;
  Ok(response::ok("Chats fetched", threads))
}

#[instrument(name = "handler::open_direct_chat", skip(app_state, user, payload), fields(uid = %user.uid, recipient = %payload.recipient_uid))]
pub async fn open_direct_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<OpenDirectInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(ANY_ROLE)?;
  let thread = chat::open_direct(&app_state.store, &caller, payload.into_inner()).await?;
  Ok(response::ok("Chat opened", thread))
}

pub async fn list_messages_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(ANY_ROLE)?;
  let messages = chat::list_messages(&app_state.store, &caller, &path).await?;
  Ok(response::ok("Messages fetched", messages))
}

#[instrument(name = "handler::send_chat_message", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn send_message_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
  payload: Valid<SendMessageInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(ANY_ROLE)?;
  let message = chat::send_message(
    &app_state.store,
    app_state.storage.as_ref(),
    &app_state.config.chat_media,
    &caller,
    &path,
    payload.into_inner(),
  )
  .await?;
  Ok(response::created("Message sent", message))
}

pub async fn mark_read_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(ANY_ROLE)?;
  chat::mark_read(&app_state.store, &caller, &path).await?;
  Ok(response::no_content())
}
