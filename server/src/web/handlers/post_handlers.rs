// server/src/web/handlers/post_handlers.rs

//! Finder requests and provider offers.

use actix_web::{web, HttpResponse};
use market::models::PostStatus;
use market::services::post::{self, FinderPostInput, PostFilter, PostStatusInput, ProviderPostInput};
use market::{PageRequest, Role};
use serde::Deserialize;
use tracing::instrument;

use super::ANY_ROLE;
use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extract::{AuthenticatedUser, Valid};
use crate::web::response;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListQuery {
  pub category_name: Option<String>,
  pub service_name: Option<String>,
  pub status: Option<PostStatus>,
  pub owner_uid: Option<String>,
  pub page: Option<usize>,
  pub limit: Option<usize>,
  pub cursor: Option<String>,
}

impl PostListQuery {
  fn filter(&self) -> PostFilter {
    PostFilter {
      category_name: self.category_name.clone(),
      service_name: self.service_name.clone(),
      status: self.status,
      owner_uid: self.owner_uid.clone(),
    }
  }
}

pub async fn list_finder_posts_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<PostListQuery>,
) -> Result<HttpResponse, AppError> {
  user.require(ANY_ROLE)?;
  let page = PageRequest::new(query.page, query.limit);
  let posts = post::list_finder_posts(&app_state.store, &query.filter(), page).await?;
  Ok(response::page("Finder posts fetched", posts))
}

#[instrument(name = "handler::create_finder_post", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn create_finder_post_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<FinderPostInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  let created = post::create_finder_post(&app_state.store, &caller, payload.into_inner()).await?;
  Ok(response::created("Finder post created", created))
}

#[instrument(name = "handler::delete_finder_post", skip(app_state, user), fields(uid = %user.uid))]
pub async fn delete_finder_post_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Finder])?;
  post::delete_finder_post(&app_state.store, &caller, &path).await?;
  Ok(response::no_content())
}

pub async fn list_provider_posts_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  query: web::Query<PostListQuery>,
) -> Result<HttpResponse, AppError> {
  user.require(ANY_ROLE)?;
  let posts =
    post::list_provider_posts(&app_state.store, &query.filter(), query.cursor.as_deref(), query.limit).await?;
  Ok(response::page("Provider posts fetched", posts))
}

#[instrument(name = "handler::create_provider_post", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn create_provider_post_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  payload: Valid<ProviderPostInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Provider])?;
  let created = post::create_provider_post(&app_state.store, &caller, payload.into_inner()).await?;
  Ok(response::created("Provider post created", created))
}

#[instrument(name = "handler::set_provider_post_status", skip(app_state, user, payload), fields(uid = %user.uid))]
pub async fn set_provider_post_status_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
  payload: Valid<PostStatusInput>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Provider])?;
  let updated = post::set_provider_post_status(&app_state.store, &caller, &path, payload.status).await?;
  Ok(response::ok("Provider post updated", updated))
}

#[instrument(name = "handler::delete_provider_post", skip(app_state, user), fields(uid = %user.uid))]
pub async fn delete_provider_post_handler(
  app_state: web::Data<AppState>,
  user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let caller = user.require(&[Role::Provider])?;
  post::delete_provider_post(&app_state.store, &caller, &path).await?;
  Ok(response::no_content())
}
