// server/src/web/extract.rs

//! Request extractors: the authenticated caller and validated payloads.

use actix_web::dev::Payload;
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use market::services::user;
use market::validation::Validate;
use market::{Caller, Role};
use serde::de::DeserializeOwned;
use std::ops::Deref;

use crate::errors::AppError;
use crate::state::AppState;

/// The verified caller with their resolved role.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Caller);

impl AuthenticatedUser {
  /// Role gate for the route: the caller's role must be one of `allowed`.
  pub fn require(self, allowed: &[Role]) -> Result<Caller, AppError> {
    self.0.require_any(allowed)?;
    Ok(self.0)
  }

  pub fn into_inner(self) -> Caller {
    self.0
  }
}

impl Deref for AuthenticatedUser {
  type Target = Caller;

  fn deref(&self) -> &Caller {
    &self.0
  }
}

fn bearer_token(req: &HttpRequest) -> Result<String, AppError> {
  let raw = req
    .headers()
    .get(header::AUTHORIZATION)
    .ok_or_else(|| AppError::Auth("Missing Authorization header".to_string()))?
    .to_str()
    .map_err(|_| AppError::Auth("Malformed Authorization header".to_string()))?;
  match raw.split_once(' ') {
    Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
      Ok(token.trim().to_string())
    }
    _ => Err(AppError::Auth("Authorization header must be 'Bearer <token>'".to_string())),
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);
    Box::pin(async move {
      let state = state.ok_or_else(|| AppError::Internal("application state is not configured".to_string()))?;
      let claims = state.identity.verify(&token?)?;
      let mut caller = claims.caller();
      caller.role = user::resolve_role(&state.store, &claims.sub, claims.role.as_deref(), &claims.roles).await?;
      Ok(AuthenticatedUser(caller))
    })
  }
}

/// JSON body that passed [`Validate`].
#[derive(Debug)]
pub struct Valid<T>(pub T);

impl<T> Valid<T> {
  pub fn into_inner(self) -> T {
    self.0
  }
}

impl<T> Deref for Valid<T> {
  type Target = T;

  fn deref(&self) -> &T {
    &self.0
  }
}

impl<T> FromRequest for Valid<T>
where
  T: DeserializeOwned + Validate + 'static,
{
  type Error = actix_web::Error;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let json = web::Json::<T>::from_request(req, payload);
    Box::pin(async move {
      let body = json.await?.into_inner();
      body.validate().map_err(AppError::from)?;
      Ok(Valid(body))
    })
  }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  let message = match &err {
    JsonPayloadError::ContentType => "Content-Type must be application/json".to_string(),
    JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
    other => format!("Invalid request body: {}", other),
  };
  AppError::Validation(message).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid query parameters: {}", err)).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid path parameters: {}", err)).into()
}
