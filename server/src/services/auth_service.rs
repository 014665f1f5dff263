// server/src/services/auth_service.rs

//! Password hashing and local email/password sign-in.

use crate::errors::AppError;
use crate::identity::{IdentityService, IssuedToken, TokenSubject};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use market::models::collections::AUTH_ACCOUNTS;
use market::models::AuthAccount;
use market::store::{Filter, Query};
use market::validation::{self, Validate};
use market::{MarketResult, Role, Store};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

/// Hashes a plain-text password using Argon2 with a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing failed: {}", e))
    })
}

/// Checks a password against a stored Argon2 hash. A mismatch is `Ok(false)`.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }
  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "Stored password hash is malformed.");
    AppError::Internal(format!("Invalid stored password hash: {}", e))
  })?;
  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(e) => Err(AppError::Internal(format!("Password verification failed: {}", e))),
  }
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
  pub email: String,
  pub password: String,
}

impl Validate for SigninRequest {
  fn validate(&self) -> MarketResult<()> {
    validation::required("email", &self.email)?;
    validation::email("email", &self.email)?;
    validation::required("password", &self.password)
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
  pub uid: String,
  pub role: Role,
  pub name: String,
  #[serde(flatten)]
  pub token: IssuedToken,
}

/// Exchanges seeded credentials for a bearer token.
#[instrument(name = "auth_service::signin", skip(store, identity, request), fields(email = %request.email))]
pub async fn signin(store: &Store, identity: &IdentityService, request: SigninRequest) -> Result<SigninResponse, AppError> {
  let email = request.email.trim().to_ascii_lowercase();
  let accounts: Vec<AuthAccount> = store
    .query_as(Query::collection(AUTH_ACCOUNTS).filter(Filter::equals("email", email.as_str())).limit(1))
    .await?;
  let invalid = || AppError::Auth("Invalid email or password".to_string());
  let account = accounts.into_iter().next().ok_or_else(|| {
    debug!("No account for email.");
    invalid()
  })?;
  if !verify_password(&account.password_hash, &request.password)? {
    debug!("Password mismatch.");
    return Err(invalid());
  }

  let token = identity.issue(TokenSubject {
    uid: account.uid.clone(),
    role: Some(account.role),
    email: Some(account.email.clone()),
    name: Some(account.name.clone()),
    picture: None,
  })?;
  info!(uid = %account.uid, role = %account.role, "User signed in.");
  Ok(SigninResponse {
    uid: account.uid,
    role: account.role,
    name: account.name,
    token,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashes_verify_only_the_original_password() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password(&hash, "correct horse").unwrap());
    assert!(!verify_password(&hash, "battery staple").unwrap());
    assert!(!verify_password(&hash, "").unwrap());
  }

  #[test]
  fn empty_passwords_are_not_hashed() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn malformed_hashes_are_internal_errors() {
    assert!(matches!(verify_password("plain", "x"), Err(AppError::Internal(_))));
  }
}
