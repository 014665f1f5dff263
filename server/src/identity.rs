// server/src/identity.rs

//! Bearer token issuing and verification (HS256 JWTs).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use market::{Caller, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
  /// The user id.
  pub sub: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub roles: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub picture: Option<String>,
  pub iss: String,
  pub iat: i64,
  pub exp: i64,
}

impl Claims {
  /// Caller before role resolution; the role is filled in by the extractor.
  pub fn caller(&self) -> Caller {
    Caller {
      uid: self.sub.clone(),
      role: None,
      email: self.email.clone(),
      name: self.name.clone(),
      picture: self.picture.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
  pub token: String,
  pub token_type: &'static str,
  pub expires_at: DateTime<Utc>,
}

/// What a token is issued for.
#[derive(Debug, Clone, Default)]
pub struct TokenSubject {
  pub uid: String,
  pub role: Option<Role>,
  pub email: Option<String>,
  pub name: Option<String>,
  pub picture: Option<String>,
}

pub struct IdentityService {
  encoding: EncodingKey,
  decoding: DecodingKey,
  validation: Validation,
  issuer: String,
  ttl: Duration,
}

impl IdentityService {
  pub fn new(secret: &str, issuer: &str, ttl_hours: i64) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);
    IdentityService {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      validation,
      issuer: issuer.to_string(),
      ttl: Duration::hours(ttl_hours),
    }
  }

  #[instrument(name = "identity::issue", skip(self, subject), fields(uid = %subject.uid))]
  pub fn issue(&self, subject: TokenSubject) -> Result<IssuedToken> {
    let now = Utc::now();
    let expires_at = now + self.ttl;
    let claims = Claims {
      sub: subject.uid,
      role: subject.role.map(|r| r.as_str().to_string()),
      roles: Vec::new(),
      email: subject.email,
      name: subject.name,
      picture: subject.picture,
      iss: self.issuer.clone(),
      iat: now.timestamp(),
      exp: expires_at.timestamp(),
    };
    let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))?;
    debug!("Issued access token.");
    Ok(IssuedToken {
      token,
      token_type: "Bearer",
      expires_at,
    })
  }

  pub fn verify(&self, token: &str) -> Result<Claims> {
    decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| {
        debug!(error = %e, "Rejected bearer token.");
        AppError::Auth("Invalid or expired token".to_string())
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn issued_tokens_verify_and_carry_claims() {
    let identity = IdentityService::new("secret", "market", 1);
    let issued = identity
      .issue(TokenSubject {
        uid: "u1".into(),
        role: Some(Role::Provider),
        email: Some("p@example.com".into()),
        ..Default::default()
      })
      .unwrap();
    let claims = identity.verify(&issued.token).unwrap();
    assert_eq!(claims.sub, "u1");
    assert_eq!(claims.role.as_deref(), Some("provider"));
    assert_eq!(claims.caller().email.as_deref(), Some("p@example.com"));
  }

  #[test]
  fn foreign_secret_or_issuer_is_rejected() {
    let issued = IdentityService::new("secret", "market", 1)
      .issue(TokenSubject {
        uid: "u1".into(),
        ..Default::default()
      })
      .unwrap();
    assert!(matches!(
      IdentityService::new("other", "market", 1).verify(&issued.token),
      Err(AppError::Auth(_))
    ));
    assert!(matches!(
      IdentityService::new("secret", "elsewhere", 1).verify(&issued.token),
      Err(AppError::Auth(_))
    ));
    assert!(IdentityService::new("secret", "market", 1).verify("not-a-token").is_err());
  }

  #[test]
  fn expired_tokens_are_rejected() {
    let identity = IdentityService::new("secret", "market", 1);
    let now = Utc::now().timestamp();
    let claims = Claims {
      sub: "u1".into(),
      role: None,
      roles: vec!["finder".into()],
      email: None,
      name: None,
      picture: None,
      iss: "market".into(),
      iat: now - 7200,
      exp: now - 3600,
    };
    let token = encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(b"secret")).unwrap();
    assert!(identity.verify(&token).is_err());
  }
}
