// core/src/auth.rs

//! Caller identity as seen by the services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MarketError, MarketResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Finder,
  Provider,
  Admin,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Finder => "finder",
      Role::Provider => "provider",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = MarketError;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "finder" => Ok(Role::Finder),
      "provider" => Ok(Role::Provider),
      "admin" => Ok(Role::Admin),
      other => Err(MarketError::validation(format!("unknown role '{}'", other))),
    }
  }
}

/// Authenticated user on whose behalf a service call runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
  pub uid: String,
  /// `None` until the user registered and no claim carried a role.
  pub role: Option<Role>,
  pub email: Option<String>,
  pub name: Option<String>,
  pub picture: Option<String>,
}

impl Caller {
  pub fn new(uid: impl Into<String>, role: Role) -> Self {
    Caller {
      uid: uid.into(),
      role: Some(role),
      email: None,
      name: None,
      picture: None,
    }
  }

  pub fn is(&self, role: Role) -> bool {
    self.role == Some(role)
  }

  /// Role gate: the caller's role must be one of `allowed`.
  pub fn require_any(&self, allowed: &[Role]) -> MarketResult<Role> {
    match self.role {
      Some(role) if allowed.contains(&role) => Ok(role),
      Some(role) => Err(MarketError::forbidden(format!(
        "role '{}' is not allowed to perform this action",
        role
      ))),
      None => Err(MarketError::forbidden("a registered role is required for this action")),
    }
  }

  pub fn display_name(&self) -> String {
    self
      .name
      .clone()
      .or_else(|| self.email.clone())
      .unwrap_or_else(|| "User".to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn role_gate_rejects_other_roles_and_missing_role() {
    let finder = Caller::new("f1", Role::Finder);
    assert_eq!(finder.require_any(&[Role::Finder, Role::Admin]).unwrap(), Role::Finder);
    assert_eq!(finder.require_any(&[Role::Provider]).unwrap_err().status_code(), 403);

    let unregistered = Caller {
      role: None,
      ..Caller::new("x", Role::Finder)
    };
    assert_eq!(unregistered.require_any(&[Role::Finder]).unwrap_err().status_code(), 403);
  }

  #[test]
  fn roles_parse_case_insensitively() {
    assert_eq!("Provider".parse::<Role>().unwrap(), Role::Provider);
    assert!("guest".parse::<Role>().is_err());
  }
}
