// core/src/services/finder.rs

use serde::Deserialize;
use tracing::instrument;

use super::{clean, doc_path, load, now};
use crate::auth::Caller;
use crate::error::MarketResult;
use crate::models::collections::FINDERS;
use crate::models::FinderProfile;
use crate::store::Store;
use crate::validation::{self, Validate};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderProfileInput {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub avatar_url: Option<String>,
  #[serde(default)]
  pub bio: Option<String>,
}

impl Validate for FinderProfileInput {
  fn validate(&self) -> MarketResult<()> {
    if let Some(name) = &self.name {
      validation::required("name", name)?;
      validation::max_len("name", name, 80)?;
    }
    if let Some(bio) = &self.bio {
      validation::max_len("bio", bio, 1000)?;
    }
    Ok(())
  }
}

pub async fn get_profile(store: &Store, uid: &str) -> MarketResult<FinderProfile> {
  load(store, &doc_path(FINDERS, uid)?, "finder").await
}

/// Updates the caller's finder profile, creating it on first use.
#[instrument(name = "finder::upsert_profile", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn upsert_profile(store: &Store, caller: &Caller, input: FinderProfileInput) -> MarketResult<FinderProfile> {
  let path = doc_path(FINDERS, &caller.uid)?;
  let at = now();
  let mut profile = store.get_as::<FinderProfile>(&path).await?.unwrap_or_else(|| FinderProfile {
    id: caller.uid.clone(),
    uid: caller.uid.clone(),
    name: caller.display_name(),
    phone: None,
    avatar_url: caller.picture.clone(),
    bio: None,
    created_at: at,
    updated_at: at,
  });
  if let Some(name) = input.name {
    profile.name = name.trim().to_string();
  }
  if input.phone.is_some() {
    profile.phone = clean(input.phone);
  }
  if input.avatar_url.is_some() {
    profile.avatar_url = clean(input.avatar_url);
  }
  if input.bio.is_some() {
    profile.bio = clean(input.bio);
  }
  profile.updated_at = at;
  store.set(path, &profile).await?;
  Ok(profile)
}
