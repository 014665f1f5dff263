// core/src/services/post.rs

//! Finder requests and provider offers.

use serde::Deserialize;
use tracing::{info, instrument};

use super::{clean, doc_path, load, new_id, now};
use crate::auth::Caller;
use crate::error::{MarketError, MarketResult};
use crate::models::collections::{FINDER_POSTS, PROVIDER_POSTS};
use crate::models::{FinderPost, PostStatus, ProviderPost};
use crate::pagination::{paginate, paginate_after, Page, PageRequest};
use crate::services::{finder, provider};
use crate::store::{Filter, Query, Store};
use crate::validation::{self, Validate};

/// Listing filters shared by both post kinds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFilter {
  #[serde(default)]
  pub category_name: Option<String>,
  #[serde(default)]
  pub service_name: Option<String>,
  #[serde(default)]
  pub status: Option<PostStatus>,
  /// Restricts to one author.
  #[serde(default)]
  pub owner_uid: Option<String>,
}

fn matches_text(expected: &Option<String>, actual: &str) -> bool {
  match expected.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
    Some(expected) => expected.eq_ignore_ascii_case(actual),
    None => true,
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderPostInput {
  pub category_name: String,
  pub service_name: String,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub budget: Option<f64>,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub preferred_date: Option<String>,
}

impl Validate for FinderPostInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("categoryName", &self.category_name)?;
    validation::required("serviceName", &self.service_name)?;
    validation::required("title", &self.title)?;
    validation::max_len("title", &self.title, 120)?;
    if let Some(description) = &self.description {
      validation::max_len("description", description, 2000)?;
    }
    if let Some(budget) = self.budget {
      validation::non_negative("budget", budget)?;
    }
    if let Some(date) = &self.preferred_date {
      validation::date("preferredDate", date)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPostInput {
  pub category_name: String,
  pub service_name: String,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub rate_per_hour: Option<f64>,
}

impl Validate for ProviderPostInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("categoryName", &self.category_name)?;
    validation::required("serviceName", &self.service_name)?;
    validation::required("title", &self.title)?;
    validation::max_len("title", &self.title, 120)?;
    if let Some(description) = &self.description {
      validation::max_len("description", description, 2000)?;
    }
    if let Some(rate) = self.rate_per_hour {
      validation::positive("ratePerHour", rate)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostStatusInput {
  pub status: PostStatus,
}

impl Validate for PostStatusInput {
  fn validate(&self) -> MarketResult<()> {
    Ok(())
  }
}

/// Finder posts, newest first, offset paginated.
#[instrument(name = "post::list_finder_posts", skip(store, filter))]
pub async fn list_finder_posts(store: &Store, filter: &PostFilter, page: PageRequest) -> MarketResult<Page<FinderPost>> {
  let mut query = Query::collection(FINDER_POSTS);
  if let Some(owner) = &filter.owner_uid {
    query = query.filter(Filter::equals("finderUid", owner.as_str()));
  }
  let mut posts: Vec<FinderPost> = store.query_as(query).await?;
  posts.retain(|p| {
    matches_text(&filter.category_name, &p.category_name)
      && matches_text(&filter.service_name, &p.service_name)
      && filter.status.map_or(true, |s| p.status == s)
  });
  posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  Ok(paginate(posts, page))
}

#[instrument(name = "post::create_finder_post", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn create_finder_post(store: &Store, caller: &Caller, input: FinderPostInput) -> MarketResult<FinderPost> {
  let finder_name = match finder::get_profile(store, &caller.uid).await {
    Ok(profile) => profile.name,
    Err(MarketError::NotFound(_)) => caller.display_name(),
    Err(e) => return Err(e),
  };
  let at = now();
  let post = FinderPost {
    id: new_id(),
    finder_uid: caller.uid.clone(),
    finder_name,
    category_name: input.category_name.trim().to_string(),
    service_name: input.service_name.trim().to_string(),
    title: input.title.trim().to_string(),
    description: clean(input.description).unwrap_or_default(),
    budget: input.budget,
    location: clean(input.location),
    preferred_date: clean(input.preferred_date),
    status: PostStatus::Open,
    created_at: at,
    updated_at: at,
  };
  store.set(doc_path(FINDER_POSTS, &post.id)?, &post).await?;
  info!(post_id = %post.id, "Finder post created.");
  Ok(post)
}

#[instrument(name = "post::delete_finder_post", skip(store, caller), fields(uid = %caller.uid))]
pub async fn delete_finder_post(store: &Store, caller: &Caller, id: &str) -> MarketResult<()> {
  let path = doc_path(FINDER_POSTS, id)?;
  let post: FinderPost = load(store, &path, "post").await?;
  if post.finder_uid != caller.uid {
    return Err(MarketError::forbidden("only the author can delete this post"));
  }
  store.delete(path).await?;
  Ok(())
}

/// Provider posts, newest first, cursor paginated.
#[instrument(name = "post::list_provider_posts", skip(store, filter))]
pub async fn list_provider_posts(
  store: &Store,
  filter: &PostFilter,
  cursor: Option<&str>,
  limit: Option<usize>,
) -> MarketResult<Page<ProviderPost>> {
  let mut query = Query::collection(PROVIDER_POSTS);
  if let Some(owner) = &filter.owner_uid {
    query = query.filter(Filter::equals("providerUid", owner.as_str()));
  }
  let mut posts: Vec<ProviderPost> = store.query_as(query).await?;
  posts.retain(|p| {
    matches_text(&filter.category_name, &p.category_name)
      && matches_text(&filter.service_name, &p.service_name)
      && filter.status.map_or(true, |s| p.status == s)
  });
  posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
  Ok(paginate_after(posts, cursor, limit, |p| p.id.as_str()))
}

/// Service names a provider currently advertises through open posts.
pub async fn open_offers(store: &Store, provider_uid: &str) -> MarketResult<Vec<String>> {
  let posts: Vec<ProviderPost> = store
    .query_as(
      Query::collection(PROVIDER_POSTS)
        .filter(Filter::equals("providerUid", provider_uid))
        .filter(Filter::equals("status", PostStatus::Open.as_str())),
    )
    .await?;
  Ok(posts.into_iter().map(|p| p.service_name).collect())
}

#[instrument(name = "post::create_provider_post", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn create_provider_post(
  store: &Store,
  caller: &Caller,
  input: ProviderPostInput,
) -> MarketResult<ProviderPost> {
  let profile = provider::get_profile(store, &caller.uid).await?;
  let at = now();
  let post = ProviderPost {
    id: new_id(),
    provider_uid: caller.uid.clone(),
    provider_name: profile.name,
    category_name: input.category_name.trim().to_string(),
    service_name: input.service_name.trim().to_string(),
    title: input.title.trim().to_string(),
    description: clean(input.description).unwrap_or_default(),
    rate_per_hour: input.rate_per_hour.or(profile.rate_per_hour),
    status: PostStatus::Open,
    created_at: at,
    updated_at: at,
  };
  store.set(doc_path(PROVIDER_POSTS, &post.id)?, &post).await?;
  info!(post_id = %post.id, "Provider post created.");
  Ok(post)
}

async fn load_own_provider_post(store: &Store, caller: &Caller, id: &str) -> MarketResult<ProviderPost> {
  let post: ProviderPost = load(store, &doc_path(PROVIDER_POSTS, id)?, "post").await?;
  if post.provider_uid != caller.uid {
    return Err(MarketError::forbidden("only the author can change this post"));
  }
  Ok(post)
}

#[instrument(name = "post::set_provider_post_status", skip(store, caller), fields(uid = %caller.uid))]
pub async fn set_provider_post_status(
  store: &Store,
  caller: &Caller,
  id: &str,
  status: PostStatus,
) -> MarketResult<ProviderPost> {
  let mut post = load_own_provider_post(store, caller, id).await?;
  post.status = status;
  post.updated_at = now();
  store.set(doc_path(PROVIDER_POSTS, id)?, &post).await?;
  Ok(post)
}

#[instrument(name = "post::delete_provider_post", skip(store, caller), fields(uid = %caller.uid))]
pub async fn delete_provider_post(store: &Store, caller: &Caller, id: &str) -> MarketResult<()> {
  let post = load_own_provider_post(store, caller, id).await?;
  store.delete(doc_path(PROVIDER_POSTS, &post.id)?).await?;
  Ok(())
}
