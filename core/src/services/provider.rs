// core/src/services/provider.rs

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{clean, doc_path, load, now};
use crate::auth::Caller;
use crate::error::{MarketError, MarketResult};
use crate::models::collections::{ORDERS, PROVIDERS};
use crate::models::{Order, OrderStatus, ProviderProfile, ProviderType};
use crate::pagination::{paginate, Page, PageRequest};
use crate::store::{Filter, Query, Store};
use crate::validation::{self, Validate};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfileInput {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub provider_type: Option<ProviderType>,
  #[serde(default)]
  pub company_name: Option<String>,
  #[serde(default)]
  pub rate_per_hour: Option<f64>,
  #[serde(default)]
  pub max_workers: Option<u32>,
  #[serde(default)]
  pub categories: Option<Vec<String>>,
  #[serde(default)]
  pub services: Option<Vec<String>>,
  #[serde(default)]
  pub bio: Option<String>,
  #[serde(default)]
  pub avatar_url: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
}

impl Validate for ProviderProfileInput {
  fn validate(&self) -> MarketResult<()> {
    if let Some(name) = &self.name {
      validation::required("name", name)?;
    }
    if let Some(rate) = self.rate_per_hour {
      validation::positive("ratePerHour", rate)?;
    }
    if let Some(max) = self.max_workers {
      validation::in_range("maxWorkers", f64::from(max), 1.0, 100.0)?;
    }
    if let Some(bio) = &self.bio {
      validation::max_len("bio", bio, 2000)?;
    }
    Ok(())
  }
}

pub async fn get_profile(store: &Store, uid: &str) -> MarketResult<ProviderProfile> {
  load(store, &doc_path(PROVIDERS, uid)?, "provider").await
}

/// Providers sorted by rating, optionally limited to one category name.
#[instrument(name = "provider::list", skip(store))]
pub async fn list_providers(
  store: &Store,
  category: Option<&str>,
  page: PageRequest,
) -> MarketResult<Page<ProviderProfile>> {
  let mut providers: Vec<ProviderProfile> = store.query_as(Query::collection(PROVIDERS)).await?;
  if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
    providers.retain(|p| p.categories.iter().any(|c| c.eq_ignore_ascii_case(category)));
  }
  providers.sort_by(|a, b| {
    b.rating
      .partial_cmp(&a.rating)
      .unwrap_or(std::cmp::Ordering::Equal)
      .then_with(|| b.rating_count.cmp(&a.rating_count))
      .then_with(|| a.name.cmp(&b.name))
  });
  Ok(paginate(providers, page))
}

#[instrument(name = "provider::update_profile", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn update_profile(
  store: &Store,
  caller: &Caller,
  input: ProviderProfileInput,
) -> MarketResult<ProviderProfile> {
  let mut profile = get_profile(store, &caller.uid).await?;
  if let Some(name) = input.name {
    profile.name = name.trim().to_string();
  }
  if let Some(kind) = input.provider_type {
    profile.provider_type = kind;
  }
  if input.company_name.is_some() {
    profile.company_name = clean(input.company_name);
  }
  if profile.provider_type == ProviderType::Company && profile.company_name.is_none() {
    return Err(MarketError::validation("companyName is required for company providers"));
  }
  if input.rate_per_hour.is_some() {
    profile.rate_per_hour = input.rate_per_hour;
  }
  if input.max_workers.is_some() {
    profile.max_workers = input.max_workers;
  }
  if let Some(categories) = input.categories {
    profile.categories = categories.into_iter().filter_map(|c| clean(Some(c))).collect();
  }
  if let Some(services) = input.services {
    profile.services = services.into_iter().filter_map(|s| clean(Some(s))).collect();
  }
  if input.bio.is_some() {
    profile.bio = clean(input.bio);
  }
  if input.avatar_url.is_some() {
    profile.avatar_url = clean(input.avatar_url);
  }
  if input.phone.is_some() {
    profile.phone = clean(input.phone);
  }
  profile.updated_at = now();
  store.set(doc_path(PROVIDERS, &caller.uid)?, &profile).await?;
  Ok(profile)
}

/// Public view of one review left on a completed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
  pub order_id: String,
  pub finder_name: String,
  pub service_name: String,
  pub rating: u8,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  pub reviewed_at: chrono::DateTime<chrono::Utc>,
}

#[instrument(name = "provider::list_reviews", skip(store))]
pub async fn list_reviews(store: &Store, uid: &str, page: PageRequest) -> MarketResult<Page<ReviewView>> {
  let orders: Vec<Order> = store
    .query_as(
      Query::collection(ORDERS)
        .filter(Filter::equals("providerUid", uid))
        .filter(Filter::equals("status", OrderStatus::Completed.as_str())),
    )
    .await?;
  let mut reviews: Vec<ReviewView> = orders
    .into_iter()
    .filter_map(|order| {
      order.review.map(|review| ReviewView {
        order_id: order.id,
        finder_name: order.finder_name,
        service_name: order.service_name,
        rating: review.rating,
        comment: review.comment,
        reviewed_at: review.reviewed_at,
      })
    })
    .collect();
  reviews.sort_by(|a, b| b.reviewed_at.cmp(&a.reviewed_at));
  Ok(paginate(reviews, page))
}
