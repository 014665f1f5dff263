// core/src/services/catalog.rs

//! Categories and the services offered within them.

use serde::Deserialize;
use tracing::{info, instrument};

use super::{clean, doc_path, load, new_id};
use crate::error::{MarketError, MarketResult};
use crate::models::collections::{CATEGORIES, SERVICES};
use crate::models::{Category, ServiceItem};
use crate::store::{Filter, Query, Store};
use crate::validation::{self, Validate};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub icon_url: Option<String>,
  #[serde(default)]
  pub sort_order: Option<i32>,
  #[serde(default)]
  pub active: Option<bool>,
}

impl Validate for CategoryInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("name", &self.name)?;
    validation::max_len("name", &self.name, 80)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInput {
  pub category_id: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub base_rate_per_hour: Option<f64>,
}

impl Validate for ServiceInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("categoryId", &self.category_id)?;
    validation::required("name", &self.name)?;
    if let Some(rate) = self.base_rate_per_hour {
      validation::positive("baseRatePerHour", rate)?;
    }
    Ok(())
  }
}

/// Active categories ordered by `sortOrder`, then name.
#[instrument(name = "catalog::list_categories", skip(store))]
pub async fn list_categories(store: &Store) -> MarketResult<Vec<Category>> {
  let mut categories: Vec<Category> = store
    .query_as(Query::collection(CATEGORIES).filter(Filter::equals("active", true)))
    .await?;
  categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
  Ok(categories)
}

pub async fn get_category(store: &Store, id: &str) -> MarketResult<Category> {
  load(store, &doc_path(CATEGORIES, id)?, "category").await
}

#[instrument(name = "catalog::create_category", skip(store, input), fields(name = %input.name))]
pub async fn create_category(store: &Store, input: CategoryInput) -> MarketResult<Category> {
  let category = Category {
    id: new_id(),
    name: input.name.trim().to_string(),
    description: clean(input.description),
    icon_url: clean(input.icon_url),
    sort_order: input.sort_order.unwrap_or(0),
    active: input.active.unwrap_or(true),
  };
  store.set(doc_path(CATEGORIES, &category.id)?, &category).await?;
  info!(category_id = %category.id, "Category created.");
  Ok(category)
}

#[instrument(name = "catalog::update_category", skip(store, input))]
pub async fn update_category(store: &Store, id: &str, input: CategoryInput) -> MarketResult<Category> {
  let mut category = get_category(store, id).await?;
  category.name = input.name.trim().to_string();
  if input.description.is_some() {
    category.description = clean(input.description);
  }
  if input.icon_url.is_some() {
    category.icon_url = clean(input.icon_url);
  }
  if let Some(sort_order) = input.sort_order {
    category.sort_order = sort_order;
  }
  if let Some(active) = input.active {
    category.active = active;
  }
  store.set(doc_path(CATEGORIES, id)?, &category).await?;
  Ok(category)
}

/// Active services, optionally restricted to one category.
#[instrument(name = "catalog::list_services", skip(store))]
pub async fn list_services(store: &Store, category_id: Option<&str>) -> MarketResult<Vec<ServiceItem>> {
  let mut query = Query::collection(SERVICES).filter(Filter::equals("active", true));
  if let Some(category_id) = category_id.filter(|c| !c.is_empty()) {
    query = query.filter(Filter::equals("categoryId", category_id));
  }
  let mut services: Vec<ServiceItem> = store.query_as(query).await?;
  services.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(services)
}

pub async fn get_service(store: &Store, id: &str) -> MarketResult<ServiceItem> {
  load(store, &doc_path(SERVICES, id)?, "service").await
}

#[instrument(name = "catalog::create_service", skip(store, input), fields(name = %input.name))]
pub async fn create_service(store: &Store, input: ServiceInput) -> MarketResult<ServiceItem> {
  let category = get_category(store, &input.category_id)
    .await
    .map_err(|e| match e {
      MarketError::NotFound(_) => MarketError::validation("categoryId does not reference an existing category"),
      other => other,
    })?;
  let service = ServiceItem {
    id: new_id(),
    category_id: category.id,
    category_name: category.name,
    name: input.name.trim().to_string(),
    description: clean(input.description),
    base_rate_per_hour: input.base_rate_per_hour,
    active: true,
  };
  store.set(doc_path(SERVICES, &service.id)?, &service).await?;
  info!(service_id = %service.id, "Service created.");
  Ok(service)
}
