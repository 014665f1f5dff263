// core/src/services/admin.rs

//! Back-office reads plus broadcast and promo code management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

use super::{clean, doc_path, new_id, now};
use crate::auth::{Caller, Role};
use crate::error::{MarketError, MarketResult};
use crate::models::collections::{
  ADMIN_BROADCASTS, CATEGORIES, FINDERS, ORDERS, PROMO_CODES, PROVIDERS, SERVICES, USERS,
};
use crate::models::{AdminBroadcast, DiscountType, Order, OrderStatus, PromoCode, UserProfile};
use crate::pagination::{paginate, Page, PageRequest};
use crate::pricing::round2;
use crate::store::{Filter, Precondition, Query, Store, StoreError, WriteBatch};
use crate::validation::{self, Validate};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
  pub users: usize,
  pub finders: usize,
  pub providers: usize,
  pub categories: usize,
  pub services: usize,
  pub orders: usize,
  pub orders_by_status: BTreeMap<String, usize>,
  /// Sum of totals of completed orders.
  pub completed_revenue: f64,
}

#[instrument(name = "admin::overview", skip(store))]
pub async fn overview(store: &Store) -> MarketResult<Overview> {
  let count = |collection: &'static str| async move {
    store.query(Query::collection(collection)).await.map(|docs| docs.len())
  };
  let orders: Vec<Order> = store.query_as(Query::collection(ORDERS)).await?;

  let mut orders_by_status: BTreeMap<String, usize> =
    OrderStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
  let mut completed_revenue = 0.0;
  for order in &orders {
    *orders_by_status.entry(order.status.as_str().to_string()).or_default() += 1;
    if order.status == OrderStatus::Completed {
      completed_revenue = round2(completed_revenue + order.pricing.total);
    }
  }

  Ok(Overview {
    users: count(USERS).await?,
    finders: count(FINDERS).await?,
    providers: count(PROVIDERS).await?,
    categories: count(CATEGORIES).await?,
    services: count(SERVICES).await?,
    orders: orders.len(),
    orders_by_status,
    completed_revenue,
  })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
  #[serde(default)]
  pub role: Option<Role>,
}

#[instrument(name = "admin::list_users", skip(store))]
pub async fn list_users(store: &Store, filter: &UserFilter, page: PageRequest) -> MarketResult<Page<UserProfile>> {
  let mut query = Query::collection(USERS);
  if let Some(role) = filter.role {
    query = query.filter(Filter::equals("role", role.as_str()));
  }
  let mut users: Vec<UserProfile> = store.query_as(query).await?;
  users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  Ok(paginate(users, page))
}

#[instrument(name = "admin::list_orders", skip(store))]
pub async fn list_orders(store: &Store, status: Option<OrderStatus>, page: PageRequest) -> MarketResult<Page<Order>> {
  let mut query = Query::collection(ORDERS);
  if let Some(status) = status {
    query = query.filter(Filter::equals("status", status.as_str()));
  }
  let mut orders: Vec<Order> = store.query_as(query).await?;
  orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  Ok(paginate(orders, page))
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastInput {
  pub title: String,
  pub body: String,
  #[serde(default)]
  pub audience: Vec<Role>,
}

impl Validate for BroadcastInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("title", &self.title)?;
    validation::max_len("title", &self.title, 120)?;
    validation::required("body", &self.body)?;
    validation::max_len("body", &self.body, 4000)
  }
}

#[instrument(name = "admin::list_broadcasts", skip(store))]
pub async fn list_broadcasts(store: &Store, page: PageRequest) -> MarketResult<Page<AdminBroadcast>> {
  let mut broadcasts: Vec<AdminBroadcast> = store.query_as(Query::collection(ADMIN_BROADCASTS)).await?;
  broadcasts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  Ok(paginate(broadcasts, page))
}

#[instrument(name = "admin::create_broadcast", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn create_broadcast(store: &Store, caller: &Caller, input: BroadcastInput) -> MarketResult<AdminBroadcast> {
  let mut audience = input.audience;
  audience.sort_by_key(|r| r.as_str());
  audience.dedup();
  let broadcast = AdminBroadcast {
    id: new_id(),
    title: input.title.trim().to_string(),
    body: input.body.trim().to_string(),
    audience,
    created_by: caller.uid.clone(),
    created_at: now(),
  };
  store.set(doc_path(ADMIN_BROADCASTS, &broadcast.id)?, &broadcast).await?;
  info!(broadcast_id = %broadcast.id, "Broadcast published.");
  Ok(broadcast)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeInput {
  pub code: String,
  pub discount_type: DiscountType,
  pub discount_value: f64,
  #[serde(default)]
  pub min_subtotal: Option<f64>,
  #[serde(default)]
  pub max_discount: Option<f64>,
  #[serde(default)]
  pub usage_limit: Option<u64>,
  #[serde(default)]
  pub active: Option<bool>,
  #[serde(default)]
  pub starts_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub ends_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub target_roles: Vec<Role>,
  #[serde(default)]
  pub description: Option<String>,
}

impl Validate for PromoCodeInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("code", &self.code)?;
    validation::max_len("code", &self.code, 32)?;
    if !self.code.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
      return Err(MarketError::validation("code may only contain letters, digits, '-' and '_'"));
    }
    validation::positive("discountValue", self.discount_value)?;
    if self.discount_type == DiscountType::Percent {
      validation::in_range("discountValue", self.discount_value, 0.0, 100.0)?;
    }
    if let Some(min) = self.min_subtotal {
      validation::non_negative("minSubtotal", min)?;
    }
    if let Some(cap) = self.max_discount {
      validation::positive("maxDiscount", cap)?;
    }
    if let (Some(starts), Some(ends)) = (self.starts_at, self.ends_at) {
      if ends <= starts {
        return Err(MarketError::validation("endsAt must be after startsAt"));
      }
    }
    Ok(())
  }
}

#[instrument(name = "admin::list_promo_codes", skip(store))]
pub async fn list_promo_codes(store: &Store) -> MarketResult<Vec<PromoCode>> {
  let mut codes: Vec<PromoCode> = store.query_as(Query::collection(PROMO_CODES)).await?;
  codes.sort_by(|a, b| a.code.cmp(&b.code));
  Ok(codes)
}

/// Creates a promo code keyed by its upper-cased code. Existing codes are
/// never overwritten.
#[instrument(name = "admin::create_promo_code", skip(store, input), fields(code = %input.code))]
pub async fn create_promo_code(store: &Store, input: PromoCodeInput) -> MarketResult<PromoCode> {
  let code = PromoCode::normalize(&input.code);
  let promo = PromoCode {
    id: code.clone(),
    code: code.clone(),
    discount_type: input.discount_type,
    discount_value: input.discount_value,
    min_subtotal: input.min_subtotal,
    max_discount: input.max_discount,
    usage_limit: input.usage_limit,
    used_count: 0,
    active: input.active.unwrap_or(true),
    starts_at: input.starts_at,
    ends_at: input.ends_at,
    target_roles: input.target_roles,
    description: clean(input.description),
  };

  let path = doc_path(PROMO_CODES, &code)?;
  let mut batch = WriteBatch::new();
  batch.require(path.clone(), Precondition::Missing);
  batch.set(path, &promo)?;
  store.commit(batch).await.map_err(|e| match e {
    StoreError::PreconditionFailed { .. } => MarketError::validation(format!("promo code {} already exists", code)),
    other => other.into(),
  })?;
  info!(%code, "Promo code created.");
  Ok(promo)
}
