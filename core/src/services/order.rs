// core/src/services/order.rs

//! Quoting, booking and driving orders through their lifecycle.

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{clean, doc_path, load, new_id, now};
use crate::auth::{Caller, Role};
use crate::error::{MarketError, MarketResult};
use crate::lifecycle::{check_transition, Actor};
use crate::models::collections::{ORDERS, PROMO_CODES, PROVIDERS};
use crate::models::{
  AddressSnapshot, Order, OrderReview, OrderStatus, PaymentInfo, PaymentMethod, Pricing, PromoCode, ProviderProfile,
  ProviderSnapshot, StatusTimeline,
};
use crate::pagination::{paginate, paginate_after, Page, PageRequest};
use crate::pricing::{self, round2, Quote, QuoteInput};
use crate::services::{finder, post, provider, user};
use crate::store::{DocPath, FieldPath, FieldTransform, Filter, Precondition, Query, Store, StoreError, WriteBatch};
use crate::validation::{self, Validate};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
  #[serde(default)]
  pub provider_uid: Option<String>,
  #[serde(default)]
  pub rate_per_hour: Option<f64>,
  pub hours: f64,
  #[serde(default)]
  pub workers: Option<u32>,
  #[serde(default)]
  pub promo_code: Option<String>,
}

impl Validate for QuoteRequest {
  fn validate(&self) -> MarketResult<()> {
    validation::in_range("hours", self.hours, 0.5, 24.0)?;
    if let Some(rate) = self.rate_per_hour {
      validation::non_negative("ratePerHour", rate)?;
    }
    if self.workers == Some(0) {
      return Err(MarketError::validation("workers must be at least 1"));
    }
    Ok(())
  }
}

/// Address given inline when booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshotInput {
  #[serde(default)]
  pub label: Option<String>,
  pub line1: String,
  #[serde(default)]
  pub line2: Option<String>,
  pub city: String,
  #[serde(default)]
  pub province: Option<String>,
  #[serde(default)]
  pub latitude: Option<f64>,
  #[serde(default)]
  pub longitude: Option<f64>,
  #[serde(default)]
  pub note: Option<String>,
}

impl From<AddressSnapshotInput> for AddressSnapshot {
  fn from(input: AddressSnapshotInput) -> Self {
    AddressSnapshot {
      label: clean(input.label).unwrap_or_default(),
      line1: input.line1.trim().to_string(),
      line2: clean(input.line2),
      city: input.city.trim().to_string(),
      province: clean(input.province),
      latitude: input.latitude,
      longitude: input.longitude,
      note: clean(input.note),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
  #[serde(default)]
  pub provider_uid: Option<String>,
  pub category_name: String,
  pub service_name: String,
  #[serde(default)]
  pub services: Vec<String>,
  #[serde(default)]
  pub address: Option<AddressSnapshotInput>,
  /// Saved address to snapshot when `address` is absent.
  #[serde(default)]
  pub address_id: Option<String>,
  pub preferred_date: String,
  pub time_slot: String,
  pub hours: f64,
  #[serde(default)]
  pub workers: Option<u32>,
  #[serde(default)]
  pub notes: Option<String>,
  pub payment_method: String,
  #[serde(default)]
  pub rate_per_hour: Option<f64>,
  #[serde(default)]
  pub promo_code: Option<String>,
}

impl Validate for CreateOrderInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("categoryName", &self.category_name)?;
    validation::required("serviceName", &self.service_name)?;
    validation::date("preferredDate", &self.preferred_date)?;
    validation::required("timeSlot", &self.time_slot)?;
    validation::in_range("hours", self.hours, 0.5, 24.0)?;
    if self.workers == Some(0) {
      return Err(MarketError::validation("workers must be at least 1"));
    }
    if let Some(rate) = self.rate_per_hour {
      validation::non_negative("ratePerHour", rate)?;
    }
    if let Some(notes) = &self.notes {
      validation::max_len("notes", notes, 1000)?;
    }
    if let Some(address) = &self.address {
      validation::required("address.line1", &address.line1)?;
      validation::required("address.city", &address.city)?;
    } else if self.address_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
      return Err(MarketError::validation("either address or addressId is required"));
    }
    self.payment_method.parse::<PaymentMethod>()?;
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateInput {
  pub status: OrderStatus,
}

impl Validate for StatusUpdateInput {
  fn validate(&self) -> MarketResult<()> {
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
  pub rating: u8,
  #[serde(default)]
  pub comment: Option<String>,
}

impl Validate for ReviewInput {
  fn validate(&self) -> MarketResult<()> {
    if !(1..=5).contains(&self.rating) {
      return Err(MarketError::validation("rating must be between 1 and 5"));
    }
    if let Some(comment) = &self.comment {
      validation::max_len("comment", comment, 1000)?;
    }
    Ok(())
  }
}

pub(crate) fn order_path(id: &str) -> MarketResult<DocPath> {
  doc_path(ORDERS, id)
}

/// Looks a promo up by its normalised code. Codes that cannot be document
/// ids simply do not exist.
async fn find_promo(store: &Store, raw: &str) -> MarketResult<(String, Option<PromoCode>)> {
  let code = PromoCode::normalize(raw);
  let found = match DocPath::new(PROMO_CODES, &code) {
    Ok(path) => store.get_as::<PromoCode>(&path).await?,
    Err(_) => None,
  };
  Ok((code, found))
}

async fn target_provider(store: &Store, uid: Option<&str>) -> MarketResult<Option<ProviderProfile>> {
  match uid.map(str::trim).filter(|u| !u.is_empty()) {
    Some(uid) => provider::get_profile(store, uid).await.map(Some),
    None => Ok(None),
  }
}

fn provider_snapshot(profile: &ProviderProfile) -> ProviderSnapshot {
  ProviderSnapshot {
    name: profile.name.clone(),
    role_label: profile.role_label().to_string(),
    rating: profile.rating,
    avatar_url: profile.avatar_url.clone(),
    company_name: profile.company_name.clone(),
    max_workers: profile.worker_cap(),
  }
}

fn non_blank(code: &Option<String>) -> Option<&str> {
  code.as_deref().map(str::trim).filter(|c| !c.is_empty())
}

async fn price(
  store: &Store,
  caller: &Caller,
  target: Option<&ProviderProfile>,
  requested_rate: Option<f64>,
  hours: f64,
  workers: Option<u32>,
  promo_code: Option<&str>,
) -> MarketResult<Quote> {
  let promo = match promo_code {
    Some(raw) => Some(find_promo(store, raw).await?),
    None => None,
  };
  let input = QuoteInput {
    provider: target,
    requested_rate,
    hours,
    workers: workers.unwrap_or(1),
    caller_role: caller.role,
    promo: promo.as_ref().map(|(code, found)| (code.as_str(), found.as_ref())),
    now: now(),
  };
  Ok(pricing::quote(&input))
}

/// Prices a prospective order. A promo that does not apply is reported in
/// `promoError` rather than failing the call.
#[instrument(name = "order::quote", skip(store, caller, request), fields(uid = %caller.uid))]
pub async fn quote(store: &Store, caller: &Caller, request: QuoteRequest) -> MarketResult<Quote> {
  let target = target_provider(store, request.provider_uid.as_deref()).await?;
  let quote = price(
    store,
    caller,
    target.as_ref(),
    request.rate_per_hour,
    request.hours,
    request.workers,
    non_blank(&request.promo_code),
  )
  .await?;
  debug!(total = quote.total, promo_error = ?quote.promo_error, "Quote computed.");
  Ok(quote)
}

/// Every requested service must be advertised by one of the provider's open posts.
async fn check_offered_services(store: &Store, provider_uid: &str, services: &[String]) -> MarketResult<()> {
  let offers: Vec<String> = post::open_offers(store, provider_uid)
    .await?
    .into_iter()
    .map(|s| s.trim().to_lowercase())
    .collect();
  let missing: Vec<&str> = services
    .iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty() && !offers.contains(&s.to_lowercase()))
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    Err(MarketError::validation(format!(
      "provider does not currently offer: {}",
      missing.join(", ")
    )))
  }
}

/// Books an order. The order write and the promo usage increment commit
/// together.
#[instrument(name = "order::create", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn create_order(store: &Store, caller: &Caller, input: CreateOrderInput) -> MarketResult<Order> {
  let method: PaymentMethod = input.payment_method.parse()?;
  let target = target_provider(store, input.provider_uid.as_deref()).await?;
  if let Some(profile) = &target {
    if !input.services.is_empty() {
      check_offered_services(store, &profile.uid, &input.services).await?;
    }
  }

  let promo_code = non_blank(&input.promo_code);
  let quote = price(
    store,
    caller,
    target.as_ref(),
    input.rate_per_hour,
    input.hours,
    input.workers,
    promo_code,
  )
  .await?;
  if let Some(rejection) = &quote.promo_rejection {
    return Err(MarketError::validation(rejection.to_string()));
  }

  let address = match input.address {
    Some(address) => AddressSnapshot::from(address),
    None => {
      let id = input.address_id.as_deref().unwrap_or_default();
      let saved = user::get_address(store, &caller.uid, id).await?;
      AddressSnapshot {
        label: saved.label,
        line1: saved.line1,
        line2: saved.line2,
        city: saved.city,
        province: saved.province,
        latitude: saved.latitude,
        longitude: saved.longitude,
        note: saved.note,
      }
    }
  };

  let finder_name = match finder::get_profile(store, &caller.uid).await {
    Ok(profile) => profile.name,
    Err(MarketError::NotFound(_)) => caller.display_name(),
    Err(e) => return Err(e),
  };

  let at = now();
  let mut timeline = StatusTimeline::default();
  timeline.stamp(OrderStatus::Booked, at);
  let order = Order {
    id: new_id(),
    finder_uid: caller.uid.clone(),
    finder_name,
    provider_uid: target.as_ref().map(|p| p.uid.clone()),
    provider: target.as_ref().map(provider_snapshot),
    category_name: input.category_name.trim().to_string(),
    service_name: input.service_name.trim().to_string(),
    services: input
      .services
      .iter()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty())
      .collect(),
    address,
    preferred_date: input.preferred_date.trim().to_string(),
    time_slot: input.time_slot.trim().to_string(),
    hours: quote.hours,
    workers: quote.workers,
    notes: clean(input.notes),
    payment: PaymentInfo::new(method),
    pricing: Pricing {
      rate_per_hour: quote.rate_per_hour,
      subtotal: quote.subtotal,
      discount: quote.discount,
      processing_fee: quote.processing_fee,
      total: quote.total,
    },
    promo_code: quote.promo.as_ref().map(|p| p.code.clone()),
    review: None,
    status: OrderStatus::Booked,
    status_timeline: timeline,
    created_at: at,
    updated_at: at,
  };

  let path = order_path(&order.id)?;
  let mut batch = WriteBatch::new();
  batch.require(path.clone(), Precondition::Missing);
  batch.set(path, &order)?;
  if let Some(applied) = &quote.promo {
    let promo_path = doc_path(PROMO_CODES, &applied.code)?;
    batch.require(promo_path.clone(), Precondition::Exists);
    batch.update(
      promo_path,
      vec![
        (FieldPath::parse("usedCount"), FieldTransform::increment(1)),
        (FieldPath::parse("updatedAt"), FieldTransform::set(at)?),
      ],
    );
  }
  store.commit(batch).await?;

  info!(order_id = %order.id, total = order.pricing.total, promo = ?order.promo_code, "Order booked.");
  Ok(order)
}

/// Reads an order if the caller may see it: the finder who booked it, the
/// assigned provider, any provider while it is still open for the taking,
/// and admins.
#[instrument(name = "order::get", skip(store, caller), fields(uid = %caller.uid))]
pub async fn get_order(store: &Store, caller: &Caller, id: &str) -> MarketResult<Order> {
  let order: Order = load(store, &order_path(id)?, "order").await?;
  let visible = match caller.role {
    Some(Role::Admin) => true,
    Some(Role::Provider) => {
      order.is_assigned_to(&caller.uid) || (order.provider_uid.is_none() && order.status == OrderStatus::Booked)
    }
    _ => order.finder_uid == caller.uid,
  };
  if !visible {
    return Err(MarketError::forbidden("you do not have access to this order"));
  }
  Ok(order)
}

fn newest_first(orders: &mut [Order]) {
  orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

/// The caller's own bookings, newest first, cursor paginated.
#[instrument(name = "order::list_for_finder", skip(store, caller), fields(uid = %caller.uid))]
pub async fn list_for_finder(
  store: &Store,
  caller: &Caller,
  cursor: Option<&str>,
  limit: Option<usize>,
) -> MarketResult<Page<Order>> {
  let mut orders: Vec<Order> = store
    .query_as(Query::collection(ORDERS).filter(Filter::equals("finderUid", caller.uid.as_str())))
    .await?;
  newest_first(&mut orders);
  Ok(paginate_after(orders, cursor, limit, |o| o.id.as_str()))
}

/// Orders assigned to the calling provider.
#[instrument(name = "order::list_for_provider", skip(store, caller), fields(uid = %caller.uid))]
pub async fn list_for_provider(
  store: &Store,
  caller: &Caller,
  status: Option<OrderStatus>,
  page: PageRequest,
) -> MarketResult<Page<Order>> {
  let mut query = Query::collection(ORDERS).filter(Filter::equals("providerUid", caller.uid.as_str()));
  if let Some(status) = status {
    query = query.filter(Filter::equals("status", status.as_str()));
  }
  let mut orders: Vec<Order> = store.query_as(query).await?;
  newest_first(&mut orders);
  Ok(paginate(orders, page))
}

/// Booked orders no provider has taken yet.
#[instrument(name = "order::list_available", skip(store))]
pub async fn list_available(store: &Store, page: PageRequest) -> MarketResult<Page<Order>> {
  let mut orders: Vec<Order> = store
    .query_as(Query::collection(ORDERS).filter(Filter::equals("status", OrderStatus::Booked.as_str())))
    .await?;
  orders.retain(|o| o.provider_uid.is_none());
  newest_first(&mut orders);
  Ok(paginate(orders, page))
}

/// Moves an order to `to` on behalf of the caller.
///
/// The write is conditional on the order version read here, so of two
/// providers racing to accept the same order only one succeeds.
#[instrument(name = "order::update_status", skip(store, caller), fields(uid = %caller.uid, to = %to))]
pub async fn update_status(store: &Store, caller: &Caller, id: &str, to: OrderStatus) -> MarketResult<Order> {
  let path = order_path(id)?;
  let doc = store
    .get(&path)
    .await?
    .ok_or_else(|| MarketError::not_found("order not found"))?;
  let mut order: Order = doc.decode()?;
  let from = order.status;

  if from.is_terminal() {
    return Err(MarketError::validation(format!(
      "order is already {} and can no longer change status",
      from
    )));
  }

  let actor = match caller.role {
    Some(Role::Provider) => Actor::Provider,
    Some(Role::Finder) => Actor::Finder,
    _ => return Err(MarketError::forbidden("only finders and providers can change order status")),
  };

  match actor {
    Actor::Provider => {
      if order.provider_uid.as_deref().is_some_and(|uid| uid != caller.uid) {
        return Err(MarketError::forbidden("order is assigned to another provider"));
      }
      check_transition(actor, from, to)?;
      if to != OrderStatus::Declined && !order.payment.is_confirmed() {
        return Err(MarketError::validation(
          "payment must be confirmed before the provider can proceed",
        ));
      }
      if to == OrderStatus::OnTheWay {
        order.provider_uid = Some(caller.uid.clone());
      }
    }
    Actor::Finder => {
      if order.finder_uid != caller.uid {
        return Err(MarketError::forbidden("you can only update your own orders"));
      }
      check_transition(actor, from, to)?;
    }
  }

  let at = now();
  order.status = to;
  order.status_timeline.stamp(to, at);
  order.updated_at = at;
  if let Some(provider_uid) = order.provider_uid.clone() {
    match store.get_as::<ProviderProfile>(&doc_path(PROVIDERS, &provider_uid)?).await? {
      Some(profile) => order.provider = Some(provider_snapshot(&profile)),
      None => warn!(%provider_uid, "Assigned provider has no profile; keeping previous snapshot."),
    }
  }

  let mut batch = WriteBatch::new();
  batch.require(path.clone(), Precondition::Version(doc.version));
  batch.set(path, &order)?;
  store.commit(batch).await.map_err(|e| match e {
    StoreError::PreconditionFailed { .. } => {
      MarketError::validation("order was updated by someone else, reload and try again")
    }
    other => MarketError::from(other),
  })?;

  info!(order_id = %order.id, %from, %to, %actor, "Order status changed.");
  Ok(order)
}

/// Records the finder's review and folds it into the provider's rating.
#[instrument(name = "order::submit_review", skip(store, caller, input), fields(uid = %caller.uid))]
pub async fn submit_review(store: &Store, caller: &Caller, id: &str, input: ReviewInput) -> MarketResult<Order> {
  let path = order_path(id)?;
  let mut tx = store.transaction();

  let mut order: Order = tx
    .get(&path)
    .await?
    .ok_or_else(|| MarketError::not_found("order not found"))?
    .decode()?;
  if order.finder_uid != caller.uid {
    return Err(MarketError::forbidden("you can only review your own orders"));
  }
  if order.status != OrderStatus::Completed {
    return Err(MarketError::validation("only completed orders can be reviewed"));
  }
  if order.review.is_some() {
    return Err(MarketError::validation("order has already been reviewed"));
  }
  let provider_uid = order
    .provider_uid
    .clone()
    .ok_or_else(|| MarketError::validation("order has no assigned provider to review"))?;

  let provider_path = doc_path(PROVIDERS, &provider_uid)?;
  let profile: ProviderProfile = tx
    .get(&provider_path)
    .await?
    .ok_or_else(|| MarketError::not_found("provider not found"))?
    .decode()?;

  let at = now();
  let rating_count = profile.rating_count + 1;
  let rating_total = profile.rating_total + f64::from(input.rating);
  let rating = round2(rating_total / rating_count as f64);

  order.review = Some(OrderReview {
    rating: input.rating,
    comment: clean(input.comment),
    reviewed_at: at,
  });
  order.updated_at = at;

  tx.set(path, &order)?;
  tx.update(
    provider_path,
    vec![
      (FieldPath::parse("ratingCount"), FieldTransform::set(rating_count)?),
      (FieldPath::parse("ratingTotal"), FieldTransform::set(rating_total)?),
      (FieldPath::parse("rating"), FieldTransform::set(rating)?),
      (FieldPath::parse("updatedAt"), FieldTransform::set(at)?),
    ],
  );
  tx.commit().await?;

  info!(order_id = %order.id, %provider_uid, rating, "Review recorded.");
  Ok(order)
}
