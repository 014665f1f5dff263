// core/src/pricing.rs

//! Order quoting: hourly rate resolution, worker clamping and promo discounts.
//!
//! Everything here is pure so the same computation backs both the quote
//! endpoint and order creation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::auth::Role;
use crate::models::{DiscountType, PromoCode, ProviderProfile};

/// Hourly rate used when neither the provider nor the caller supplies one.
pub const FALLBACK_RATE_PER_HOUR: f64 = 11.0;

/// Always zero today; kept as a named line item of the quote.
pub const PROCESSING_FEE: f64 = 0.0;

/// Rounds to cents, half away from zero.
pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

/// Why a promo code could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum PromoRejection {
  NotFound,
  Inactive,
  RoleNotEligible,
  NotStarted,
  Expired,
  UsageLimitReached,
  BelowMinimum { min_subtotal: f64 },
}

impl fmt::Display for PromoRejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PromoRejection::NotFound => f.write_str("promo code not found"),
      PromoRejection::Inactive => f.write_str("promo code is not active"),
      PromoRejection::RoleNotEligible => f.write_str("promo code is not available for your account type"),
      PromoRejection::NotStarted => f.write_str("promo code is not active yet"),
      PromoRejection::Expired => f.write_str("promo code has expired"),
      PromoRejection::UsageLimitReached => f.write_str("promo code usage limit reached"),
      PromoRejection::BelowMinimum { min_subtotal } => {
        write!(f, "subtotal must be at least {:.2} to use this promo code", min_subtotal)
      }
    }
  }
}

/// Inputs to [`quote`].
#[derive(Debug, Clone)]
pub struct QuoteInput<'a> {
  pub provider: Option<&'a ProviderProfile>,
  pub requested_rate: Option<f64>,
  pub hours: f64,
  pub workers: u32,
  pub caller_role: Option<Role>,
  /// Code as typed by the caller (if any) and the lookup result.
  pub promo: Option<(&'a str, Option<&'a PromoCode>)>,
  pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPromo {
  pub code: String,
  pub discount_type: DiscountType,
  pub discount_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
  pub rate_per_hour: f64,
  pub hours: f64,
  pub workers: u32,
  pub max_workers: Option<u32>,
  pub subtotal: f64,
  pub discount: f64,
  pub processing_fee: f64,
  pub total: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub promo: Option<AppliedPromo>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub promo_error: Option<String>,
  #[serde(skip)]
  pub promo_rejection: Option<PromoRejection>,
}

/// Effective rate: provider profile, then caller supplied, then the fallback.
pub fn resolve_rate(provider: Option<&ProviderProfile>, requested: Option<f64>) -> f64 {
  provider
    .and_then(|p| p.rate_per_hour)
    .filter(|rate| *rate > 0.0)
    .or(requested.filter(|rate| *rate > 0.0))
    .unwrap_or(FALLBACK_RATE_PER_HOUR)
}

/// Runs the eligibility checks in order and returns the discount (already
/// capped and clamped to `[0, subtotal]`).
pub fn evaluate_promo(
  promo: Option<&PromoCode>,
  caller_role: Option<Role>,
  subtotal: f64,
  now: DateTime<Utc>,
) -> Result<f64, PromoRejection> {
  let promo = promo.ok_or(PromoRejection::NotFound)?;
  if !promo.active {
    return Err(PromoRejection::Inactive);
  }
  if !promo.target_roles.is_empty() && !caller_role.is_some_and(|role| promo.target_roles.contains(&role)) {
    return Err(PromoRejection::RoleNotEligible);
  }
  if promo.starts_at.is_some_and(|starts| now < starts) {
    return Err(PromoRejection::NotStarted);
  }
  if promo.ends_at.is_some_and(|ends| now > ends) {
    return Err(PromoRejection::Expired);
  }
  if promo.usage_limit.is_some_and(|limit| promo.used_count >= limit) {
    return Err(PromoRejection::UsageLimitReached);
  }
  if let Some(min_subtotal) = promo.min_subtotal {
    if subtotal < min_subtotal {
      return Err(PromoRejection::BelowMinimum { min_subtotal });
    }
  }

  let raw = match promo.discount_type {
    DiscountType::Percent => round2(subtotal * promo.discount_value / 100.0),
    DiscountType::Fixed => round2(promo.discount_value),
  };
  let capped = match promo.max_discount {
    Some(cap) => raw.min(cap),
    None => raw,
  };
  Ok(round2(capped.clamp(0.0, subtotal)))
}

pub fn quote(input: &QuoteInput<'_>) -> Quote {
  let rate = round2(resolve_rate(input.provider, input.requested_rate));
  let max_workers = input.provider.map(ProviderProfile::worker_cap);
  let workers = match max_workers {
    Some(cap) => input.workers.clamp(1, cap),
    None => input.workers.max(1),
  };
  let subtotal = round2(rate * input.hours * f64::from(workers));

  let (discount, promo, rejection) = match input.promo {
    None => (0.0, None, None),
    Some((_, found)) => match evaluate_promo(found, input.caller_role, subtotal, input.now) {
      Ok(discount) => {
        let applied = found.map(|p| AppliedPromo {
          code: p.code.clone(),
          discount_type: p.discount_type,
          discount_value: p.discount_value,
        });
        (discount, applied, None)
      }
      Err(rejection) => (0.0, None, Some(rejection)),
    },
  };

  let total = round2(round2(subtotal + PROCESSING_FEE) - discount);
  Quote {
    rate_per_hour: rate,
    hours: input.hours,
    workers,
    max_workers,
    subtotal,
    discount,
    processing_fee: PROCESSING_FEE,
    total,
    promo,
    promo_error: rejection.as_ref().map(ToString::to_string),
    promo_rejection: rejection,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ProviderType;
  use chrono::Duration;

  fn provider(rate: Option<f64>, kind: ProviderType, max_workers: Option<u32>) -> ProviderProfile {
    let now = Utc::now();
    ProviderProfile {
      id: "p1".into(),
      uid: "p1".into(),
      name: "Sokha".into(),
      provider_type: kind,
      company_name: None,
      rate_per_hour: rate,
      max_workers,
      categories: vec![],
      services: vec![],
      bio: None,
      avatar_url: None,
      phone: None,
      rating: 0.0,
      rating_count: 0,
      rating_total: 0.0,
      verified: false,
      created_at: now,
      updated_at: now,
    }
  }

  fn percent_promo(value: f64) -> PromoCode {
    PromoCode {
      id: "SAVE10".into(),
      code: "SAVE10".into(),
      discount_type: DiscountType::Percent,
      discount_value: value,
      min_subtotal: Some(20.0),
      max_discount: None,
      usage_limit: None,
      used_count: 0,
      active: true,
      starts_at: None,
      ends_at: None,
      target_roles: vec![],
      description: None,
    }
  }

  fn input<'a>(provider: Option<&'a ProviderProfile>, promo: Option<(&'a str, Option<&'a PromoCode>)>) -> QuoteInput<'a> {
    QuoteInput {
      provider,
      requested_rate: None,
      hours: 2.0,
      workers: 1,
      caller_role: Some(Role::Finder),
      promo,
      now: Utc::now(),
    }
  }

  #[test]
  fn plain_quote_without_promo() {
    let p = provider(Some(18.0), ProviderType::Individual, None);
    let q = quote(&input(Some(&p), None));
    assert_eq!(q.subtotal, 36.0);
    assert_eq!(q.discount, 0.0);
    assert_eq!(q.total, 36.0);
  }

  #[test]
  fn percent_promo_discount() {
    let p = provider(Some(18.0), ProviderType::Individual, None);
    let promo = percent_promo(10.0);
    let q = quote(&input(Some(&p), Some(("save10", Some(&promo)))));
    assert_eq!(q.discount, 3.6);
    assert_eq!(q.total, 32.4);
    assert_eq!(q.promo.unwrap().code, "SAVE10");
  }

  #[test]
  fn rate_falls_back_to_request_then_constant() {
    let no_rate = provider(None, ProviderType::Individual, None);
    assert_eq!(resolve_rate(Some(&no_rate), Some(15.0)), 15.0);
    assert_eq!(resolve_rate(Some(&no_rate), None), FALLBACK_RATE_PER_HOUR);
    assert_eq!(resolve_rate(None, Some(0.0)), FALLBACK_RATE_PER_HOUR);
  }

  #[test]
  fn workers_are_clamped_to_provider_capacity() {
    let individual = provider(Some(10.0), ProviderType::Individual, Some(8));
    let company = provider(Some(10.0), ProviderType::Company, Some(3));
    let mut i = input(Some(&individual), None);
    i.workers = 5;
    assert_eq!(quote(&i).workers, 1);
    let mut c = input(Some(&company), None);
    c.workers = 5;
    let q = quote(&c);
    assert_eq!(q.workers, 3);
    assert_eq!(q.subtotal, 60.0);
  }

  #[test]
  fn fixed_discount_never_exceeds_subtotal() {
    let p = provider(Some(5.0), ProviderType::Individual, None);
    let mut promo = percent_promo(0.0);
    promo.discount_type = DiscountType::Fixed;
    promo.discount_value = 50.0;
    promo.min_subtotal = None;
    let q = quote(&input(Some(&p), Some(("X", Some(&promo)))));
    assert_eq!(q.subtotal, 10.0);
    assert_eq!(q.discount, 10.0);
    assert_eq!(q.total, 0.0);
  }

  #[test]
  fn max_discount_caps_percent_promos() {
    let p = provider(Some(100.0), ProviderType::Individual, None);
    let mut promo = percent_promo(50.0);
    promo.max_discount = Some(25.0);
    let q = quote(&input(Some(&p), Some(("X", Some(&promo)))));
    assert_eq!(q.discount, 25.0);
    assert_eq!(q.total, 175.0);
  }

  #[test]
  fn rejections_are_reported_in_check_order() {
    let now = Utc::now();
    let mut promo = percent_promo(10.0);
    assert_eq!(evaluate_promo(None, Some(Role::Finder), 50.0, now), Err(PromoRejection::NotFound));

    promo.target_roles = vec![Role::Provider];
    promo.usage_limit = Some(1);
    promo.used_count = 1;
    assert_eq!(
      evaluate_promo(Some(&promo), Some(Role::Finder), 50.0, now),
      Err(PromoRejection::RoleNotEligible)
    );

    promo.target_roles = vec![Role::Finder];
    promo.starts_at = Some(now + Duration::days(1));
    assert_eq!(
      evaluate_promo(Some(&promo), Some(Role::Finder), 50.0, now),
      Err(PromoRejection::NotStarted)
    );

    promo.starts_at = None;
    promo.ends_at = Some(now - Duration::days(1));
    assert_eq!(
      evaluate_promo(Some(&promo), Some(Role::Finder), 50.0, now),
      Err(PromoRejection::Expired)
    );

    promo.ends_at = None;
    assert_eq!(
      evaluate_promo(Some(&promo), Some(Role::Finder), 50.0, now),
      Err(PromoRejection::UsageLimitReached)
    );

    promo.usage_limit = None;
    assert_eq!(
      evaluate_promo(Some(&promo), Some(Role::Finder), 10.0, now),
      Err(PromoRejection::BelowMinimum { min_subtotal: 20.0 })
    );
  }

  #[test]
  fn rejected_promo_leaves_total_untouched() {
    let p = provider(Some(18.0), ProviderType::Individual, None);
    let q = quote(&input(Some(&p), Some(("NOPE", None))));
    assert_eq!(q.total, 36.0);
    assert_eq!(q.promo_error.as_deref(), Some("promo code not found"));
  }
}
