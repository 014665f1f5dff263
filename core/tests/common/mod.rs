// tests/common/mod.rs
#![allow(dead_code)] // Not every test binary uses every fixture

use chrono::Utc;
use market::models::collections::PROMO_CODES;
use market::models::{DiscountType, PromoCode, ProviderType};
use market::services::order::{AddressSnapshotInput, CreateOrderInput};
use market::services::provider::ProviderProfileInput;
use market::services::user::RegisterInput;
use market::services::{provider, user};
use market::store::DocPath;
use market::{Caller, Role, Store};
use once_cell::sync::Lazy;
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Callers ---
pub fn finder(uid: &str) -> Caller {
  let mut caller = Caller::new(uid, Role::Finder);
  caller.name = Some(format!("Finder {}", uid));
  caller
}

pub fn provider_caller(uid: &str) -> Caller {
  let mut caller = Caller::new(uid, Role::Provider);
  caller.name = Some(format!("Provider {}", uid));
  caller
}

pub fn admin(uid: &str) -> Caller {
  Caller::new(uid, Role::Admin)
}

// --- Fixtures ---
pub async fn register_finder(store: &Store, uid: &str) -> Caller {
  let caller = finder(uid);
  user::register(
    store,
    &caller,
    RegisterInput {
      role: Role::Finder,
      name: format!("Finder {}", uid),
      phone: None,
      avatar_url: None,
      provider_type: None,
      company_name: None,
    },
  )
  .await
  .expect("register finder");
  caller
}

/// Registers an individual provider charging `rate` per hour.
pub async fn register_provider(store: &Store, uid: &str, rate: f64) -> Caller {
  let caller = provider_caller(uid);
  user::register(
    store,
    &caller,
    RegisterInput {
      role: Role::Provider,
      name: format!("Provider {}", uid),
      phone: None,
      avatar_url: None,
      provider_type: Some(ProviderType::Individual),
      company_name: None,
    },
  )
  .await
  .expect("register provider");
  provider::update_profile(
    store,
    &caller,
    ProviderProfileInput {
      name: None,
      provider_type: None,
      company_name: None,
      rate_per_hour: Some(rate),
      max_workers: None,
      categories: Some(vec!["Cleaning".into()]),
      services: Some(vec!["Deep clean".into()]),
      bio: None,
      avatar_url: None,
      phone: None,
    },
  )
  .await
  .expect("set provider rate");
  caller
}

pub fn promo(code: &str, discount_type: DiscountType, value: f64) -> PromoCode {
  PromoCode {
    id: code.to_string(),
    code: code.to_string(),
    discount_type,
    discount_value: value,
    min_subtotal: None,
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

pub async fn put_promo(store: &Store, promo: &PromoCode) {
  let path = DocPath::new(PROMO_CODES, &promo.code).expect("promo path");
  store.set(path, promo).await.expect("store promo");
}

pub async fn promo_used_count(store: &Store, code: &str) -> u64 {
  let path = DocPath::new(PROMO_CODES, code).expect("promo path");
  store
    .get_as::<PromoCode>(&path)
    .await
    .expect("read promo")
    .expect("promo exists")
    .used_count
}

pub fn order_input(provider_uid: Option<&str>, payment_method: &str) -> CreateOrderInput {
  CreateOrderInput {
    provider_uid: provider_uid.map(str::to_string),
    category_name: "Cleaning".into(),
    service_name: "Deep clean".into(),
    services: vec![],
    address: Some(AddressSnapshotInput {
      label: Some("Home".into()),
      line1: "St. 271, House 12".into(),
      line2: None,
      city: "Phnom Penh".into(),
      province: None,
      latitude: None,
      longitude: None,
      note: None,
    }),
    address_id: None,
    preferred_date: Utc::now().format("%Y-%m-%d").to_string(),
    time_slot: "09:00-11:00".into(),
    hours: 2.0,
    workers: Some(1),
    notes: None,
    payment_method: payment_method.into(),
    rate_per_hour: None,
    promo_code: None,
  }
}
