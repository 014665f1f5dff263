// server/src/seed.rs

//! Demo data: catalog, one account per role, provider offers and promo codes.
//!
//! Seeding is idempotent. Documents that already exist are left alone, the
//! rest are created in one batch guarded by "missing" preconditions.

use chrono::{DateTime, Utc};
use market::models::collections::{
  ADDRESSES, ADMINS, AUTH_ACCOUNTS, CATEGORIES, FINDERS, PROMO_CODES, PROVIDERS, PROVIDER_POSTS, SERVICES, USERS,
};
use market::models::{
  Address, AdminRecord, AuthAccount, Category, DiscountType, FinderProfile, PostStatus, PromoCode, ProviderPost,
  ProviderProfile, ProviderType, ServiceItem, UserProfile,
};
use market::store::{to_object, DocPath, Precondition, WriteBatch};
use market::{Role, Store};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::errors::Result;
use crate::services::auth_service::hash_password;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub created: usize,
  pub skipped: usize,
}

/// Catalog entries: category, sort order, services with base hourly rates.
const CATALOG: &[(&str, &str, i32, &[(&str, f64)])] = &[
  ("cleaning", "Cleaning", 1, &[("Deep clean", 12.0), ("Regular clean", 10.0)]),
  ("plumbing", "Plumbing", 2, &[("Leak repair", 15.0), ("Drain unclogging", 14.0)]),
  ("electrical", "Electrical", 3, &[("Wiring repair", 18.0), ("Light installation", 15.0)]),
  ("gardening", "Gardening", 4, &[("Lawn mowing", 10.0), ("Tree trimming", 13.0)]),
  ("moving", "Moving", 5, &[("House moving", 16.0), ("Furniture assembly", 12.0)]),
];

struct DemoAccount {
  uid: &'static str,
  email: &'static str,
  name: &'static str,
  role: Role,
}

const ACCOUNTS: &[DemoAccount] = &[
  DemoAccount {
    uid: "seed-admin",
    email: "admin@market.local",
    name: "Market Admin",
    role: Role::Admin,
  },
  DemoAccount {
    uid: "seed-finder",
    email: "finder@market.local",
    name: "Sophea Finder",
    role: Role::Finder,
  },
  DemoAccount {
    uid: "seed-provider",
    email: "provider@market.local",
    name: "Dara Cleaner",
    role: Role::Provider,
  },
  DemoAccount {
    uid: "seed-company",
    email: "company@market.local",
    name: "Bright Homes",
    role: Role::Provider,
  },
];

fn slug(name: &str) -> String {
  name
    .split(|c: char| !c.is_ascii_alphanumeric())
    .filter(|part| !part.is_empty())
    .map(str::to_ascii_lowercase)
    .collect::<Vec<_>>()
    .join("-")
}

/// Documents to seed, in write order.
struct Plan {
  docs: Vec<(DocPath, Map<String, Value>)>,
}

impl Plan {
  fn add<T: serde::Serialize>(&mut self, collection: &str, id: &str, value: &T) -> Result<()> {
    let path = DocPath::new(collection, id)?;
    self.docs.push((path, to_object(value)?));
    Ok(())
  }
}

fn catalog(plan: &mut Plan) -> Result<()> {
  for (category_id, category_name, sort_order, services) in CATALOG {
    plan.add(
      CATEGORIES,
      category_id,
      &Category {
        id: category_id.to_string(),
        name: category_name.to_string(),
        description: Some(format!("{} services near you", category_name)),
        icon_url: None,
        sort_order: *sort_order,
        active: true,
      },
    )?;
    for (service_name, rate) in services.iter() {
      let id = format!("{}-{}", category_id, slug(service_name));
      plan.add(
        SERVICES,
        &id,
        &ServiceItem {
          id: id.clone(),
          category_id: category_id.to_string(),
          category_name: category_name.to_string(),
          name: service_name.to_string(),
          description: None,
          base_rate_per_hour: Some(*rate),
          active: true,
        },
      )?;
    }
  }
  Ok(())
}

fn provider_profile(account: &DemoAccount, at: DateTime<Utc>) -> ProviderProfile {
  let company = account.uid == "seed-company";
  ProviderProfile {
    id: account.uid.to_string(),
    uid: account.uid.to_string(),
    name: account.name.to_string(),
    provider_type: if company {
      ProviderType::Company
    } else {
      ProviderType::Individual
    },
    company_name: company.then(|| "Bright Homes Co., Ltd.".to_string()),
    rate_per_hour: Some(if company { 15.0 } else { 12.0 }),
    max_workers: Some(if company { 5 } else { 1 }),
    categories: if company {
      vec!["Cleaning".to_string(), "Moving".to_string()]
    } else {
      vec!["Cleaning".to_string()]
    },
    services: if company {
      vec!["Deep clean".to_string(), "House moving".to_string()]
    } else {
      vec!["Deep clean".to_string(), "Regular clean".to_string()]
    },
    bio: Some(if company {
      "A team of trained cleaners and movers.".to_string()
    } else {
      "Careful, friendly and on time.".to_string()
    }),
    avatar_url: None,
    phone: None,
    rating: 0.0,
    rating_count: 0,
    rating_total: 0.0,
    verified: true,
    created_at: at,
    updated_at: at,
  }
}

fn accounts(plan: &mut Plan, password_hash: &str, at: DateTime<Utc>) -> Result<()> {
  for account in ACCOUNTS {
    plan.add(
      USERS,
      account.uid,
      &UserProfile {
        id: account.uid.to_string(),
        uid: account.uid.to_string(),
        email: Some(account.email.to_string()),
        name: account.name.to_string(),
        role: account.role,
        phone: None,
        avatar_url: None,
        created_at: at,
        updated_at: at,
      },
    )?;
    plan.add(
      AUTH_ACCOUNTS,
      account.uid,
      &AuthAccount {
        id: account.uid.to_string(),
        uid: account.uid.to_string(),
        email: account.email.to_string(),
        password_hash: password_hash.to_string(),
        role: account.role,
        name: account.name.to_string(),
      },
    )?;

    match account.role {
      Role::Admin => plan.add(
        ADMINS,
        account.uid,
        &AdminRecord {
          id: account.uid.to_string(),
          uid: account.uid.to_string(),
          name: account.name.to_string(),
          created_at: at,
        },
      )?,
      Role::Finder => {
        plan.add(
          FINDERS,
          account.uid,
          &FinderProfile {
            id: account.uid.to_string(),
            uid: account.uid.to_string(),
            name: account.name.to_string(),
            phone: None,
            avatar_url: None,
            bio: None,
            created_at: at,
            updated_at: at,
          },
        )?;
        plan.add(
          &format!("{}/{}/{}", USERS, account.uid, ADDRESSES),
          "home",
          &Address {
            id: "home".to_string(),
            label: "Home".to_string(),
            line1: "St. 240, Daun Penh".to_string(),
            line2: None,
            city: "Phnom Penh".to_string(),
            province: Some("Phnom Penh".to_string()),
            latitude: Some(11.5564),
            longitude: Some(104.9282),
            note: None,
            is_default: true,
            created_at: at,
            updated_at: at,
          },
        )?;
      }
      Role::Provider => {
        let profile = provider_profile(account, at);
        for service_name in &profile.services {
          let category_name = CATALOG
            .iter()
            .find(|(_, _, _, services)| services.iter().any(|(name, _)| name == service_name))
            .map(|(_, name, _, _)| name.to_string())
            .unwrap_or_default();
          let id = format!("{}-{}", account.uid, slug(service_name));
          plan.add(
            PROVIDER_POSTS,
            &id,
            &ProviderPost {
              id: id.clone(),
              provider_uid: account.uid.to_string(),
              provider_name: account.name.to_string(),
              category_name,
              service_name: service_name.clone(),
              title: format!("{} by {}", service_name, account.name),
              description: String::new(),
              rate_per_hour: profile.rate_per_hour,
              status: PostStatus::Open,
              created_at: at,
              updated_at: at,
            },
          )?;
        }
        plan.add(PROVIDERS, account.uid, &profile)?;
      }
    }
  }
  Ok(())
}

fn promo_codes(plan: &mut Plan) -> Result<()> {
  let welcome = PromoCode {
    id: "WELCOME10".to_string(),
    code: "WELCOME10".to_string(),
    discount_type: DiscountType::Percent,
    discount_value: 10.0,
    min_subtotal: None,
    max_discount: Some(20.0),
    usage_limit: Some(1000),
    used_count: 0,
    active: true,
    starts_at: None,
    ends_at: None,
    target_roles: vec![Role::Finder],
    description: Some("10% off your first bookings".to_string()),
  };
  let flat = PromoCode {
    id: "FLAT5".to_string(),
    code: "FLAT5".to_string(),
    discount_type: DiscountType::Fixed,
    discount_value: 5.0,
    min_subtotal: Some(20.0),
    max_discount: None,
    usage_limit: None,
    used_count: 0,
    active: true,
    starts_at: None,
    ends_at: None,
    target_roles: Vec::new(),
    description: Some("$5 off orders of $20 or more".to_string()),
  };
  plan.add(PROMO_CODES, &welcome.code, &welcome)?;
  plan.add(PROMO_CODES, &flat.code, &flat)
}

/// Seeds every missing demo document. Every demo account signs in with `password`.
#[instrument(name = "seed::run", skip(store, password))]
pub async fn run(store: &Store, password: &str) -> Result<SeedReport> {
  let at = Utc::now();
  let password_hash = hash_password(password)?;
  let mut plan = Plan { docs: Vec::new() };
  catalog(&mut plan)?;
  accounts(&mut plan, &password_hash, at)?;
  promo_codes(&mut plan)?;

  let mut report = SeedReport::default();
  let mut batch = WriteBatch::new();
  for (path, data) in plan.docs {
    if store.get(&path).await?.is_some() {
      debug!(%path, "Seed document already present.");
      report.skipped += 1;
      continue;
    }
    batch.require(path.clone(), Precondition::Missing);
    batch.set(path, &data)?;
    report.created += 1;
  }
  store.commit(batch).await?;
  info!(created = report.created, skipped = report.skipped, "Seeding finished.");
  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use market::store::Query;

  #[test]
  fn slugs_are_lowercase_and_dashed() {
    assert_eq!(slug("Deep clean"), "deep-clean");
    assert_eq!(slug("Drain  unclogging!"), "drain-unclogging");
  }

  #[tokio::test]
  async fn seeding_twice_creates_nothing_new() {
    let store = Store::in_memory();
    let first = run(&store, "pw-123456").await.unwrap();
    assert!(first.created > 0);
    assert_eq!(first.skipped, 0);

    let second = run(&store, "pw-123456").await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, first.created);

    let categories = store.query(Query::collection(CATEGORIES)).await.unwrap();
    assert_eq!(categories.len(), CATALOG.len());
  }
}
