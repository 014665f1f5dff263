use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use market::lifecycle::{check_transition, Actor};
use market::models::collections::{PROMO_CODES, PROVIDERS};
use market::models::{DiscountType, OrderStatus, PromoCode, ProviderProfile, ProviderType};
use market::payment::khqr::{self, KhqrMerchant};
use market::pricing::{quote, QuoteInput};
use market::services::order::{self, QuoteRequest};
use market::store::DocPath;
use market::{Caller, Role, Store};
use std::hint::black_box;
use tokio::runtime::Runtime;

fn provider(kind: ProviderType, max_workers: u32) -> ProviderProfile {
  let now = Utc::now();
  ProviderProfile {
    id: "p1".into(),
    uid: "p1".into(),
    name: "Bench Provider".into(),
    provider_type: kind,
    company_name: Some("Bench Co".into()),
    rate_per_hour: Some(18.0),
    max_workers: Some(max_workers),
    categories: vec![],
    services: vec![],
    bio: None,
    avatar_url: None,
    phone: None,
    rating: 4.5,
    rating_count: 10,
    rating_total: 45.0,
    verified: true,
    created_at: now,
    updated_at: now,
  }
}

fn promo() -> PromoCode {
  PromoCode {
    id: "SAVE10".into(),
    code: "SAVE10".into(),
    discount_type: DiscountType::Percent,
    discount_value: 10.0,
    min_subtotal: Some(20.0),
    max_discount: Some(50.0),
    usage_limit: Some(1000),
    used_count: 10,
    active: true,
    starts_at: None,
    ends_at: None,
    target_roles: vec![Role::Finder],
    description: None,
  }
}

// --- Benchmark Functions ---

fn bench_pure_quote(c: &mut Criterion) {
  let mut group = c.benchmark_group("PureQuote");
  let company = provider(ProviderType::Company, 8);
  let code = promo();

  for workers in [1u32, 4, 16].iter() {
    group.throughput(Throughput::Elements(1));
    group.bench_with_input(BenchmarkId::new("with_promo", workers), workers, |b, &workers| {
      b.iter(|| {
        let input = QuoteInput {
          provider: Some(&company),
          requested_rate: None,
          hours: 2.5,
          workers,
          caller_role: Some(Role::Finder),
          promo: Some(("save10", Some(&code))),
          now: Utc::now(),
        };
        black_box(quote(black_box(&input)))
      });
    });
  }
  group.finish();
}

fn bench_store_backed_quote(c: &mut Criterion) {
  let mut group = c.benchmark_group("StoreBackedQuote");
  let rt = Runtime::new().unwrap();
  let store = Store::in_memory();
  rt.block_on(async {
    store
      .set(DocPath::new(PROVIDERS, "p1").unwrap(), &provider(ProviderType::Individual, 1))
      .await
      .unwrap();
    store
      .set(DocPath::new(PROMO_CODES, "SAVE10").unwrap(), &promo())
      .await
      .unwrap();
  });
  let caller = Caller::new("f1", Role::Finder);

  group.throughput(Throughput::Elements(1));
  group.bench_function("provider_and_promo_lookup", |b| {
    b.to_async(&rt).iter(|| async {
      let request = QuoteRequest {
        provider_uid: Some("p1".into()),
        rate_per_hour: None,
        hours: 2.0,
        workers: Some(1),
        promo_code: Some("SAVE10".into()),
      };
      order::quote(&store, &caller, request).await.unwrap()
    });
  });
  group.finish();
}

fn bench_transition_checks(c: &mut Criterion) {
  let mut group = c.benchmark_group("TransitionChecks");
  group.throughput(Throughput::Elements((OrderStatus::ALL.len() * OrderStatus::ALL.len() * 2) as u64));
  group.bench_function("all_edges_both_actors", |b| {
    b.iter(|| {
      let mut allowed = 0;
      for from in OrderStatus::ALL {
        for to in OrderStatus::ALL {
          for actor in [Actor::Finder, Actor::Provider] {
            if check_transition(actor, black_box(from), black_box(to)).is_ok() {
              allowed += 1;
            }
          }
        }
      }
      allowed
    });
  });
  group.finish();
}

fn bench_khqr_encode(c: &mut Criterion) {
  let mut group = c.benchmark_group("KhqrEncode");
  let merchant = KhqrMerchant {
    account_id: "market@bank".into(),
    merchant_name: "Market".into(),
    merchant_city: "Phnom Penh".into(),
    currency: "USD".into(),
  };
  group.bench_function("encode_and_hash", |b| {
    b.iter(|| black_box(khqr::encode(&merchant, black_box(32.4), "ORD0123456789", 1_700_000_000_000)));
  });
  group.finish();
}

criterion_group!(
  benches,
  bench_pure_quote,
  bench_store_backed_quote,
  bench_transition_checks,
  bench_khqr_encode
);
criterion_main!(benches);
