// server/tests/api_tests.rs

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use market::storage::ObjectStorage;
use market::{Role, Store};
use market_server::identity::TokenSubject;
use market_server::{seed, web as routes, AppConfig, AppState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const SEED_PASSWORD: &str = "demo-password-1";

fn test_state(store: Store) -> AppState {
  let storage_dir = std::env::temp_dir().join(format!("market-api-{}", uuid::Uuid::new_v4()));
  let vars: HashMap<&str, String> = HashMap::from([
    ("STORE_BACKEND", "memory".to_string()),
    ("JWT_SECRET", "test-secret".to_string()),
    ("STORAGE_DIR", storage_dir.display().to_string()),
    ("PUBLIC_BASE_URL", "http://localhost:8080".to_string()),
  ]);
  let config = AppConfig::from_lookup(|k| vars.get(k).cloned()).expect("test config");
  AppState::new(Arc::new(config), store).expect("test state")
}

fn token(state: &AppState, uid: &str, role: Option<Role>) -> String {
  let issued = state
    .identity
    .issue(TokenSubject {
      uid: uid.to_string(),
      role,
      name: Some(format!("User {}", uid)),
      ..Default::default()
    })
    .expect("token");
  format!("Bearer {}", issued.token)
}

macro_rules! app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(routes::configure_app_routes),
    )
    .await
  };
}

async fn seeded_state() -> AppState {
  let store = Store::in_memory();
  seed::run(&store, SEED_PASSWORD).await.expect("seed");
  test_state(store)
}

#[actix_web::test]
async fn health_check_uses_the_envelope() {
  let state = test_state(Store::in_memory());
  let app = app!(state);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["message"], "OK");
  assert_eq!(body["data"]["status"], "ok");
  assert!(body.get("pagination").is_none());
}

#[actix_web::test]
async fn protected_routes_need_a_valid_token() {
  let state = test_state(Store::in_memory());
  let app = app!(state);

  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/users/me").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], false);
  assert_eq!(body["data"], Value::Null);

  let resp = test::call_service(
    &app,
    test::TestRequest::get()
      .uri("/api/users/me")
      .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn role_gates_reject_the_wrong_role() {
  let state = seeded_state().await;
  let app = app!(state);

  // seed-finder is a finder; creating categories is admin only.
  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/categories")
      .insert_header((header::AUTHORIZATION, token(&state, "seed-finder", None)))
      .set_json(json!({ "name": "Painting" }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  // A token with no stored profile has no role at all.
  let resp = test::call_service(
    &app,
    test::TestRequest::get()
      .uri("/api/chats")
      .insert_header((header::AUTHORIZATION, token(&state, "stranger", None)))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn seeded_accounts_can_sign_in() {
  let state = seeded_state().await;
  let app = app!(state);

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/auth/signin")
      .set_json(json!({ "email": "Finder@Market.local", "password": SEED_PASSWORD }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["uid"], "seed-finder");
  assert_eq!(body["data"]["role"], "finder");
  assert_eq!(body["data"]["tokenType"], "Bearer");
  let issued = body["data"]["token"].as_str().unwrap().to_string();

  let resp = test::call_service(
    &app,
    test::TestRequest::get()
      .uri("/api/users/me")
      .insert_header((header::AUTHORIZATION, format!("Bearer {}", issued)))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/auth/signin")
      .set_json(json!({ "email": "finder@market.local", "password": "wrong" }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "Invalid email or password");
}

#[actix_web::test]
async fn register_then_book_and_complete_an_order() {
  let state = seeded_state().await;
  let app = app!(state);
  let finder = token(&state, "new-finder", None);
  let provider = token(&state, "seed-provider", None);

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/users/register")
      .insert_header((header::AUTHORIZATION, finder.clone()))
      .set_json(json!({ "role": "finder", "name": "Vanna" }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["role"], "finder");

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/orders/quote")
      .insert_header((header::AUTHORIZATION, finder.clone()))
      .set_json(json!({ "providerUid": "seed-provider", "hours": 2, "workers": 3, "promoCode": "welcome10" }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  let quote = &body["data"];
  assert_eq!(quote["ratePerHour"], 12.0);
  assert_eq!(quote["workers"], 1);
  assert_eq!(quote["subtotal"], 24.0);
  assert_eq!(quote["discount"], 2.4);
  assert_eq!(quote["total"], 21.6);
  assert_eq!(quote["promo"]["code"], "WELCOME10");

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header((header::AUTHORIZATION, finder.clone()))
      .set_json(json!({
        "categoryName": "Cleaning",
        "serviceName": "Deep clean",
        "address": { "line1": "St. 51", "city": "Phnom Penh" },
        "preferredDate": "2026-11-02",
        "timeSlot": "09:00-11:00",
        "hours": 2,
        "paymentMethod": "cash"
      }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["status"], "booked");
  let order_id = body["data"]["id"].as_str().unwrap().to_string();

  // Open for any provider until one accepts it.
  let resp = test::call_service(
    &app,
    test::TestRequest::get()
      .uri("/api/orders/available")
      .insert_header((header::AUTHORIZATION, provider.clone()))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"].as_array().unwrap().len(), 1);
  assert_eq!(body["pagination"]["total"], 1);

  let status_update = |auth: &str, status: &str| {
    test::TestRequest::patch()
      .uri(&format!("/api/orders/{}/status", order_id))
      .insert_header((header::AUTHORIZATION, auth.to_string()))
      .set_json(json!({ "status": status }))
      .to_request()
  };

  let resp = test::call_service(&app, status_update(&provider, "completed")).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = test::call_service(&app, status_update(&provider, "on_the_way")).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["providerUid"], "seed-provider");

  let other_provider = token(&state, "seed-company", None);
  let resp = test::call_service(&app, status_update(&other_provider, "started")).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = test::call_service(&app, status_update(&finder, "completed")).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["status"], "completed");

  let resp = test::call_service(&app, status_update(&finder, "cancelled")).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri(&format!("/api/orders/{}/review", order_id))
      .insert_header((header::AUTHORIZATION, finder.clone()))
      .set_json(json!({ "rating": 5, "comment": "Spotless" }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = test::call_service(
    &app,
    test::TestRequest::get().uri("/api/providers/seed-provider").to_request(),
  )
  .await;
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["rating"], 5.0);
  assert_eq!(body["data"]["ratingCount"], 1);
}

#[actix_web::test]
async fn admin_status_updates_are_rejected_by_order_state() {
  let state = seeded_state().await;
  let app = app!(state);
  let finder = token(&state, "seed-finder", None);
  let admin = token(&state, "seed-admin", None);

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/orders")
      .insert_header((header::AUTHORIZATION, finder.clone()))
      .set_json(json!({
        "categoryName": "Cleaning",
        "serviceName": "Regular clean",
        "address": { "line1": "St. 240", "city": "Phnom Penh" },
        "preferredDate": "2026-11-05",
        "timeSlot": "14:00-16:00",
        "hours": 2,
        "paymentMethod": "cash"
      }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  let order_id = body["data"]["id"].as_str().unwrap().to_string();

  let status_update = |auth: &str, status: &str| {
    test::TestRequest::patch()
      .uri(&format!("/api/orders/{}/status", order_id))
      .insert_header((header::AUTHORIZATION, auth.to_string()))
      .set_json(json!({ "status": status }))
      .to_request()
  };

  // An open order has no admin edge.
  let resp = test::call_service(&app, status_update(&admin, "cancelled")).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = test::call_service(&app, status_update(&finder, "cancelled")).await;
  assert_eq!(resp.status(), StatusCode::OK);

  // Once terminal, every actor gets the same answer.
  let resp = test::call_service(&app, status_update(&admin, "on_the_way")).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], false);

  let resp = test::call_service(&app, status_update(&finder, "booked")).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn chat_threads_track_unread_counts() {
  let state = seeded_state().await;
  let app = app!(state);
  let finder = token(&state, "seed-finder", None);
  let provider = token(&state, "seed-provider", None);

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/chats/direct")
      .insert_header((header::AUTHORIZATION, finder.clone()))
      .set_json(json!({ "recipientUid": "seed-provider" }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"]["id"], "seed-finder_seed-provider");
  let thread_id = body["data"]["id"].as_str().unwrap().to_string();

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri(&format!("/api/chats/{}/messages", thread_id))
      .insert_header((header::AUTHORIZATION, finder.clone()))
      .set_json(json!({ "text": "Are you free on Monday?" }))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp = test::call_service(
    &app,
    test::TestRequest::get()
      .uri("/api/chats")
      .insert_header((header::AUTHORIZATION, provider.clone()))
      .to_request(),
  )
  .await;
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["data"][0]["unreadCount"], 2);
  assert_eq!(body["data"][0]["lastMessage"], "Are you free on Monday?");

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri(&format!("/api/chats/{}/read", thread_id))
      .insert_header((header::AUTHORIZATION, provider.clone()))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  let bytes = test::read_body(resp).await;
  assert!(bytes.is_empty());

  // Not a participant.
  let resp = test::call_service(
    &app,
    test::TestRequest::get()
      .uri(&format!("/api/chats/{}/messages", thread_id))
      .insert_header((header::AUTHORIZATION, token(&state, "seed-company", None)))
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn signed_files_are_served_only_with_a_valid_signature() {
  let state = test_state(Store::in_memory());
  let app = app!(state);

  let stored = state
    .storage
    .upload("chat_uploads/a_b/photo.png", vec![137, 80, 78, 71], "image/png")
    .await
    .unwrap();
  let relative = stored.url.strip_prefix("http://localhost:8080").unwrap().to_string();

  let resp = test::call_service(&app, test::TestRequest::get().uri(&relative).to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
  let bytes = test::read_body(resp).await;
  assert_eq!(bytes.as_ref(), &[137, 80, 78, 71]);

  let tampered = relative.replace("photo.png", "other.png");
  let resp = test::call_service(&app, test::TestRequest::get().uri(&tampered).to_request()).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn malformed_json_is_a_validation_envelope() {
  let state = seeded_state().await;
  let app = app!(state);

  let resp = test::call_service(
    &app,
    test::TestRequest::post()
      .uri("/api/orders/quote")
      .insert_header((header::AUTHORIZATION, token(&state, "seed-finder", None)))
      .insert_header((header::CONTENT_TYPE, "application/json"))
      .set_payload("{\"hours\": ")
      .to_request(),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], false);
  assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));
}
