// server/src/web/routes.rs

use actix_web::web;

use crate::web::extract::{json_error_handler, path_error_handler, query_error_handler};
use crate::web::handlers::{
  admin_handlers, auth_handlers, catalog_handlers, chat_handlers, file_handlers, finder_handlers, order_handlers,
  payment_handlers, post_handlers, provider_handlers, user_handlers,
};
use crate::web::response;

async fn health_check_handler() -> actix_web::HttpResponse {
  response::ok("OK", serde_json::json!({ "status": "ok" }))
}

/// Payload errors render as 400 envelopes instead of actix's plain text.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().limit(8 * 1024 * 1024).error_handler(json_error_handler))
    .app_data(web::QueryConfig::default().error_handler(query_error_handler))
    .app_data(web::PathConfig::default().error_handler(path_error_handler));
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  configure_extractors(cfg);
  cfg
    .route("/files/{path:.*}", web::get().to(file_handlers::serve_file_handler))
    .service(
      web::scope("/api")
        .route("/health", web::get().to(health_check_handler))
        .service(web::scope("/auth").route("/signin", web::post().to(auth_handlers::signin_handler)))
        .service(
          web::scope("/categories")
            .route("", web::get().to(catalog_handlers::list_categories_handler))
            .route("", web::post().to(catalog_handlers::create_category_handler))
            .route("/{id}", web::get().to(catalog_handlers::get_category_handler))
            .route("/{id}", web::put().to(catalog_handlers::update_category_handler)),
        )
        .service(
          web::scope("/services")
            .route("", web::get().to(catalog_handlers::list_services_handler))
            .route("", web::post().to(catalog_handlers::create_service_handler))
            .route("/{id}", web::get().to(catalog_handlers::get_service_handler)),
        )
        .service(
          web::scope("/users")
            .route("/register", web::post().to(user_handlers::register_handler))
            .route("/me", web::get().to(user_handlers::get_me_handler))
            .route("/me", web::put().to(user_handlers::update_me_handler))
            .route("/me/settings", web::get().to(user_handlers::get_settings_handler))
            .route("/me/settings", web::put().to(user_handlers::update_settings_handler))
            .route("/me/addresses", web::get().to(user_handlers::list_addresses_handler))
            .route("/me/addresses", web::post().to(user_handlers::add_address_handler))
            .route("/me/addresses/{id}", web::put().to(user_handlers::update_address_handler))
            .route("/me/addresses/{id}", web::delete().to(user_handlers::delete_address_handler))
            .route("/me/help-tickets", web::get().to(user_handlers::list_help_tickets_handler))
            .route("/me/help-tickets", web::post().to(user_handlers::create_help_ticket_handler))
            .route(
              "/me/help-tickets/{id}/messages",
              web::get().to(user_handlers::list_ticket_messages_handler),
            )
            .route(
              "/me/help-tickets/{id}/messages",
              web::post().to(user_handlers::add_ticket_message_handler),
            ),
        )
        .service(
          web::scope("/finders")
            .route("/me", web::get().to(finder_handlers::get_me_handler))
            .route("/me", web::put().to(finder_handlers::update_me_handler))
            .route("/{uid}", web::get().to(finder_handlers::get_finder_handler)),
        )
        .service(
          web::scope("/providers")
            .route("", web::get().to(provider_handlers::list_providers_handler))
            .route("/me", web::put().to(provider_handlers::update_me_handler))
            .route("/{uid}", web::get().to(provider_handlers::get_provider_handler))
            .route("/{uid}/reviews", web::get().to(provider_handlers::list_reviews_handler)),
        )
        .service(
          web::scope("/posts")
            .route("/finder", web::get().to(post_handlers::list_finder_posts_handler))
            .route("/finder", web::post().to(post_handlers::create_finder_post_handler))
            .route("/finder/{id}", web::delete().to(post_handlers::delete_finder_post_handler))
            .route("/provider", web::get().to(post_handlers::list_provider_posts_handler))
            .route("/provider", web::post().to(post_handlers::create_provider_post_handler))
            .route(
              "/provider/{id}/status",
              web::patch().to(post_handlers::set_provider_post_status_handler),
            )
            .route("/provider/{id}", web::delete().to(post_handlers::delete_provider_post_handler)),
        )
        .service(
          // Fixed segments are registered before `/{id}`.
          web::scope("/orders")
            .route("/quote", web::post().to(order_handlers::quote_handler))
            .route("", web::post().to(order_handlers::create_order_handler))
            .route("/finder", web::get().to(order_handlers::list_finder_orders_handler))
            .route("/provider", web::get().to(order_handlers::list_provider_orders_handler))
            .route("/available", web::get().to(order_handlers::list_available_orders_handler))
            .route("/{id}", web::get().to(order_handlers::get_order_handler))
            .route("/{id}/status", web::patch().to(order_handlers::update_status_handler))
            .route("/{id}/review", web::post().to(order_handlers::review_handler)),
        )
        .service(
          web::scope("/payments/khqr")
            .route("/generate", web::post().to(payment_handlers::generate_khqr_handler))
            .route("/check", web::post().to(payment_handlers::check_khqr_handler)),
        )
        .service(
          web::scope("/chats")
            .route("", web::get().to(chat_handlers::list_threads_handler))
            .route("/direct", web::post().to(chat_handlers::open_direct_handler))
            .route("/{id}/messages", web::get().to(chat_handlers::list_messages_handler))
            .route("/{id}/messages", web::post().to(chat_handlers::send_message_handler))
            .route("/{id}/read", web::post().to(chat_handlers::mark_read_handler)),
        )
        .service(
          web::scope("/admin")
            .route("/overview", web::get().to(admin_handlers::overview_handler))
            .route("/users", web::get().to(admin_handlers::list_users_handler))
            .route("/orders", web::get().to(admin_handlers::list_orders_handler))
            .route("/broadcasts", web::get().to(admin_handlers::list_broadcasts_handler))
            .route("/broadcasts", web::post().to(admin_handlers::create_broadcast_handler))
            .route("/promo-codes", web::get().to(admin_handlers::list_promo_codes_handler))
            .route("/promo-codes", web::post().to(admin_handlers::create_promo_code_handler)),
        ),
    );
}
