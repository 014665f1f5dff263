// core/src/models/mod.rs

//! Document shapes for every collection the services touch.
//!
//! Field names follow the stored camelCase keys. Each model carries its
//! document id in `id`, filled from the document path on read.

pub mod admin;
pub mod catalog;
pub mod chat;
pub mod order;
pub mod post;
pub mod profile;
pub mod promo;
pub mod user;

pub use admin::{AdminBroadcast, AdminRecord};
pub use catalog::{Category, ServiceItem};
pub use chat::{ChatMessage, ChatThread, ParticipantMeta};
pub use order::{
  AddressSnapshot, Order, OrderReview, OrderStatus, PaymentInfo, PaymentMethod, PaymentStatus, Pricing,
  ProviderSnapshot, StatusTimeline,
};
pub use post::{FinderPost, PostStatus, ProviderPost};
pub use profile::{FinderProfile, ProviderProfile, ProviderType};
pub use promo::{DiscountType, PromoCode};
pub use user::{Address, AppSettings, AuthAccount, HelpTicket, HelpTicketMessage, TicketStatus, UserProfile};

/// Collection names.
pub mod collections {
  pub const USERS: &str = "users";
  pub const FINDERS: &str = "finders";
  pub const PROVIDERS: &str = "providers";
  pub const CATEGORIES: &str = "categories";
  pub const SERVICES: &str = "services";
  pub const FINDER_POSTS: &str = "finderPosts";
  pub const PROVIDER_POSTS: &str = "providerPosts";
  pub const ORDERS: &str = "orders";
  pub const PROMO_CODES: &str = "promoCodes";
  pub const CHATS: &str = "chats";
  pub const MESSAGES: &str = "messages";
  pub const ADMINS: &str = "admins";
  pub const ADMIN_BROADCASTS: &str = "adminBroadcasts";
  pub const AUTH_ACCOUNTS: &str = "authAccounts";
  pub const APP: &str = "app";
  pub const SETTINGS_DOC: &str = "settings";
  pub const HELP_TICKETS: &str = "helpTickets";
  pub const ADDRESSES: &str = "addresses";
}
