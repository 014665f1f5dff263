// core/src/lib.rs

//! Market: domain library for a local services marketplace.
//!
//! Finders book providers for hourly jobs, providers advance those orders
//! through a role-gated status machine, both sides chat in direct threads,
//! and orders paid by KHQR are settled against a payment gateway.
//!
//! Everything persists through the [`store::Store`] document abstraction,
//! which the HTTP server backs with Postgres and tests back with
//! [`store::MemoryStore`].

pub mod auth;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod pagination;
pub mod payment;
pub mod pricing;
pub mod services;
pub mod storage;
pub mod store;
pub mod validation;

// --- Re-exports for the Public API ---

pub use crate::auth::{Caller, Role};
pub use crate::error::{MarketError, MarketResult};
pub use crate::lifecycle::Actor;
pub use crate::pagination::{Page, PageRequest, Pagination};
pub use crate::pricing::Quote;
pub use crate::services::chat::ChatMediaPolicy;
pub use crate::store::{DocumentStore, MemoryStore, Store, StoreError};
pub use crate::validation::Validate;
