// server/src/services/mod.rs

//! Adapters the server plugs into the domain library.

pub mod auth_service;
pub mod khqr_gateway;
pub mod payment_mock;
