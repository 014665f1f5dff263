// core/src/payment/mod.rs

//! KHQR payment boundary.

pub mod khqr;

use async_trait::async_trait;
use serde::Serialize;

pub use khqr::{KhqrMerchant, KhqrPayload};

/// Result of asking the payment network about a generated KHQR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum PaymentCheck {
  Paid { transaction_id: String },
  Unpaid,
}

/// Talks to the KHQR network. Generation happens locally; status checks
/// are remote.
#[async_trait]
pub trait KhqrGateway: Send + Sync + 'static {
  fn merchant(&self) -> &KhqrMerchant;

  async fn check_status(&self, payload: &KhqrPayload) -> anyhow::Result<PaymentCheck>;
}
