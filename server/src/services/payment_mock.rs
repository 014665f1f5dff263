// server/src/services/payment_mock.rs

//! Stand-in KHQR gateway for local deployments without bank API credentials.

use async_trait::async_trait;
use market::payment::{KhqrGateway, KhqrMerchant, KhqrPayload, PaymentCheck};
use tracing::{info, instrument};
use uuid::Uuid;

/// Reports every checked KHQR as paid.
pub struct MockKhqrGateway {
  merchant: KhqrMerchant,
}

impl MockKhqrGateway {
  pub fn new(merchant: KhqrMerchant) -> Self {
    MockKhqrGateway { merchant }
  }
}

#[async_trait]
impl KhqrGateway for MockKhqrGateway {
  fn merchant(&self) -> &KhqrMerchant {
    &self.merchant
  }

  #[instrument(name = "khqr_mock::check_status", skip(self, payload), fields(merchant_ref = %payload.merchant_ref))]
  async fn check_status(&self, payload: &KhqrPayload) -> anyhow::Result<PaymentCheck> {
    tokio::time::sleep(std::time::Duration::from_millis(20)).await; // Simulate network latency
    let transaction_id = format!("mock_txn_{}", Uuid::new_v4().simple());
    info!(%transaction_id, amount = %payload.amount, "Simulated KHQR settlement.");
    Ok(PaymentCheck::Paid { transaction_id })
  }
}
