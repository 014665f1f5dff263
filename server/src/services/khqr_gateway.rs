// server/src/services/khqr_gateway.rs

//! KHQR status checks against the bank's HTTP API.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use market::payment::{KhqrGateway, KhqrMerchant, KhqrPayload, PaymentCheck};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
  hash: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
  response_code: i64,
  #[serde(default)]
  response_message: Option<String>,
  #[serde(default)]
  data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionData {
  #[serde(default)]
  hash: Option<String>,
  #[serde(default)]
  external_ref: Option<String>,
}

impl CheckResponse {
  fn into_check(self, payload: &KhqrPayload) -> PaymentCheck {
    match (self.response_code, self.data) {
      (0, Some(data)) => PaymentCheck::Paid {
        transaction_id: data
          .external_ref
          .or(data.hash)
          .unwrap_or_else(|| payload.hash.clone()),
      },
      _ => PaymentCheck::Unpaid,
    }
  }
}

pub struct HttpKhqrGateway {
  client: reqwest::Client,
  base_url: String,
  token: String,
  merchant: KhqrMerchant,
}

impl HttpKhqrGateway {
  /// Every status check is aborted after `timeout`.
  pub fn new(base_url: &str, token: &str, merchant: KhqrMerchant, timeout: Duration) -> anyhow::Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .context("building KHQR HTTP client")?;
    Ok(HttpKhqrGateway {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      token: token.to_string(),
      merchant,
    })
  }
}

#[async_trait]
impl KhqrGateway for HttpKhqrGateway {
  fn merchant(&self) -> &KhqrMerchant {
    &self.merchant
  }

  #[instrument(name = "khqr_http::check_status", skip(self, payload), fields(merchant_ref = %payload.merchant_ref))]
  async fn check_status(&self, payload: &KhqrPayload) -> anyhow::Result<PaymentCheck> {
    let url = format!("{}/v1/check_transaction_by_hash", self.base_url);
    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.token)
      .json(&CheckRequest { hash: &payload.hash })
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          anyhow!("KHQR status check timed out")
        } else {
          anyhow!("KHQR status check failed: {}", e)
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      warn!(%status, "KHQR API answered with an error status.");
      return Err(anyhow!("KHQR API returned HTTP {}", status));
    }
    let body: CheckResponse = response.json().await.context("decoding KHQR status response")?;
    debug!(code = body.response_code, message = ?body.response_message, "KHQR status received.");
    let check = body.into_check(payload);
    if let PaymentCheck::Paid { transaction_id } = &check {
      info!(%transaction_id, "KHQR reported as paid.");
    }
    Ok(check)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn payload() -> KhqrPayload {
    KhqrPayload {
      qr: "000201".into(),
      hash: "abc".into(),
      merchant_ref: "ORD1".into(),
      amount: "10.00".into(),
      currency: "USD".into(),
    }
  }

  #[test]
  fn successful_lookups_are_paid() {
    let body: CheckResponse =
      serde_json::from_str(r#"{"responseCode":0,"responseMessage":"Success","data":{"hash":"abc","externalRef":"TX-9"}}"#)
        .unwrap();
    assert_eq!(
      body.into_check(&payload()),
      PaymentCheck::Paid {
        transaction_id: "TX-9".into()
      }
    );
  }

  #[test]
  fn missing_transactions_are_unpaid() {
    let body: CheckResponse =
      serde_json::from_str(r#"{"responseCode":1,"responseMessage":"Transaction could not be found","data":null}"#)
        .unwrap();
    assert_eq!(body.into_check(&payload()), PaymentCheck::Unpaid);
  }
}
