// core/src/services/payment.rs

//! KHQR generation and settlement checks for orders.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{load, now};
use crate::auth::Caller;
use crate::error::{MarketError, MarketResult};
use crate::models::{Order, PaymentMethod, PaymentStatus};
use crate::payment::{khqr, KhqrGateway, KhqrPayload, PaymentCheck};
use crate::services::order::order_path;
use crate::store::{FieldPath, FieldTransform, Precondition, Store, WriteBatch};
use crate::validation::{self, Validate};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
  pub order_id: String,
}

impl Validate for PaymentRequest {
  fn validate(&self) -> MarketResult<()> {
    validation::required("orderId", &self.order_id)
  }
}

/// What the payment endpoints hand back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KhqrStatus {
  pub order_id: String,
  pub status: PaymentStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub qr: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hash: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub merchant_ref: Option<String>,
  pub amount: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub transaction_id: Option<String>,
}

impl KhqrStatus {
  fn of(order: &Order) -> Self {
    KhqrStatus {
      order_id: order.id.clone(),
      status: order.payment.status,
      qr: order.payment.khqr.clone(),
      hash: order.payment.khqr_hash.clone(),
      merchant_ref: order.payment.merchant_ref.clone(),
      amount: order.pricing.total,
      transaction_id: order.payment.transaction_id.clone(),
    }
  }
}

fn merchant_ref(order_id: &str) -> String {
  let short: String = order_id.chars().take(12).collect();
  format!("ORD{}", short.to_ascii_uppercase())
}

/// Issues a fresh KHQR for an unpaid KHQR order owned by the caller.
#[instrument(name = "payment::generate_khqr", skip(store, gateway, caller), fields(uid = %caller.uid))]
pub async fn generate_khqr(
  store: &Store,
  gateway: &dyn KhqrGateway,
  caller: &Caller,
  order_id: &str,
) -> MarketResult<KhqrStatus> {
  let path = order_path(order_id)?;
  let mut order: Order = load(store, &path, "order").await?;
  if order.finder_uid != caller.uid {
    return Err(MarketError::forbidden("you can only pay for your own orders"));
  }
  if order.payment.method != PaymentMethod::Khqr {
    return Err(MarketError::validation("order is not paid by KHQR"));
  }
  if order.status.is_terminal() {
    return Err(MarketError::validation(format!("order is already {}", order.status)));
  }
  if order.payment.status == PaymentStatus::Paid {
    return Err(MarketError::validation("order is already paid"));
  }

  let at = now();
  let reference = merchant_ref(&order.id);
  let payload = khqr::encode(gateway.merchant(), order.pricing.total, &reference, at.timestamp_millis());

  order.payment.khqr = Some(payload.qr.clone());
  order.payment.khqr_hash = Some(payload.hash.clone());
  order.payment.merchant_ref = Some(payload.merchant_ref.clone());
  order.payment.status = PaymentStatus::Pending;
  order.updated_at = at;

  let mut batch = WriteBatch::new();
  batch.require(path.clone(), Precondition::Exists);
  batch.update(
    path,
    vec![
      (FieldPath::parse("payment.khqr"), FieldTransform::set(&payload.qr)?),
      (FieldPath::parse("payment.khqrHash"), FieldTransform::set(&payload.hash)?),
      (FieldPath::parse("payment.merchantRef"), FieldTransform::set(&payload.merchant_ref)?),
      (FieldPath::parse("payment.status"), FieldTransform::set(PaymentStatus::Pending)?),
      (FieldPath::parse("updatedAt"), FieldTransform::set(at)?),
    ],
  );
  store.commit(batch).await?;

  info!(order_id = %order.id, merchant_ref = %reference, amount = %payload.amount, "KHQR generated.");
  Ok(KhqrStatus::of(&order))
}

/// Asks the gateway whether the order's KHQR was paid and records the
/// settlement when it was.
#[instrument(name = "payment::check_khqr", skip(store, gateway, caller), fields(uid = %caller.uid))]
pub async fn check_khqr(
  store: &Store,
  gateway: &dyn KhqrGateway,
  caller: &Caller,
  order_id: &str,
) -> MarketResult<KhqrStatus> {
  let path = order_path(order_id)?;
  let mut order: Order = load(store, &path, "order").await?;
  if order.finder_uid != caller.uid && !order.is_assigned_to(&caller.uid) {
    return Err(MarketError::forbidden("you do not have access to this order"));
  }
  if order.payment.method != PaymentMethod::Khqr {
    return Err(MarketError::validation("order is not paid by KHQR"));
  }
  if order.payment.status == PaymentStatus::Paid {
    return Ok(KhqrStatus::of(&order));
  }

  let (qr, hash, reference) = match (&order.payment.khqr, &order.payment.khqr_hash, &order.payment.merchant_ref) {
    (Some(qr), Some(hash), Some(reference)) => (qr.clone(), hash.clone(), reference.clone()),
    _ => return Err(MarketError::validation("no KHQR has been generated for this order")),
  };
  let payload = KhqrPayload {
    qr,
    hash,
    merchant_ref: reference,
    amount: format!("{:.2}", order.pricing.total),
    currency: gateway.merchant().currency.clone(),
  };

  match gateway.check_status(&payload).await.map_err(MarketError::Payment)? {
    PaymentCheck::Unpaid => Ok(KhqrStatus::of(&order)),
    PaymentCheck::Paid { transaction_id } => {
      let at = now();
      order.payment.status = PaymentStatus::Paid;
      order.payment.transaction_id = Some(transaction_id.clone());
      order.payment.paid_at = Some(at);
      order.updated_at = at;

      let mut batch = WriteBatch::new();
      batch.require(path.clone(), Precondition::Exists);
      batch.update(
        path,
        vec![
          (FieldPath::parse("payment.status"), FieldTransform::set(PaymentStatus::Paid)?),
          (FieldPath::parse("payment.transactionId"), FieldTransform::set(&transaction_id)?),
          (FieldPath::parse("payment.paidAt"), FieldTransform::set(at)?),
          (FieldPath::parse("updatedAt"), FieldTransform::set(at)?),
        ],
      );
      store.commit(batch).await?;
      info!(order_id = %order.id, %transaction_id, "KHQR payment confirmed.");
      Ok(KhqrStatus::of(&order))
    }
  }
}
