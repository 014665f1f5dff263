// core/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MarketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Booked,
  OnTheWay,
  Started,
  Completed,
  Cancelled,
  Declined,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 6] = [
    OrderStatus::Booked,
    OrderStatus::OnTheWay,
    OrderStatus::Started,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
    OrderStatus::Declined,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Booked => "booked",
      OrderStatus::OnTheWay => "on_the_way",
      OrderStatus::Started => "started",
      OrderStatus::Completed => "completed",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Declined => "declined",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Declined
    )
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = MarketError;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == raw.trim())
      .ok_or_else(|| MarketError::validation(format!("unknown order status '{}'", raw)))
  }
}

/// When the order reached each status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTimeline {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub booked_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_the_way_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cancelled_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub declined_at: Option<DateTime<Utc>>,
}

impl StatusTimeline {
  /// Stored key of the timestamp recorded when `status` is reached.
  pub fn field_for(status: OrderStatus) -> &'static str {
    match status {
      OrderStatus::Booked => "bookedAt",
      OrderStatus::OnTheWay => "onTheWayAt",
      OrderStatus::Started => "startedAt",
      OrderStatus::Completed => "completedAt",
      OrderStatus::Cancelled => "cancelledAt",
      OrderStatus::Declined => "declinedAt",
    }
  }

  pub fn get(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
    match status {
      OrderStatus::Booked => self.booked_at,
      OrderStatus::OnTheWay => self.on_the_way_at,
      OrderStatus::Started => self.started_at,
      OrderStatus::Completed => self.completed_at,
      OrderStatus::Cancelled => self.cancelled_at,
      OrderStatus::Declined => self.declined_at,
    }
  }

  pub fn stamp(&mut self, status: OrderStatus, at: DateTime<Utc>) {
    let slot = match status {
      OrderStatus::Booked => &mut self.booked_at,
      OrderStatus::OnTheWay => &mut self.on_the_way_at,
      OrderStatus::Started => &mut self.started_at,
      OrderStatus::Completed => &mut self.completed_at,
      OrderStatus::Cancelled => &mut self.cancelled_at,
      OrderStatus::Declined => &mut self.declined_at,
    };
    *slot = Some(at);
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Cash,
  Card,
  /// QR-based instant payment; must be paid before a provider proceeds.
  Khqr,
}

impl FromStr for PaymentMethod {
  type Err = MarketError;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "cash" => Ok(PaymentMethod::Cash),
      "card" => Ok(PaymentMethod::Card),
      "khqr" => Ok(PaymentMethod::Khqr),
      other => Err(MarketError::validation(format!(
        "paymentMethod must be one of cash, card, khqr (got '{}')",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Unpaid,
  Pending,
  Paid,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
  pub method: PaymentMethod,
  pub status: PaymentStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub merchant_ref: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transaction_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub khqr: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub khqr_hash: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentInfo {
  pub fn new(method: PaymentMethod) -> Self {
    PaymentInfo {
      method,
      status: PaymentStatus::Unpaid,
      merchant_ref: None,
      transaction_id: None,
      khqr: None,
      khqr_hash: None,
      paid_at: None,
    }
  }

  /// KHQR orders must be paid; other methods settle outside the app and
  /// count as confirmed from booking on.
  pub fn is_confirmed(&self) -> bool {
    self.method != PaymentMethod::Khqr || self.status == PaymentStatus::Paid
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
  pub rate_per_hour: f64,
  pub subtotal: f64,
  pub discount: f64,
  pub processing_fee: f64,
  pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
  #[serde(default)]
  pub label: String,
  pub line1: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line2: Option<String>,
  pub city: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub province: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub latitude: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub longitude: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

/// Provider identity frozen onto the order at the last transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSnapshot {
  pub name: String,
  pub role_label: String,
  pub rating: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_name: Option<String>,
  pub max_workers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReview {
  pub rating: u8,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  #[serde(default)]
  pub id: String,
  pub finder_uid: String,
  #[serde(default)]
  pub finder_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provider_uid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provider: Option<ProviderSnapshot>,
  pub category_name: String,
  pub service_name: String,
  #[serde(default)]
  pub services: Vec<String>,
  pub address: AddressSnapshot,
  pub preferred_date: String,
  pub time_slot: String,
  pub hours: f64,
  pub workers: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  pub payment: PaymentInfo,
  pub pricing: Pricing,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub promo_code: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub review: Option<OrderReview>,
  pub status: OrderStatus,
  #[serde(default)]
  pub status_timeline: StatusTimeline,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn is_assigned_to(&self, provider_uid: &str) -> bool {
    self.provider_uid.as_deref() == Some(provider_uid)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statuses_use_snake_case_on_the_wire() {
    assert_eq!(serde_json::to_value(OrderStatus::OnTheWay).unwrap(), "on_the_way");
    assert_eq!("on_the_way".parse::<OrderStatus>().unwrap(), OrderStatus::OnTheWay);
    assert!("shipped".parse::<OrderStatus>().is_err());
  }

  #[test]
  fn only_final_statuses_are_terminal() {
    let terminal: Vec<_> = OrderStatus::ALL.into_iter().filter(OrderStatus::is_terminal).collect();
    assert_eq!(
      terminal,
      vec![OrderStatus::Completed, OrderStatus::Cancelled, OrderStatus::Declined]
    );
  }

  #[test]
  fn khqr_requires_paid_status() {
    let mut payment = PaymentInfo::new(PaymentMethod::Khqr);
    assert!(!payment.is_confirmed());
    payment.status = PaymentStatus::Paid;
    assert!(payment.is_confirmed());
    assert!(PaymentInfo::new(PaymentMethod::Cash).is_confirmed());
  }
}
