// core/src/payment/khqr.rs

//! KHQR payload encoding (EMV merchant-presented QR, tag-length-value).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Merchant account the QR codes pay into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KhqrMerchant {
  pub account_id: String,
  pub merchant_name: String,
  pub merchant_city: String,
  /// `USD` or `KHR`.
  pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KhqrPayload {
  pub qr: String,
  /// SHA-256 hex digest of `qr`; the key status checks are made with.
  pub hash: String,
  pub merchant_ref: String,
  pub amount: String,
  pub currency: String,
}

fn tlv(out: &mut String, tag: &str, value: &str) {
  out.push_str(tag);
  out.push_str(&format!("{:02}", value.len()));
  out.push_str(value);
}

fn currency_code(currency: &str) -> &'static str {
  if currency.eq_ignore_ascii_case("KHR") {
    "116"
  } else {
    "840"
  }
}

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF), as used by EMV QR.
pub fn crc16(data: &[u8]) -> u16 {
  let mut crc: u16 = 0xFFFF;
  for byte in data {
    crc ^= u16::from(*byte) << 8;
    for _ in 0..8 {
      crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x1021 } else { crc << 1 };
    }
  }
  crc
}

fn truncate(value: &str, max: usize) -> String {
  value.chars().take(max).collect()
}

/// Builds a dynamic KHQR string for `amount` with `merchant_ref` as the bill number.
pub fn encode(merchant: &KhqrMerchant, amount: f64, merchant_ref: &str, timestamp_millis: i64) -> KhqrPayload {
  let amount = if merchant.currency.eq_ignore_ascii_case("KHR") {
    format!("{:.0}", amount)
  } else {
    format!("{:.2}", amount)
  };

  let mut account = String::new();
  tlv(&mut account, "00", &truncate(&merchant.account_id, 32));

  let mut additional = String::new();
  tlv(&mut additional, "01", &truncate(merchant_ref, 25));

  let mut timestamp = String::new();
  tlv(&mut timestamp, "00", &timestamp_millis.to_string());

  let mut qr = String::new();
  tlv(&mut qr, "00", "01");
  tlv(&mut qr, "01", "12");
  tlv(&mut qr, "29", &account);
  tlv(&mut qr, "52", "5999");
  tlv(&mut qr, "53", currency_code(&merchant.currency));
  tlv(&mut qr, "54", &amount);
  tlv(&mut qr, "58", "KH");
  tlv(&mut qr, "59", &truncate(&merchant.merchant_name, 25));
  tlv(&mut qr, "60", &truncate(&merchant.merchant_city, 15));
  tlv(&mut qr, "62", &additional);
  tlv(&mut qr, "99", &timestamp);
  qr.push_str("6304");
  let crc = crc16(qr.as_bytes());
  qr.push_str(&format!("{:04X}", crc));

  let hash = Sha256::digest(qr.as_bytes())
    .iter()
    .map(|b| format!("{:02x}", b))
    .collect::<String>();

  KhqrPayload {
    qr,
    hash,
    merchant_ref: merchant_ref.to_string(),
    amount,
    currency: merchant.currency.to_ascii_uppercase(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn merchant() -> KhqrMerchant {
    KhqrMerchant {
      account_id: "market@bank".into(),
      merchant_name: "Market".into(),
      merchant_city: "Phnom Penh".into(),
      currency: "USD".into(),
    }
  }

  #[test]
  fn crc_matches_reference_vector() {
    assert_eq!(crc16(b"123456789"), 0x29B1);
  }

  #[test]
  fn payload_carries_amount_reference_and_checksum() {
    let payload = encode(&merchant(), 32.4, "ORD123", 1_700_000_000_000);
    assert!(payload.qr.starts_with("000201010212"));
    assert!(payload.qr.contains("540532.40"));
    assert!(payload.qr.contains("5303840"));
    assert!(payload.qr.contains("0106ORD123"));
    let (body, crc) = payload.qr.split_at(payload.qr.len() - 4);
    assert!(body.ends_with("6304"));
    assert_eq!(crc, format!("{:04X}", crc16(body.as_bytes())));
    assert_eq!(payload.hash.len(), 64);
  }
}
