// core/src/storage.rs

//! Object storage boundary used for chat image uploads.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{MarketError, MarketResult};

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
  pub path: String,
  /// Long-lived signed URL clients can fetch the object from.
  pub url: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
  async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<StoredObject>;
}

/// An image received as `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUriImage {
  pub mime: String,
  pub bytes: Vec<u8>,
}

impl DataUriImage {
  pub fn parse(uri: &str) -> MarketResult<Self> {
    let rest = uri
      .trim()
      .strip_prefix("data:")
      .ok_or_else(|| MarketError::validation("image must be a data URI"))?;
    let (header, payload) = rest
      .split_once(',')
      .ok_or_else(|| MarketError::validation("image data URI is missing its payload"))?;
    let mime = header
      .strip_suffix(";base64")
      .ok_or_else(|| MarketError::validation("image data URI must be base64 encoded"))?
      .to_ascii_lowercase();
    if !mime.starts_with("image/") {
      return Err(MarketError::validation(format!("unsupported image type '{}'", mime)));
    }
    let bytes = STANDARD
      .decode(payload.trim())
      .map_err(|e| MarketError::validation(format!("image payload is not valid base64: {}", e)))?;
    if bytes.is_empty() {
      return Err(MarketError::validation("image payload is empty"));
    }
    Ok(DataUriImage { mime, bytes })
  }

  pub fn extension(&self) -> &str {
    match self.mime.as_str() {
      "image/jpeg" | "image/jpg" => "jpg",
      "image/png" => "png",
      "image/gif" => "gif",
      "image/webp" => "webp",
      "image/heic" => "heic",
      _ => "bin",
    }
  }
}

/// Keeps `[A-Za-z0-9._-]` of a client supplied file name.
pub fn sanitize_filename(name: &str) -> String {
  let cleaned: String = name
    .rsplit(['/', '\\'])
    .next()
    .unwrap_or_default()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .take(80)
    .collect();
  cleaned.trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_base64_png() {
    let image = DataUriImage::parse("data:image/png;base64,aGVsbG8=").unwrap();
    assert_eq!(image.mime, "image/png");
    assert_eq!(image.bytes, b"hello");
    assert_eq!(image.extension(), "png");
  }

  #[test]
  fn rejects_non_images_and_plain_urls() {
    assert!(DataUriImage::parse("https://example.com/a.png").is_err());
    assert!(DataUriImage::parse("data:text/plain;base64,aGVsbG8=").is_err());
    assert!(DataUriImage::parse("data:image/png,raw").is_err());
    assert!(DataUriImage::parse("data:image/png;base64,***").is_err());
  }

  #[test]
  fn filenames_lose_directories_and_odd_characters() {
    assert_eq!(sanitize_filename("../../etc/pass wd.png"), "pass_wd.png");
    assert_eq!(sanitize_filename("C:\\photos\\kitchen.jpg"), "kitchen.jpg");
  }
}
