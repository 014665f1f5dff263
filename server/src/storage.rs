// server/src/storage.rs

//! Local-disk object storage with HMAC-signed download URLs.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use market::storage::{ObjectStorage, StoredObject};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;

/// Signs `/files/{path}?expires=..&sig=..` URLs.
#[derive(Clone)]
pub struct UrlSigner {
  secret: Vec<u8>,
  base_url: String,
  ttl: Duration,
}

impl UrlSigner {
  pub fn new(secret: &str, base_url: &str, ttl_days: i64) -> Self {
    UrlSigner {
      secret: secret.as_bytes().to_vec(),
      base_url: base_url.trim_end_matches('/').to_string(),
      ttl: Duration::days(ttl_days),
    }
  }

  fn mac(&self, path: &str, expires: i64) -> anyhow::Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| anyhow!("invalid signing key: {}", e))?;
    mac.update(path.as_bytes());
    mac.update(b"\n");
    mac.update(expires.to_string().as_bytes());
    Ok(mac)
  }

  pub fn sign(&self, path: &str) -> anyhow::Result<String> {
    let expires = (Utc::now() + self.ttl).timestamp();
    let sig = URL_SAFE_NO_PAD.encode(self.mac(path, expires)?.finalize().into_bytes());
    Ok(format!("{}/files/{}?expires={}&sig={}", self.base_url, path, expires, sig))
  }

  /// Whether `sig` was produced by [`UrlSigner::sign`] for `path` and has not expired.
  pub fn verify(&self, path: &str, expires: i64, sig: &str) -> bool {
    if expires < Utc::now().timestamp() {
      return false;
    }
    let Ok(raw) = URL_SAFE_NO_PAD.decode(sig) else {
      return false;
    };
    match self.mac(path, expires) {
      Ok(mac) => mac.verify_slice(&raw).is_ok(),
      Err(_) => false,
    }
  }
}

#[derive(Clone)]
pub struct LocalStorage {
  root: PathBuf,
  signer: UrlSigner,
}

impl LocalStorage {
  pub fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> Self {
    LocalStorage {
      root: root.into(),
      signer,
    }
  }

  pub fn signer(&self) -> &UrlSigner {
    &self.signer
  }

  /// Maps an object path onto the storage root, refusing anything that
  /// would step outside it.
  fn resolve(&self, object_path: &str) -> anyhow::Result<PathBuf> {
    let mut full = self.root.clone();
    for segment in object_path.split('/') {
      if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
        return Err(anyhow!("invalid object path '{}'", object_path));
      }
      full.push(segment);
    }
    Ok(full)
  }

  /// Reads a stored object; `None` when it does not exist.
  pub async fn read(&self, object_path: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let full = self.resolve(object_path)?;
    match tokio::fs::read(&full).await {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e).with_context(|| format!("reading {}", full.display())),
    }
  }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
  #[instrument(name = "storage::upload", skip(self, bytes), fields(size = bytes.len()))]
  async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<StoredObject> {
    let full = self.resolve(path)?;
    if let Some(parent) = full.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(&full, &bytes)
      .await
      .with_context(|| format!("writing {}", full.display()))?;
    debug!(path, content_type, "Stored object on disk.");
    Ok(StoredObject {
      path: path.to_string(),
      url: self.signer.sign(path)?,
    })
  }
}

/// Content type served for a stored object, from its extension.
pub fn content_type_for(path: &str) -> &'static str {
  let extension = Path::new(path)
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase());
  match extension.as_deref() {
    Some("jpg") | Some("jpeg") => "image/jpeg",
    Some("png") => "image/png",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    Some("heic") => "image/heic",
    _ => "application/octet-stream",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn signer() -> UrlSigner {
    UrlSigner::new("k", "http://localhost:8080/", 1)
  }

  fn query_value<'a>(url: &'a str, key: &str) -> &'a str {
    url
      .split(['?', '&'])
      .find_map(|pair| pair.strip_prefix(&format!("{}=", key)))
      .unwrap()
  }

  #[test]
  fn signed_urls_verify_only_for_their_path() {
    let url = signer().sign("chat_uploads/a_b/1_m_x.png").unwrap();
    assert!(url.starts_with("http://localhost:8080/files/chat_uploads/a_b/1_m_x.png?expires="));
    let expires: i64 = query_value(&url, "expires").parse().unwrap();
    let sig = query_value(&url, "sig");

    assert!(signer().verify("chat_uploads/a_b/1_m_x.png", expires, sig));
    assert!(!signer().verify("chat_uploads/a_b/other.png", expires, sig));
    assert!(!signer().verify("chat_uploads/a_b/1_m_x.png", expires + 1, sig));
    assert!(!UrlSigner::new("other", "http://localhost:8080", 1).verify("chat_uploads/a_b/1_m_x.png", expires, sig));
  }

  #[test]
  fn expired_signatures_fail() {
    let s = signer();
    let expires = Utc::now().timestamp() - 10;
    let sig = URL_SAFE_NO_PAD.encode(s.mac("p/x", expires).unwrap().finalize().into_bytes());
    assert!(!s.verify("p/x", expires, &sig));
  }

  #[test]
  fn paths_cannot_escape_the_root() {
    let storage = LocalStorage::new("/tmp/market-test", signer());
    assert!(storage.resolve("../etc/passwd").is_err());
    assert!(storage.resolve("a//b").is_err());
    assert_eq!(
      storage.resolve("chat_uploads/t/f.png").unwrap(),
      PathBuf::from("/tmp/market-test/chat_uploads/t/f.png")
    );
  }

  #[test]
  fn content_types_follow_extensions() {
    assert_eq!(content_type_for("a/b.PNG"), "image/png");
    assert_eq!(content_type_for("a/b"), "application/octet-stream");
  }
}
