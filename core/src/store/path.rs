// core/src/store/path.rs

use std::fmt;

use super::StoreError;

/// Slash-separated path of a document: `collection/id[/subcollection/id]*`.
///
/// Collections and ids are validated on construction so a path can always
/// be split back into its parent collection and its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
  /// Builds the path of document `id` inside `collection`, where
  /// `collection` may itself be a nested collection path.
  pub fn new(collection: &str, id: &str) -> Result<Self, StoreError> {
    validate_collection(collection)?;
    validate_segment(id).map_err(|_| StoreError::InvalidPath(format!("{}/{}", collection, id)))?;
    Ok(DocPath(format!("{}/{}", collection, id)))
  }

  pub fn parse(raw: &str) -> Result<Self, StoreError> {
    let segments: Vec<&str> = raw.split('/').collect();
    if segments.len() < 2 || segments.len() % 2 != 0 || segments.iter().any(|s| validate_segment(s).is_err()) {
      return Err(StoreError::InvalidPath(raw.to_string()));
    }
    Ok(DocPath(raw.to_string()))
  }

  /// Path of document `id` in the subcollection `name` below this document.
  pub fn child(&self, name: &str, id: &str) -> Result<Self, StoreError> {
    DocPath::new(&format!("{}/{}", self.0, name), id)
  }

  /// Collection path below this document (`users/u1` + `addresses`).
  pub fn subcollection(&self, name: &str) -> Result<String, StoreError> {
    validate_segment(name).map_err(|_| StoreError::InvalidPath(format!("{}/{}", self.0, name)))?;
    Ok(format!("{}/{}", self.0, name))
  }

  pub fn id(&self) -> &str {
    self.0.rsplit_once('/').map(|(_, id)| id).unwrap_or(&self.0)
  }

  pub fn collection(&self) -> &str {
    self.0.rsplit_once('/').map(|(collection, _)| collection).unwrap_or("")
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for DocPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

fn validate_segment(segment: &str) -> Result<(), ()> {
  if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." {
    return Err(());
  }
  Ok(())
}

fn validate_collection(collection: &str) -> Result<(), StoreError> {
  let segments: Vec<&str> = collection.split('/').collect();
  if segments.len() % 2 != 1 || segments.iter().any(|s| validate_segment(s).is_err()) {
    return Err(StoreError::InvalidPath(collection.to_string()));
  }
  Ok(())
}

/// Location of a (possibly nested) field inside a document.
///
/// Segments are kept apart rather than joined with dots so map keys that
/// contain dots (user ids, e-mail addresses) address a single level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
  /// Parses a dotted path such as `statusTimeline.onTheWayAt`.
  pub fn parse(dotted: &str) -> Self {
    FieldPath(dotted.split('.').map(str::to_string).collect())
  }

  pub fn from_segments<I, S>(segments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    FieldPath(segments.into_iter().map(Into::into).collect())
  }

  pub fn segments(&self) -> &[String] {
    &self.0
  }
}

impl From<&str> for FieldPath {
  fn from(dotted: &str) -> Self {
    FieldPath::parse(dotted)
  }
}

impl fmt::Display for FieldPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0.join("."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nested_paths_split_into_collection_and_id() {
    let path = DocPath::new("users/u1/addresses", "a1").unwrap();
    assert_eq!(path.as_str(), "users/u1/addresses/a1");
    assert_eq!(path.collection(), "users/u1/addresses");
    assert_eq!(path.id(), "a1");
  }

  #[test]
  fn ids_with_slashes_are_rejected() {
    assert!(DocPath::new("orders", "a/b").is_err());
    assert!(DocPath::new("users/u1", "x").is_err());
    assert!(DocPath::parse("orders").is_err());
    assert!(DocPath::parse("chats/t1/messages/m1").is_ok());
  }

  #[test]
  fn field_path_keeps_dotted_keys_when_built_from_segments() {
    let fp = FieldPath::from_segments(["unread", "a.b@example.com"]);
    assert_eq!(fp.segments().len(), 2);
    assert_eq!(FieldPath::parse("statusTimeline.onTheWayAt").segments().len(), 2);
  }
}
