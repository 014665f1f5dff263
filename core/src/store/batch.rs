// core/src/store/batch.rs

//! Buffered writes that a [`DocumentStore`](super::DocumentStore) commits as a unit.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::{DocPath, FieldPath, StoreError, StoreResult};

/// Change applied to a single field by an update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTransform {
  Set(Value),
  /// Server-side numeric add. A missing or non-numeric field counts as 0.
  Increment(Number),
  Delete,
  /// Appends the values not already present in the array field.
  ArrayUnion(Vec<Value>),
}

impl FieldTransform {
  pub fn set<T: Serialize>(value: T) -> StoreResult<Self> {
    Ok(FieldTransform::Set(serde_json::to_value(value).map_err(StoreError::Encode)?))
  }

  pub fn increment(by: i64) -> Self {
    FieldTransform::Increment(Number::from(by))
  }
}

/// Condition a document must satisfy for the batch to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
  Exists,
  Missing,
  /// The document exists and still carries this version.
  Version(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
  /// Replaces the whole document.
  Set { path: DocPath, data: Map<String, Value> },
  /// Applies field transforms, creating the document when it is missing.
  Update {
    path: DocPath,
    fields: Vec<(FieldPath, FieldTransform)>,
  },
  Delete { path: DocPath },
}

impl WriteOp {
  pub fn path(&self) -> &DocPath {
    match self {
      WriteOp::Set { path, .. } | WriteOp::Update { path, .. } | WriteOp::Delete { path } => path,
    }
  }
}

/// Ordered writes plus preconditions. Either every write lands or none does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
  pub preconditions: Vec<(DocPath, Precondition)>,
  pub ops: Vec<WriteOp>,
}

impl WriteBatch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }

  pub fn require(&mut self, path: DocPath, precondition: Precondition) -> &mut Self {
    self.preconditions.push((path, precondition));
    self
  }

  /// Queues a full replacement of `path` with the serialised `value`.
  /// `value` must serialise to a JSON object.
  pub fn set<T: Serialize + ?Sized>(&mut self, path: DocPath, value: &T) -> StoreResult<&mut Self> {
    let data = to_object(value)?;
    self.ops.push(WriteOp::Set { path, data });
    Ok(self)
  }

  pub fn update(&mut self, path: DocPath, fields: Vec<(FieldPath, FieldTransform)>) -> &mut Self {
    self.ops.push(WriteOp::Update { path, fields });
    self
  }

  pub fn delete(&mut self, path: DocPath) -> &mut Self {
    self.ops.push(WriteOp::Delete { path });
    self
  }
}

/// Serialises `value` into the object form documents are stored as.
pub fn to_object<T: Serialize + ?Sized>(value: &T) -> StoreResult<Map<String, Value>> {
  match serde_json::to_value(value).map_err(StoreError::Encode)? {
    Value::Object(map) => Ok(map),
    other => Err(StoreError::NotAnObject(other.to_string())),
  }
}

/// Checks `precondition` against the current version of a document
/// (`None` when the document does not exist).
pub fn check_precondition(path: &DocPath, precondition: Precondition, current: Option<u64>) -> StoreResult<()> {
  let reason = match (precondition, current) {
    (Precondition::Exists, None) => "document does not exist".to_string(),
    (Precondition::Missing, Some(_)) => "document already exists".to_string(),
    (Precondition::Version(expected), None) => format!("expected version {} but document is gone", expected),
    (Precondition::Version(expected), Some(actual)) if expected != actual => {
      format!("expected version {} but found {}", expected, actual)
    }
    _ => return Ok(()),
  };
  Err(StoreError::PreconditionFailed {
    path: path.to_string(),
    reason,
  })
}

/// Computes the document contents after `op`. `None` means deleted.
///
/// Both store backends funnel writes through here so transforms behave
/// identically regardless of where documents live.
pub fn apply_op(current: Option<Map<String, Value>>, op: &WriteOp) -> Option<Map<String, Value>> {
  match op {
    WriteOp::Set { data, .. } => Some(data.clone()),
    WriteOp::Delete { .. } => None,
    WriteOp::Update { fields, .. } => {
      let mut doc = current.unwrap_or_default();
      for (field, transform) in fields {
        apply_transform(&mut doc, field.segments(), transform);
      }
      Some(doc)
    }
  }
}

fn apply_transform(doc: &mut Map<String, Value>, segments: &[String], transform: &FieldTransform) {
  let Some((last, parents)) = segments.split_last() else {
    return;
  };

  let mut target = doc;
  for segment in parents {
    let entry = target
      .entry(segment.clone())
      .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
      *entry = Value::Object(Map::new());
    }
    target = match entry {
      Value::Object(map) => map,
      _ => return,
    };
  }

  match transform {
    FieldTransform::Set(value) => {
      target.insert(last.clone(), value.clone());
    }
    FieldTransform::Delete => {
      target.remove(last);
    }
    FieldTransform::Increment(by) => {
      let next = add_numbers(target.get(last), by);
      target.insert(last.clone(), Value::Number(next));
    }
    FieldTransform::ArrayUnion(values) => {
      let mut items = match target.remove(last) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
      };
      for value in values {
        if !items.contains(value) {
          items.push(value.clone());
        }
      }
      target.insert(last.clone(), Value::Array(items));
    }
  }
}

fn add_numbers(current: Option<&Value>, by: &Number) -> Number {
  let current = match current {
    Some(Value::Number(n)) => n.clone(),
    _ => Number::from(0),
  };
  if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
    if let Some(sum) = a.checked_add(b) {
      return Number::from(sum);
    }
  }
  let sum = current.as_f64().unwrap_or(0.0) + by.as_f64().unwrap_or(0.0);
  Number::from_f64(sum).unwrap_or_else(|| Number::from(0))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn path() -> DocPath {
    DocPath::new("chats", "a_b").unwrap()
  }

  fn object(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => unreachable!(),
    }
  }

  #[test]
  fn update_creates_nested_maps_and_increments() {
    let op = WriteOp::Update {
      path: path(),
      fields: vec![
        (FieldPath::from_segments(["unread", "b"]), FieldTransform::increment(1)),
        (FieldPath::parse("lastMessage"), FieldTransform::Set(json!("hi"))),
      ],
    };
    let doc = apply_op(None, &op).unwrap();
    assert_eq!(Value::Object(doc.clone()), json!({"unread": {"b": 1}, "lastMessage": "hi"}));

    let doc = apply_op(Some(doc), &op).unwrap();
    assert_eq!(doc["unread"]["b"], json!(2));
  }

  #[test]
  fn increment_keeps_floats_when_either_side_is_fractional() {
    let op = WriteOp::Update {
      path: path(),
      fields: vec![(FieldPath::parse("total"), FieldTransform::Increment(Number::from_f64(0.5).unwrap()))],
    };
    let doc = apply_op(Some(object(json!({"total": 2}))), &op).unwrap();
    assert_eq!(doc["total"].as_f64(), Some(2.5));
  }

  #[test]
  fn array_union_skips_existing_values() {
    let op = WriteOp::Update {
      path: path(),
      fields: vec![(
        FieldPath::parse("seenBy"),
        FieldTransform::ArrayUnion(vec![json!("a"), json!("b")]),
      )],
    };
    let doc = apply_op(Some(object(json!({"seenBy": ["a"]}))), &op).unwrap();
    assert_eq!(doc["seenBy"], json!(["a", "b"]));
  }

  #[test]
  fn preconditions_compare_versions() {
    let p = path();
    assert!(check_precondition(&p, Precondition::Missing, None).is_ok());
    assert!(check_precondition(&p, Precondition::Missing, Some(1)).is_err());
    assert!(check_precondition(&p, Precondition::Version(3), Some(3)).is_ok());
    assert!(check_precondition(&p, Precondition::Version(3), Some(4)).is_err());
    assert!(check_precondition(&p, Precondition::Exists, None).is_err());
  }
}
