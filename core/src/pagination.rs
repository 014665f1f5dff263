// core/src/pagination.rs

//! Offset and cursor pagination over in-memory result sets.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;

/// Requested slice; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
  pub page: usize,
  pub limit: usize,
}

impl PageRequest {
  /// Normalises raw query values: page ≥ 1, limit in `1..=MAX_LIMIT`.
  pub fn new(page: Option<usize>, limit: Option<usize>) -> Self {
    PageRequest {
      page: page.unwrap_or(1).max(1),
      limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    }
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    PageRequest::new(None, None)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Pagination {
  Offset(OffsetPagination),
  Cursor(CursorPagination),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetPagination {
  pub page: usize,
  pub limit: usize,
  pub total: usize,
  pub total_pages: usize,
  pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPagination {
  pub limit: usize,
  pub next_cursor: Option<String>,
  pub has_more: bool,
}

/// `{data, pagination?}` result of a listing service call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
  pub data: Vec<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
  pub fn unpaginated(data: Vec<T>) -> Self {
    Page { data, pagination: None }
  }

  pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
    Page {
      data: self.data.into_iter().map(f).collect(),
      pagination: self.pagination,
    }
  }
}

/// Slices `items` by page number.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
  let total = items.len();
  let total_pages = if total == 0 { 0 } else { total.div_ceil(request.limit) };
  let start = (request.page - 1).saturating_mul(request.limit);
  let data: Vec<T> = items.into_iter().skip(start).take(request.limit).collect();
  let has_more = start + data.len() < total;
  Page {
    data,
    pagination: Some(Pagination::Offset(OffsetPagination {
      page: request.page,
      limit: request.limit,
      total,
      total_pages,
      has_more,
    })),
  }
}

/// Returns the `limit` items following the item whose id equals `cursor`.
///
/// An unknown cursor restarts from the beginning rather than failing, since
/// the item it pointed to may have dropped out of the scan window.
pub fn paginate_after<T, F>(items: Vec<T>, cursor: Option<&str>, limit: Option<usize>, id_of: F) -> Page<T>
where
  F: Fn(&T) -> &str,
{
  let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
  let start = cursor
    .and_then(|cursor| items.iter().position(|item| id_of(item) == cursor))
    .map(|index| index + 1)
    .unwrap_or(0);
  let remaining = items.len().saturating_sub(start);
  let data: Vec<T> = items.into_iter().skip(start).take(limit).collect();
  let has_more = remaining > data.len();
  let next_cursor = if has_more {
    data.last().map(|item| id_of(item).to_string())
  } else {
    None
  };
  Page {
    data,
    pagination: Some(Pagination::Cursor(CursorPagination {
      limit,
      next_cursor,
      has_more,
    })),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn offset_pages_report_totals() {
    let page = paginate((1..=45).collect::<Vec<_>>(), PageRequest::new(Some(3), Some(20)));
    assert_eq!(page.data, (41..=45).collect::<Vec<_>>());
    match page.pagination.unwrap() {
      Pagination::Offset(p) => {
        assert_eq!(p.total, 45);
        assert_eq!(p.total_pages, 3);
        assert!(!p.has_more);
      }
      other => panic!("unexpected pagination {:?}", other),
    }
  }

  #[test]
  fn page_past_the_end_is_empty() {
    let page = paginate(vec![1, 2, 3], PageRequest::new(Some(5), Some(2)));
    assert!(page.data.is_empty());
  }

  #[test]
  fn limits_are_clamped() {
    assert_eq!(PageRequest::new(Some(0), Some(10_000)), PageRequest { page: 1, limit: MAX_LIMIT });
    assert_eq!(PageRequest::new(None, Some(0)).limit, 1);
  }

  #[test]
  fn cursor_walks_forward_and_stops() {
    let items: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
    let first = paginate_after(items.clone(), None, Some(2), |s| s.as_str());
    assert_eq!(first.data, vec!["a", "b"]);
    let cursor = match first.pagination.unwrap() {
      Pagination::Cursor(c) => c.next_cursor.unwrap(),
      other => panic!("unexpected pagination {:?}", other),
    };
    assert_eq!(cursor, "b");

    let last = paginate_after(items, Some("d"), Some(2), |s| s.as_str());
    assert_eq!(last.data, vec!["e"]);
    match last.pagination.unwrap() {
      Pagination::Cursor(c) => {
        assert!(!c.has_more);
        assert!(c.next_cursor.is_none());
      }
      other => panic!("unexpected pagination {:?}", other),
    }
  }
}
