// server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod auth_handlers;
pub mod catalog_handlers;
pub mod chat_handlers;
pub mod file_handlers;
pub mod finder_handlers;
pub mod order_handlers;
pub mod payment_handlers;
pub mod post_handlers;
pub mod provider_handlers;
pub mod user_handlers;

use market::{PageRequest, Role};
use serde::Deserialize;

/// Every registered role.
pub(crate) const ANY_ROLE: &[Role] = &[Role::Finder, Role::Provider, Role::Admin];

/// `?page=&limit=` on offset-paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
  pub page: Option<usize>,
  pub limit: Option<usize>,
}

impl PageQuery {
  pub fn request(&self) -> PageRequest {
    PageRequest::new(self.page, self.limit)
  }
}

/// `?cursor=&limit=` on cursor-paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct CursorQuery {
  pub cursor: Option<String>,
  pub limit: Option<usize>,
}
