//! Response envelopes shared by every handler.
//!
//! Single records: `{ "data": ..., "message": "..." }`, either field may be
//! absent. Listings: `{ "data": [...], "meta": { "total", "limit", "offset" } }`.

use axum::{
  Json,
  response::{IntoResponse, Response},
};
use crm_core::store::{ListQuery, Page, SortOrder};
use serde::{Deserialize, Serialize};

use crate::i18n::Message;

/// Upper bound on `?limit=`.
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<Message>,
}

impl<T> Envelope<T> {
  pub fn new(data: T, message: Message) -> Self {
    Self { data: Some(data), message: Some(message) }
  }

  pub fn data(data: T) -> Self {
    Self { data: Some(data), message: None }
  }
}

impl Envelope<()> {
  pub fn message(message: Message) -> Self {
    Self { data: None, message: Some(message) }
  }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
  fn into_response(self) -> Response { Json(self).into_response() }
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Meta {
  pub total:  u64,
  pub limit:  u32,
  pub offset: u32,
}

#[derive(Debug, Serialize)]
pub struct Listing<T> {
  pub data: Vec<T>,
  pub meta: Meta,
}

impl<T> Listing<T> {
  pub fn new(page: Page<T>, query: ListQuery) -> Self {
    Self {
      data: page.items,
      meta: Meta { total: page.total, limit: query.limit, offset: query.offset },
    }
  }
}

impl<T: Serialize> IntoResponse for Listing<T> {
  fn into_response(self) -> Response { Json(self).into_response() }
}

/// `?limit=&offset=&order=` accepted by every listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub limit:  Option<u32>,
  pub offset: Option<u32>,
  pub order:  Option<SortOrder>,
}

impl ListParams {
  /// Resolve against the configured default page size, capped at
  /// [`MAX_PAGE_SIZE`].
  pub fn query(&self, page_size: u32) -> ListQuery {
    ListQuery {
      limit:  self.limit.unwrap_or(page_size).clamp(1, MAX_PAGE_SIZE),
      offset: self.offset.unwrap_or(0),
      order:  self.order.unwrap_or_default(),
    }
  }
}
