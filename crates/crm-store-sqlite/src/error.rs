//! Error type for `crm-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row that was just written could not be read back.
  #[error("{table} row {id} vanished after write")]
  Vanished { table: &'static str, id: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
