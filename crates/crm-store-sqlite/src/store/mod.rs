//! [`SqliteStore`], the SQLite implementation of the CRM repositories.
//!
//! Each repository trait is implemented in its own submodule.

mod emails;
mod leads;
mod persons;
mod pipelines;
mod templates;
mod workflows;

use std::path::Path;

use chrono::Utc;
use crm_core::store::{ListQuery, Repository, SortOrder};
use rusqlite::Row;

use crate::{
  Result,
  encode::encode_dt,
  schema::{DEFAULT_PIPELINE_NAME, DEFAULT_STAGES, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A CRM store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Apply the schema and seed the default pipeline into an empty store.
  async fn init_schema(&self) -> Result<()> {
    let now = encode_dt(Utc::now());

    let seeded = self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;

        let pipelines: i64 =
          conn.query_row("SELECT COUNT(*) FROM lead_pipelines", [], |r| r.get(0))?;
        if pipelines > 0 {
          return Ok(false);
        }

        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO lead_pipelines (name, is_default, rotten_days, created_at, updated_at)
           VALUES (?1, 1, 30, ?2, ?2)",
          rusqlite::params![DEFAULT_PIPELINE_NAME, now],
        )?;
        let pipeline_id = tx.last_insert_rowid();
        for (order, (code, name, probability)) in DEFAULT_STAGES.iter().enumerate() {
          tx.execute(
            "INSERT INTO lead_pipeline_stages
               (lead_pipeline_id, code, name, probability, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![pipeline_id, code, name, probability, order as i64],
          )?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if seeded {
      tracing::info!("seeded empty store with {DEFAULT_PIPELINE_NAME:?}");
    }
    Ok(())
  }

  /// Fetch one page of `table`, ordered by id, plus the total row count.
  ///
  /// `filter` is an optional `(condition, argument)` pair whose condition
  /// refers to its argument as `?1`.
  async fn page<R, F>(
    &self,
    table:   &'static str,
    columns: &'static str,
    filter:  Option<(&'static str, String)>,
    query:   ListQuery,
    map:     F,
  ) -> Result<(Vec<R>, u64)>
  where
    R: Send + 'static,
    F: Fn(&Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    let order = match query.order {
      SortOrder::Asc => "ASC",
      SortOrder::Desc => "DESC",
    };

    let result = self
      .conn
      .call(move |conn| {
        let (where_clause, arg) = match filter {
          Some((cond, arg)) => (format!("WHERE {cond}"), Some(arg)),
          None => (String::new(), None),
        };
        let args: Vec<&dyn rusqlite::ToSql> = match &arg {
          Some(a) => vec![a as &dyn rusqlite::ToSql],
          None => vec![],
        };

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM {table} {where_clause}"),
          args.as_slice(),
          |r| r.get(0),
        )?;

        let sql = format!(
          "SELECT {columns} FROM {table} {where_clause}
           ORDER BY id {order}
           LIMIT {} OFFSET {}",
          query.limit, query.offset,
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(args.as_slice(), |row| map(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total as u64))
      })
      .await?;

    Ok(result)
  }

  /// Run a single-row `SELECT` by id.
  async fn by_id<R, F>(
    &self,
    table:   &'static str,
    columns: &'static str,
    id:      i64,
    map:     F,
  ) -> Result<Option<R>>
  where
    R: Send + 'static,
    F: Fn(&Row<'_>) -> rusqlite::Result<R> + Send + 'static,
  {
    use rusqlite::OptionalExtension as _;

    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {columns} FROM {table} WHERE id = ?1"),
              rusqlite::params![id],
              |row| map(row),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  /// Delete a row by id; `false` if it did not exist.
  async fn delete_by_id(&self, table: &'static str, id: i64) -> Result<bool> {
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("DELETE FROM {table} WHERE id = ?1"),
          rusqlite::params![id],
        )?)
      })
      .await?;
    Ok(affected > 0)
  }
}

impl Repository for SqliteStore {
  type Error = crate::Error;
}
