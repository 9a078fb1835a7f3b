use std::collections::HashSet;

use chrono::Utc;
use crm_core::{
  pipeline::{Pipeline, PipelineInput, Stage},
  store::{ListQuery, Page, PipelineRepository},
};
use rusqlite::{OptionalExtension as _, Transaction};

use super::SqliteStore;
use crate::{
  Error, Result,
  encode::{PIPELINE_COLUMNS, RawPipeline, STAGE_COLUMNS, encode_dt, stage_from_row},
};

impl SqliteStore {
  /// Stages belonging to any of `pipeline_ids`.
  async fn stages_for(&self, pipeline_ids: Vec<i64>) -> Result<Vec<Stage>> {
    if pipeline_ids.is_empty() {
      return Ok(Vec::new());
    }

    let stages = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; pipeline_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT {STAGE_COLUMNS} FROM lead_pipeline_stages
           WHERE lead_pipeline_id IN ({placeholders})
           ORDER BY lead_pipeline_id, sort_order, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(pipeline_ids.iter()), stage_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(stages)
  }
}

fn clear_default_flags(tx: &Transaction<'_>, except: i64) -> rusqlite::Result<()> {
  tx.execute(
    "UPDATE lead_pipelines SET is_default = 0 WHERE id != ?1",
    rusqlite::params![except],
  )?;
  Ok(())
}

impl PipelineRepository for SqliteStore {
  async fn list_pipelines(&self, query: ListQuery) -> Result<Page<Pipeline>> {
    let (raws, total) = self
      .page("lead_pipelines", PIPELINE_COLUMNS, None, query, RawPipeline::from_row)
      .await?;
    let stages = self.stages_for(raws.iter().map(|r| r.id).collect()).await?;

    let items = raws
      .into_iter()
      .map(|raw| raw.into_pipeline(&stages))
      .collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  async fn get_pipeline(&self, id: i64) -> Result<Option<Pipeline>> {
    let Some(raw) = self
      .by_id("lead_pipelines", PIPELINE_COLUMNS, id, RawPipeline::from_row)
      .await?
    else {
      return Ok(None);
    };
    let stages = self.stages_for(vec![id]).await?;
    raw.into_pipeline(&stages).map(Some)
  }

  async fn default_pipeline(&self) -> Result<Option<Pipeline>> {
    let id: Option<i64> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT id FROM lead_pipelines WHERE is_default = 1 ORDER BY id LIMIT 1",
              [],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    match id {
      Some(id) => self.get_pipeline(id).await,
      None => Ok(None),
    }
  }

  async fn pipeline_name_taken(&self, name: String, except: Option<i64>) -> Result<bool> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM lead_pipelines WHERE name = ?1 AND (?2 IS NULL OR id != ?2)",
          rusqlite::params![name, except],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count > 0)
  }

  async fn create_pipeline(&self, input: PipelineInput) -> Result<Pipeline> {
    let now_str = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO lead_pipelines (name, is_default, rotten_days, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![input.name, input.is_default, input.rotten_days, now_str],
        )?;
        let id = tx.last_insert_rowid();

        if input.is_default {
          clear_default_flags(&tx, id)?;
        }
        for (order, stage) in input.stages.iter().enumerate() {
          tx.execute(
            "INSERT INTO lead_pipeline_stages
               (lead_pipeline_id, code, name, probability, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, stage.code, stage.name, stage.probability, order as i64],
          )?;
        }

        tx.commit()?;
        Ok(id)
      })
      .await?;

    self
      .get_pipeline(id)
      .await?
      .ok_or(Error::Vanished { table: "lead_pipelines", id })
  }

  async fn update_pipeline(&self, id: i64, input: PipelineInput) -> Result<Option<Pipeline>> {
    let now_str = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let current_default: Option<bool> = tx
          .query_row(
            "SELECT is_default FROM lead_pipelines WHERE id = ?1",
            rusqlite::params![id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(current_default) = current_default else {
          return Ok(false);
        };

        // The default flag can only be moved, never dropped.
        if input.is_default && !current_default {
          clear_default_flags(&tx, id)?;
        }
        tx.execute(
          "UPDATE lead_pipelines
           SET name = ?2, is_default = ?3, rotten_days = ?4, updated_at = ?5
           WHERE id = ?1",
          rusqlite::params![
            id,
            input.name,
            current_default || input.is_default,
            input.rotten_days,
            now_str,
          ],
        )?;

        let existing: HashSet<i64> = {
          let mut stmt =
            tx.prepare("SELECT id FROM lead_pipeline_stages WHERE lead_pipeline_id = ?1")?;
          stmt
            .query_map(rusqlite::params![id], |r| r.get(0))?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut kept = Vec::with_capacity(input.stages.len());
        for (order, stage) in input.stages.iter().enumerate() {
          match stage.id.filter(|sid| existing.contains(sid)) {
            Some(stage_id) => {
              tx.execute(
                "UPDATE lead_pipeline_stages
                 SET code = ?2, name = ?3, probability = ?4, sort_order = ?5
                 WHERE id = ?1",
                rusqlite::params![stage_id, stage.code, stage.name, stage.probability, order as i64],
              )?;
              kept.push(stage_id);
            }
            None => {
              tx.execute(
                "INSERT INTO lead_pipeline_stages
                   (lead_pipeline_id, code, name, probability, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, stage.code, stage.name, stage.probability, order as i64],
              )?;
              kept.push(tx.last_insert_rowid());
            }
          }
        }

        let removed: Vec<i64> = existing.into_iter().filter(|sid| !kept.contains(sid)).collect();
        for stage_id in removed {
          if let Some(first) = kept.first() {
            tx.execute(
              "UPDATE leads SET lead_pipeline_stage_id = ?2, updated_at = ?3
               WHERE lead_pipeline_stage_id = ?1",
              rusqlite::params![stage_id, first, now_str],
            )?;
          }
          tx.execute(
            "DELETE FROM lead_pipeline_stages WHERE id = ?1",
            rusqlite::params![stage_id],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !updated {
      return Ok(None);
    }
    self
      .get_pipeline(id)
      .await?
      .ok_or(Error::Vanished { table: "lead_pipelines", id })
      .map(Some)
  }

  async fn reassign_leads(&self, from: i64, to_pipeline: i64, to_stage: i64) -> Result<u64> {
    let now_str = encode_dt(Utc::now());

    let moved = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE leads
           SET lead_pipeline_id = ?2, lead_pipeline_stage_id = ?3, updated_at = ?4
           WHERE lead_pipeline_id = ?1",
          rusqlite::params![from, to_pipeline, to_stage, now_str],
        )?)
      })
      .await?;

    tracing::debug!(from, to_pipeline, to_stage, moved, "reassigned leads");
    Ok(moved as u64)
  }

  async fn delete_pipeline(&self, id: i64) -> Result<bool> {
    self.delete_by_id("lead_pipelines", id).await
  }
}
