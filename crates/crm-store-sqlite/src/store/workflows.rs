use chrono::Utc;
use crm_core::{
  store::{ListQuery, Page, WorkflowRepository},
  workflow::{Workflow, WorkflowInput},
};

use super::SqliteStore;
use crate::{
  Error, Result,
  encode::{RawWorkflow, WORKFLOW_COLUMNS, encode_dt, encode_json},
};

impl WorkflowRepository for SqliteStore {
  async fn list_workflows(&self, query: ListQuery) -> Result<Page<Workflow>> {
    let (raws, total) = self
      .page("workflows", WORKFLOW_COLUMNS, None, query, RawWorkflow::from_row)
      .await?;
    let items = raws.into_iter().map(RawWorkflow::into_workflow).collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  async fn get_workflow(&self, id: i64) -> Result<Option<Workflow>> {
    self
      .by_id("workflows", WORKFLOW_COLUMNS, id, RawWorkflow::from_row)
      .await?
      .map(RawWorkflow::into_workflow)
      .transpose()
  }

  async fn create_workflow(&self, input: WorkflowInput) -> Result<Workflow> {
    let now        = Utc::now();
    let now_str    = encode_dt(now);
    let conditions = encode_json(&input.conditions)?;
    let actions    = encode_json(&input.actions)?;
    let row        = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO workflows
             (name, description, entity_type, event, condition_type,
              conditions, actions, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            row.name,
            row.description,
            row.entity_type,
            row.event,
            row.condition_type,
            conditions,
            actions,
            now_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Workflow {
      id,
      name:           input.name,
      description:    input.description,
      entity_type:    input.entity_type,
      event:          input.event,
      condition_type: input.condition_type,
      conditions:     input.conditions,
      actions:        input.actions,
      created_at:     now,
      updated_at:     now,
    })
  }

  async fn update_workflow(&self, id: i64, input: WorkflowInput) -> Result<Option<Workflow>> {
    let now_str    = encode_dt(Utc::now());
    let conditions = encode_json(&input.conditions)?;
    let actions    = encode_json(&input.actions)?;

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE workflows
           SET name = ?2, description = ?3, entity_type = ?4, event = ?5,
               condition_type = ?6, conditions = ?7, actions = ?8, updated_at = ?9
           WHERE id = ?1",
          rusqlite::params![
            id,
            input.name,
            input.description,
            input.entity_type,
            input.event,
            input.condition_type,
            conditions,
            actions,
            now_str,
          ],
        )?)
      })
      .await?;

    if affected == 0 {
      return Ok(None);
    }
    self
      .get_workflow(id)
      .await?
      .ok_or(Error::Vanished { table: "workflows", id })
      .map(Some)
  }

  async fn delete_workflow(&self, id: i64) -> Result<bool> {
    self.delete_by_id("workflows", id).await
  }
}
