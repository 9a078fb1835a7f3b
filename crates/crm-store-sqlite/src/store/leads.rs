use chrono::Utc;
use crm_core::{
  lead::{Lead, NewLead, NewTag, Tag},
  store::LeadRepository,
};
use rusqlite::OptionalExtension as _;

use super::SqliteStore;
use crate::{
  Result,
  encode::{LEAD_COLUMNS, RawLead, RawTag, TAG_COLUMNS, encode_dt},
};

impl LeadRepository for SqliteStore {
  async fn create_lead(&self, input: NewLead) -> Result<Lead> {
    let now     = Utc::now();
    let now_str = encode_dt(now);
    let row     = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO leads
             (title, description, lead_value, person_id,
              lead_pipeline_id, lead_pipeline_stage_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![
            row.title,
            row.description,
            row.lead_value,
            row.person_id,
            row.lead_pipeline_id,
            row.lead_pipeline_stage_id,
            now_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Lead {
      id,
      title:                  input.title,
      description:            input.description,
      lead_value:             input.lead_value,
      person_id:              input.person_id,
      lead_pipeline_id:       input.lead_pipeline_id,
      lead_pipeline_stage_id: input.lead_pipeline_stage_id,
      tags:                   Vec::new(),
      created_at:             now,
      updated_at:             now,
    })
  }

  async fn get_lead(&self, id: i64) -> Result<Option<Lead>> {
    let found: Option<(RawLead, Vec<RawTag>)> = self
      .conn
      .call(move |conn| {
        let lead = conn
          .query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
            rusqlite::params![id],
            RawLead::from_row,
          )
          .optional()?;
        let Some(lead) = lead else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT t.id, t.name, t.color, t.created_at, t.updated_at
           FROM tags t
           JOIN lead_tags lt ON lt.tag_id = t.id
           WHERE lt.lead_id = ?1
           ORDER BY t.id",
        )?;
        let tags = stmt
          .query_map(rusqlite::params![id], RawTag::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((lead, tags)))
      })
      .await?;

    found.map(|(lead, tags)| lead.into_lead(tags)).transpose()
  }

  async fn attach_tag(&self, lead_id: i64, tag_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO lead_tags (lead_id, tag_id) VALUES (?1, ?2)",
          rusqlite::params![lead_id, tag_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn detach_tag(&self, lead_id: i64, tag_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM lead_tags WHERE lead_id = ?1 AND tag_id = ?2",
          rusqlite::params![lead_id, tag_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_tags(&self) -> Result<Vec<Tag>> {
    let raws: Vec<RawTag> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name"))?;
        let rows = stmt
          .query_map([], RawTag::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTag::into_tag).collect()
  }

  async fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
    self
      .by_id("tags", TAG_COLUMNS, id, RawTag::from_row)
      .await?
      .map(RawTag::into_tag)
      .transpose()
  }

  async fn create_tag(&self, input: NewTag) -> Result<Tag> {
    let now     = Utc::now();
    let now_str = encode_dt(now);
    let name    = input.name.clone();
    let color   = input.color.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tags (name, color, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
          rusqlite::params![name, color, now_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Tag {
      id,
      name:       input.name,
      color:      input.color,
      created_at: now,
      updated_at: now,
    })
  }
}
