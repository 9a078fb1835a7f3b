use chrono::Utc;
use crm_core::{
  store::{EmailTemplateRepository, ListQuery, Page},
  template::{EmailTemplate, EmailTemplateInput},
};

use super::SqliteStore;
use crate::{
  Error, Result,
  encode::{RawTemplate, TEMPLATE_COLUMNS, encode_dt},
};

impl EmailTemplateRepository for SqliteStore {
  async fn list_email_templates(&self, query: ListQuery) -> Result<Page<EmailTemplate>> {
    let (raws, total) = self
      .page("email_templates", TEMPLATE_COLUMNS, None, query, RawTemplate::from_row)
      .await?;
    let items = raws.into_iter().map(RawTemplate::into_template).collect::<Result<_>>()?;
    Ok(Page { items, total })
  }

  async fn get_email_template(&self, id: i64) -> Result<Option<EmailTemplate>> {
    self
      .by_id("email_templates", TEMPLATE_COLUMNS, id, RawTemplate::from_row)
      .await?
      .map(RawTemplate::into_template)
      .transpose()
  }

  async fn create_email_template(&self, input: EmailTemplateInput) -> Result<EmailTemplate> {
    let now     = Utc::now();
    let now_str = encode_dt(now);
    let row     = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO email_templates (name, subject, content, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![row.name, row.subject, row.content, now_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(EmailTemplate {
      id,
      name:       input.name,
      subject:    input.subject,
      content:    input.content,
      created_at: now,
      updated_at: now,
    })
  }

  async fn update_email_template(
    &self,
    id: i64,
    input: EmailTemplateInput,
  ) -> Result<Option<EmailTemplate>> {
    let now_str = encode_dt(Utc::now());

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE email_templates
           SET name = ?2, subject = ?3, content = ?4, updated_at = ?5
           WHERE id = ?1",
          rusqlite::params![id, input.name, input.subject, input.content, now_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Ok(None);
    }
    self
      .get_email_template(id)
      .await?
      .ok_or(Error::Vanished { table: "email_templates", id })
      .map(Some)
  }

  async fn delete_email_template(&self, id: i64) -> Result<bool> {
    self.delete_by_id("email_templates", id).await
  }
}
