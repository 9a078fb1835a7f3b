use std::collections::HashMap;

use chrono::Utc;
use crm_core::{
  email::{Attachment, Email, EmailPatch, Folder, NewAttachment, NewEmail},
  store::{EmailRepository, ListQuery, Page},
};

use super::SqliteStore;
use crate::{
  Error, Result,
  encode::{ATTACHMENT_COLUMNS, EMAIL_COLUMNS, RawAttachment, RawEmail, encode_dt, encode_json},
};

/// JSON-encoded list columns of an email row, prepared outside the
/// connection closure.
struct EncodedLists {
  folders:       String,
  reply_to:      String,
  cc:            String,
  bcc:           String,
  reference_ids: String,
}

impl EncodedLists {
  fn of(
    folders: &[Folder],
    reply_to: &[String],
    cc: &[String],
    bcc: &[String],
    reference_ids: &[String],
  ) -> Result<Self> {
    Ok(Self {
      folders:       encode_json(folders)?,
      reply_to:      encode_json(reply_to)?,
      cc:            encode_json(cc)?,
      bcc:           encode_json(bcc)?,
      reference_ids: encode_json(reference_ids)?,
    })
  }
}

impl SqliteStore {
  /// Attachments of the given emails, grouped by email id.
  async fn attachments_for(&self, email_ids: Vec<i64>) -> Result<HashMap<i64, Vec<RawAttachment>>> {
    if email_ids.is_empty() {
      return Ok(HashMap::new());
    }

    let raws: Vec<RawAttachment> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; email_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTACHMENT_COLUMNS} FROM email_attachments
           WHERE email_id IN ({placeholders})
           ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(email_ids.iter()), RawAttachment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut grouped: HashMap<i64, Vec<RawAttachment>> = HashMap::new();
    for raw in raws {
      grouped.entry(raw.email_id).or_default().push(raw);
    }
    Ok(grouped)
  }

  fn assemble(
    raws: Vec<RawEmail>,
    mut attachments: HashMap<i64, Vec<RawAttachment>>,
  ) -> Result<Vec<Email>> {
    raws
      .into_iter()
      .map(|raw| {
        let own = attachments.remove(&raw.id).unwrap_or_default();
        raw.into_email(own)
      })
      .collect()
  }
}

impl EmailRepository for SqliteStore {
  async fn list_emails(&self, query: ListQuery, folder: Option<Folder>) -> Result<Page<Email>> {
    // Folders are a JSON array of quoted lowercase names.
    let filter = folder.map(|f| ("folders LIKE ?1", format!("%\"{}\"%", f.as_str())));

    let (raws, total) = self
      .page("emails", EMAIL_COLUMNS, filter, query, RawEmail::from_row)
      .await?;
    let ids = raws.iter().map(|r| r.id).collect();
    let attachments = self.attachments_for(ids).await?;

    Ok(Page { items: Self::assemble(raws, attachments)?, total })
  }

  async fn get_email(&self, id: i64) -> Result<Option<Email>> {
    let Some(raw) = self
      .by_id("emails", EMAIL_COLUMNS, id, RawEmail::from_row)
      .await?
    else {
      return Ok(None);
    };
    let attachments = self.attachments_for(vec![id]).await?;
    Ok(Self::assemble(vec![raw], attachments)?.pop())
  }

  async fn create_email(&self, input: NewEmail) -> Result<Email> {
    let now     = Utc::now();
    let now_str = encode_dt(now);
    let lists   = EncodedLists::of(
      &input.folders,
      &input.reply_to,
      &input.cc,
      &input.bcc,
      &input.reference_ids,
    )?;
    let row = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO emails
             (subject, source, user_type, name, reply, is_read, folders, from_address,
              reply_to, cc, bcc, unique_id, message_id, reference_ids,
              person_id, lead_id, parent_id, user_id, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                   ?14, ?15, ?16, ?17, ?18, ?18)",
          rusqlite::params![
            row.subject,
            row.source,
            row.user_type,
            row.name,
            row.reply,
            lists.folders,
            row.from,
            lists.reply_to,
            lists.cc,
            lists.bcc,
            row.unique_id,
            row.message_id,
            lists.reference_ids,
            row.person_id,
            row.lead_id,
            row.parent_id,
            row.user_id,
            now_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Email {
      id,
      subject:       input.subject,
      source:        input.source,
      user_type:     input.user_type,
      name:          input.name,
      reply:         input.reply,
      is_read:       false,
      folders:       input.folders,
      from:          input.from,
      reply_to:      input.reply_to,
      cc:            input.cc,
      bcc:           input.bcc,
      unique_id:     input.unique_id,
      message_id:    input.message_id,
      reference_ids: input.reference_ids,
      person_id:     input.person_id,
      lead_id:       input.lead_id,
      parent_id:     input.parent_id,
      user_id:       input.user_id,
      attachments:   Vec::new(),
      created_at:    now,
      updated_at:    now,
    })
  }

  async fn update_email(&self, id: i64, patch: EmailPatch) -> Result<Option<Email>> {
    let Some(mut email) = self.get_email(id).await? else {
      return Ok(None);
    };

    if let Some(v) = patch.subject {
      email.subject = Some(v);
    }
    if let Some(v) = patch.reply {
      email.reply = v;
    }
    if let Some(v) = patch.is_read {
      email.is_read = v;
    }
    if let Some(v) = patch.folders {
      email.folders = v;
    }
    if let Some(v) = patch.reply_to {
      email.reply_to = v;
    }
    if let Some(v) = patch.cc {
      email.cc = v;
    }
    if let Some(v) = patch.bcc {
      email.bcc = v;
    }
    if patch.person_id.is_some() {
      email.person_id = patch.person_id;
    }
    if patch.lead_id.is_some() {
      email.lead_id = patch.lead_id;
    }
    email.updated_at = Utc::now();

    let lists = EncodedLists::of(
      &email.folders,
      &email.reply_to,
      &email.cc,
      &email.bcc,
      &email.reference_ids,
    )?;
    let now_str   = encode_dt(email.updated_at);
    let subject   = email.subject.clone();
    let reply     = email.reply.clone();
    let is_read   = email.is_read;
    let person_id = email.person_id;
    let lead_id   = email.lead_id;

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE emails
           SET subject = ?2, reply = ?3, is_read = ?4, folders = ?5, reply_to = ?6,
               cc = ?7, bcc = ?8, person_id = ?9, lead_id = ?10, updated_at = ?11
           WHERE id = ?1",
          rusqlite::params![
            id,
            subject,
            reply,
            is_read,
            lists.folders,
            lists.reply_to,
            lists.cc,
            lists.bcc,
            person_id,
            lead_id,
            now_str,
          ],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(Error::Vanished { table: "emails", id });
    }
    Ok(Some(email))
  }

  async fn delete_email(&self, id: i64) -> Result<bool> {
    self.delete_by_id("emails", id).await
  }

  async fn create_attachment(&self, input: NewAttachment) -> Result<Attachment> {
    let now     = Utc::now();
    let now_str = encode_dt(now);
    let row     = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO email_attachments (email_id, name, path, size, content_type, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![row.email_id, row.name, row.path, row.size, row.content_type, now_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Attachment {
      id,
      email_id:     input.email_id,
      name:         input.name,
      path:         input.path,
      size:         input.size,
      content_type: input.content_type,
      created_at:   now,
    })
  }

  async fn get_attachment(&self, id: i64) -> Result<Option<Attachment>> {
    self
      .by_id("email_attachments", ATTACHMENT_COLUMNS, id, RawAttachment::from_row)
      .await?
      .map(RawAttachment::into_attachment)
      .transpose()
  }
}
