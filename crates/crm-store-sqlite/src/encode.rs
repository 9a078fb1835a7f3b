//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. List-valued fields
//! (folders, addresses, contact numbers, workflow conditions) are stored as
//! compact JSON.

use chrono::{DateTime, Utc};
use crm_core::{
  email::{Attachment, Email},
  lead::{Lead, Tag},
  person::Person,
  pipeline::{Pipeline, Stage},
  template::EmailTemplate,
  workflow::Workflow,
};
use rusqlite::Row;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str = "id, name, emails, contact_numbers, job_title, \
                                  organization_id, created_at, updated_at";

/// Raw values read directly from a `persons` row.
pub struct RawPerson {
  pub id:              i64,
  pub name:            String,
  pub emails:          String,
  pub contact_numbers: String,
  pub job_title:       Option<String>,
  pub organization_id: Option<i64>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawPerson {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      name:            row.get(1)?,
      emails:          row.get(2)?,
      contact_numbers: row.get(3)?,
      job_title:       row.get(4)?,
      organization_id: row.get(5)?,
      created_at:      row.get(6)?,
      updated_at:      row.get(7)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:              self.id,
      name:            self.name,
      emails:          decode_json(&self.emails)?,
      contact_numbers: decode_json(&self.contact_numbers)?,
      job_title:       self.job_title,
      organization_id: self.organization_id,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub const TAG_COLUMNS: &str = "id, name, color, created_at, updated_at";

pub struct RawTag {
  pub id:         i64,
  pub name:       String,
  pub color:      Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

impl RawTag {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      color:      row.get(2)?,
      created_at: row.get(3)?,
      updated_at: row.get(4)?,
    })
  }

  pub fn into_tag(self) -> Result<Tag> {
    Ok(Tag {
      id:         self.id,
      name:       self.name,
      color:      self.color,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const LEAD_COLUMNS: &str = "id, title, description, lead_value, person_id, \
                                lead_pipeline_id, lead_pipeline_stage_id, \
                                created_at, updated_at";

pub struct RawLead {
  pub id:                     i64,
  pub title:                  String,
  pub description:            Option<String>,
  pub lead_value:             Option<f64>,
  pub person_id:              Option<i64>,
  pub lead_pipeline_id:       i64,
  pub lead_pipeline_stage_id: i64,
  pub created_at:             String,
  pub updated_at:             String,
}

impl RawLead {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                     row.get(0)?,
      title:                  row.get(1)?,
      description:            row.get(2)?,
      lead_value:             row.get(3)?,
      person_id:              row.get(4)?,
      lead_pipeline_id:       row.get(5)?,
      lead_pipeline_stage_id: row.get(6)?,
      created_at:             row.get(7)?,
      updated_at:             row.get(8)?,
    })
  }

  pub fn into_lead(self, tags: Vec<RawTag>) -> Result<Lead> {
    Ok(Lead {
      id:                     self.id,
      title:                  self.title,
      description:            self.description,
      lead_value:             self.lead_value,
      person_id:              self.person_id,
      lead_pipeline_id:       self.lead_pipeline_id,
      lead_pipeline_stage_id: self.lead_pipeline_stage_id,
      tags:                   tags.into_iter().map(RawTag::into_tag).collect::<Result<_>>()?,
      created_at:             decode_dt(&self.created_at)?,
      updated_at:             decode_dt(&self.updated_at)?,
    })
  }
}

pub const EMAIL_COLUMNS: &str = "id, subject, source, user_type, name, reply, is_read, \
                                 folders, from_address, reply_to, cc, bcc, unique_id, \
                                 message_id, reference_ids, person_id, lead_id, \
                                 parent_id, user_id, created_at, updated_at";

/// Raw values read directly from an `emails` row.
pub struct RawEmail {
  pub id:            i64,
  pub subject:       Option<String>,
  pub source:        String,
  pub user_type:     String,
  pub name:          Option<String>,
  pub reply:         String,
  pub is_read:       bool,
  pub folders:       String,
  pub from_address:  String,
  pub reply_to:      String,
  pub cc:            String,
  pub bcc:           String,
  pub unique_id:     String,
  pub message_id:    String,
  pub reference_ids: String,
  pub person_id:     Option<i64>,
  pub lead_id:       Option<i64>,
  pub parent_id:     Option<i64>,
  pub user_id:       Option<i64>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawEmail {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      subject:       row.get(1)?,
      source:        row.get(2)?,
      user_type:     row.get(3)?,
      name:          row.get(4)?,
      reply:         row.get(5)?,
      is_read:       row.get(6)?,
      folders:       row.get(7)?,
      from_address:  row.get(8)?,
      reply_to:      row.get(9)?,
      cc:            row.get(10)?,
      bcc:           row.get(11)?,
      unique_id:     row.get(12)?,
      message_id:    row.get(13)?,
      reference_ids: row.get(14)?,
      person_id:     row.get(15)?,
      lead_id:       row.get(16)?,
      parent_id:     row.get(17)?,
      user_id:       row.get(18)?,
      created_at:    row.get(19)?,
      updated_at:    row.get(20)?,
    })
  }

  pub fn into_email(self, attachments: Vec<RawAttachment>) -> Result<Email> {
    Ok(Email {
      id:            self.id,
      subject:       self.subject,
      source:        self.source,
      user_type:     self.user_type,
      name:          self.name,
      reply:         self.reply,
      is_read:       self.is_read,
      folders:       decode_json(&self.folders)?,
      from:          self.from_address,
      reply_to:      decode_json(&self.reply_to)?,
      cc:            decode_json(&self.cc)?,
      bcc:           decode_json(&self.bcc)?,
      unique_id:     self.unique_id,
      message_id:    self.message_id,
      reference_ids: decode_json(&self.reference_ids)?,
      person_id:     self.person_id,
      lead_id:       self.lead_id,
      parent_id:     self.parent_id,
      user_id:       self.user_id,
      attachments:   attachments
        .into_iter()
        .map(RawAttachment::into_attachment)
        .collect::<Result<_>>()?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const ATTACHMENT_COLUMNS: &str = "id, email_id, name, path, size, content_type, created_at";

pub struct RawAttachment {
  pub id:           i64,
  pub email_id:     i64,
  pub name:         String,
  pub path:         String,
  pub size:         Option<i64>,
  pub content_type: Option<String>,
  pub created_at:   String,
}

impl RawAttachment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      email_id:     row.get(1)?,
      name:         row.get(2)?,
      path:         row.get(3)?,
      size:         row.get(4)?,
      content_type: row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_attachment(self) -> Result<Attachment> {
    Ok(Attachment {
      id:           self.id,
      email_id:     self.email_id,
      name:         self.name,
      path:         self.path,
      size:         self.size,
      content_type: self.content_type,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const TEMPLATE_COLUMNS: &str = "id, name, subject, content, created_at, updated_at";

pub struct RawTemplate {
  pub id:         i64,
  pub name:       String,
  pub subject:    String,
  pub content:    String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawTemplate {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      subject:    row.get(2)?,
      content:    row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_template(self) -> Result<EmailTemplate> {
    Ok(EmailTemplate {
      id:         self.id,
      name:       self.name,
      subject:    self.subject,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const PIPELINE_COLUMNS: &str = "id, name, is_default, rotten_days, created_at, updated_at";

pub struct RawPipeline {
  pub id:          i64,
  pub name:        String,
  pub is_default:  bool,
  pub rotten_days: u32,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawPipeline {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      is_default:  row.get(2)?,
      rotten_days: row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  /// Assemble the pipeline from `stages`, which may include stages of other
  /// pipelines.
  pub fn into_pipeline(self, stages: &[Stage]) -> Result<Pipeline> {
    let mut own: Vec<Stage> = stages
      .iter()
      .filter(|s| s.lead_pipeline_id == self.id)
      .cloned()
      .collect();
    own.sort_by_key(|s| s.sort_order);

    Ok(Pipeline {
      id:          self.id,
      name:        self.name,
      is_default:  self.is_default,
      rotten_days: self.rotten_days,
      stages:      own,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const STAGE_COLUMNS: &str = "id, lead_pipeline_id, code, name, probability, sort_order";

pub fn stage_from_row(row: &Row<'_>) -> rusqlite::Result<Stage> {
  Ok(Stage {
    id:               row.get(0)?,
    lead_pipeline_id: row.get(1)?,
    code:             row.get(2)?,
    name:             row.get(3)?,
    probability:      row.get(4)?,
    sort_order:       row.get(5)?,
  })
}

pub const WORKFLOW_COLUMNS: &str = "id, name, description, entity_type, event, condition_type, \
                                    conditions, actions, created_at, updated_at";

pub struct RawWorkflow {
  pub id:             i64,
  pub name:           String,
  pub description:    Option<String>,
  pub entity_type:    String,
  pub event:          String,
  pub condition_type: String,
  pub conditions:     String,
  pub actions:        String,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawWorkflow {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      name:           row.get(1)?,
      description:    row.get(2)?,
      entity_type:    row.get(3)?,
      event:          row.get(4)?,
      condition_type: row.get(5)?,
      conditions:     row.get(6)?,
      actions:        row.get(7)?,
      created_at:     row.get(8)?,
      updated_at:     row.get(9)?,
    })
  }

  pub fn into_workflow(self) -> Result<Workflow> {
    Ok(Workflow {
      id:             self.id,
      name:           self.name,
      description:    self.description,
      entity_type:    self.entity_type,
      event:          self.event,
      condition_type: self.condition_type,
      conditions:     decode_json(&self.conditions)?,
      actions:        decode_json(&self.actions)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}
