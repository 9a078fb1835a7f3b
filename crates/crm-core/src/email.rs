//! Emails, their folder placement, and attachments.
//!
//! An email moves through a small set of mailbox states:
//!
//! ```text
//!   draft ──(is_draft = false)──▶ outbox ──(transport ok)──▶ inbox + sent
//!     ▲                             │
//!     └──────(is_draft = true)──────┘
//!   any ──(type = trash)──▶ trash        any ──(type = delete)──▶ removed
//! ```
//!
//! A failed transport leaves the email in the outbox; nothing retries it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Folders ─────────────────────────────────────────────────────────────────

/// A folder an email can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
  Draft,
  Outbox,
  Inbox,
  Sent,
  Trash,
}

impl Folder {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Outbox => "outbox",
      Self::Inbox => "inbox",
      Self::Sent => "sent",
      Self::Trash => "trash",
    }
  }
}

/// The recognised combinations of folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxState {
  Draft,
  Outbox,
  /// Handed to the transport successfully; filed under both inbox and sent.
  Delivered,
  Trash,
}

impl MailboxState {
  pub fn folders(self) -> Vec<Folder> {
    match self {
      Self::Draft => vec![Folder::Draft],
      Self::Outbox => vec![Folder::Outbox],
      Self::Delivered => vec![Folder::Inbox, Folder::Sent],
      Self::Trash => vec![Folder::Trash],
    }
  }

  /// The state requested by an explicit `is_draft` flag.
  pub fn for_draft_flag(is_draft: bool) -> Self {
    if is_draft { Self::Draft } else { Self::Outbox }
  }
}

// ─── Message identifiers ─────────────────────────────────────────────────────

/// Build the `unique_id` / `message_id` for an email created at `at`.
///
/// Only second resolution: two emails created within the same second share
/// an id. The column carries no uniqueness constraint for that reason.
pub fn message_id(at: DateTime<Utc>, domain: &str) -> String {
  format!("{}@{}", at.timestamp(), domain)
}

/// Extend a parent's thread chain with a new message id.
pub fn reference_chain(parent: Option<&[String]>, id: &str) -> Vec<String> {
  let mut chain = parent.map(<[String]>::to_vec).unwrap_or_default();
  chain.push(id.to_owned());
  chain
}

// ─── Attachment ──────────────────────────────────────────────────────────────

/// A file attached to an email. The bytes live in file storage under `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
  pub id:           i64,
  pub email_id:     i64,
  pub name:         String,
  /// Path relative to the configured storage directory.
  pub path:         String,
  pub size:         Option<i64>,
  pub content_type: Option<String>,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
  pub email_id:     i64,
  pub name:         String,
  pub path:         String,
  pub size:         Option<i64>,
  pub content_type: Option<String>,
}

// ─── Email ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
  pub id:            i64,
  pub subject:       Option<String>,
  /// Where the email came from; `"web"` for emails composed in the panel.
  pub source:        String,
  pub user_type:     String,
  /// Display name of the author.
  pub name:          Option<String>,
  /// HTML body.
  pub reply:         String,
  pub is_read:       bool,
  pub folders:       Vec<Folder>,
  pub from:          String,
  pub reply_to:      Vec<String>,
  pub cc:            Vec<String>,
  pub bcc:           Vec<String>,
  pub unique_id:     String,
  pub message_id:    String,
  /// Thread chain, oldest first. Append-only.
  pub reference_ids: Vec<String>,
  pub person_id:     Option<i64>,
  pub lead_id:       Option<i64>,
  pub parent_id:     Option<i64>,
  pub user_id:       Option<i64>,
  pub attachments:   Vec<Attachment>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::EmailRepository::create_email`]. Every field is
/// decided by the caller, including the server-assigned ones.
#[derive(Debug, Clone)]
pub struct NewEmail {
  pub subject:       Option<String>,
  pub source:        String,
  pub user_type:     String,
  pub name:          Option<String>,
  pub reply:         String,
  pub folders:       Vec<Folder>,
  pub from:          String,
  pub reply_to:      Vec<String>,
  pub cc:            Vec<String>,
  pub bcc:           Vec<String>,
  pub unique_id:     String,
  pub message_id:    String,
  pub reference_ids: Vec<String>,
  pub person_id:     Option<i64>,
  pub lead_id:       Option<i64>,
  pub parent_id:     Option<i64>,
  pub user_id:       Option<i64>,
}

/// A partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct EmailPatch {
  pub subject:   Option<String>,
  pub reply:     Option<String>,
  pub is_read:   Option<bool>,
  pub folders:   Option<Vec<Folder>>,
  pub reply_to:  Option<Vec<String>>,
  pub cc:        Option<Vec<String>>,
  pub bcc:       Option<Vec<String>>,
  pub person_id: Option<i64>,
  pub lead_id:   Option<i64>,
}

impl EmailPatch {
  pub fn folders(folders: Vec<Folder>) -> Self {
    Self { folders: Some(folders), ..Self::default() }
  }
}
