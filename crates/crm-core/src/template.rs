//! Email templates used by workflows and the composer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
  pub id:         i64,
  pub name:       String,
  pub subject:    String,
  /// HTML body; may contain `{%placeholder%}` markers.
  pub content:    String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EmailTemplateInput {
  pub name:    String,
  pub subject: String,
  pub content: String,
}
