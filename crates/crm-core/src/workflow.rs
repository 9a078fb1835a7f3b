//! Workflows: automation rules evaluated by the hosting application.
//!
//! This crate only stores them. `conditions` and `actions` are opaque JSON
//! documents owned by the workflow engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
  pub id:             i64,
  pub name:           String,
  pub description:    Option<String>,
  /// The entity the workflow watches, e.g. `"leads"`.
  pub entity_type:    String,
  /// The lifecycle event that triggers it, e.g. `"lead.create.after"`.
  pub event:          String,
  /// `"and"` or `"or"`.
  pub condition_type: String,
  pub conditions:     serde_json::Value,
  pub actions:        serde_json::Value,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WorkflowInput {
  pub name:           String,
  pub description:    Option<String>,
  pub entity_type:    String,
  pub event:          String,
  pub condition_type: String,
  pub conditions:     serde_json::Value,
  pub actions:        serde_json::Value,
}
