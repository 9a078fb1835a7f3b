//! Leads and the tags attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entry in the tag catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub id:         i64,
  pub name:       String,
  pub color:      Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTag {
  pub name:  String,
  pub color: Option<String>,
}

/// A sales lead. Always positioned on a pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
  pub id:                     i64,
  pub title:                  String,
  pub description:            Option<String>,
  pub lead_value:             Option<f64>,
  pub person_id:              Option<i64>,
  pub lead_pipeline_id:       i64,
  pub lead_pipeline_stage_id: i64,
  pub tags:                   Vec<Tag>,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
}

impl Lead {
  /// Whether `tag_id` is already attached to this lead.
  pub fn has_tag(&self, tag_id: i64) -> bool {
    self.tags.iter().any(|t| t.id == tag_id)
  }
}

/// Input to [`crate::store::LeadRepository::create_lead`].
#[derive(Debug, Clone)]
pub struct NewLead {
  pub title:                  String,
  pub description:            Option<String>,
  pub lead_value:             Option<f64>,
  pub person_id:              Option<i64>,
  pub lead_pipeline_id:       i64,
  pub lead_pipeline_stage_id: i64,
}
