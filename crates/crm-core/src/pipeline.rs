//! Lead pipelines and their ordered stages.
//!
//! Exactly one pipeline is the default. Leads of a deleted pipeline are moved
//! to the default pipeline's first stage, so the default itself can never be
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
  pub id:               i64,
  pub lead_pipeline_id: i64,
  /// Machine name, e.g. `"won"`.
  pub code:             String,
  pub name:             String,
  /// Win probability in percent.
  pub probability:      u8,
  pub sort_order:       i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
  pub id:          i64,
  pub name:        String,
  pub is_default:  bool,
  /// Days without activity after which a lead counts as rotten.
  pub rotten_days: u32,
  /// Sorted by `sort_order`.
  pub stages:      Vec<Stage>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Pipeline {
  /// The stage new and reassigned leads land on.
  pub fn first_stage(&self) -> Result<&Stage> {
    self
      .stages
      .iter()
      .min_by_key(|s| s.sort_order)
      .ok_or(Error::PipelineWithoutStages(self.id))
  }
}

/// One stage in a [`PipelineInput`]. A stage with an `id` updates that stage;
/// one without is inserted.
#[derive(Debug, Clone)]
pub struct StageInput {
  pub id:          Option<i64>,
  pub code:        String,
  pub name:        String,
  pub probability: u8,
}

/// Input to [`crate::store::PipelineRepository::create_pipeline`] and
/// [`crate::store::PipelineRepository::update_pipeline`]. Stage order is the
/// order of `stages`.
#[derive(Debug, Clone)]
pub struct PipelineInput {
  pub name:        String,
  pub is_default:  bool,
  pub rotten_days: u32,
  pub stages:      Vec<StageInput>,
}
