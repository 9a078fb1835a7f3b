//! Error types for `crm-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("pipeline {0} has no stages")]
  PipelineWithoutStages(i64),

  #[error("no default pipeline is configured")]
  DefaultPipelineMissing,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
