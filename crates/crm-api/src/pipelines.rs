//! Handlers for `/settings/pipelines` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/settings/pipelines` | Each with its ordered stages |
//! | `POST`   | `/settings/pipelines` | Body: [`PipelineBody`] |
//! | `GET`    | `/settings/pipelines/:id` | |
//! | `PUT`    | `/settings/pipelines/:id` | Replaces the stage list |
//! | `DELETE` | `/settings/pipelines/:id` | 400 for the default pipeline |
//!
//! Deleting a pipeline first moves its leads onto the default pipeline's
//! first stage. The move and the delete are separate store calls: if the
//! delete fails the leads stay on the default pipeline.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use crm_core::{
  events::{Action, LifecycleEvent, Resource},
  mail::MailTransport,
  pipeline::{Pipeline, PipelineInput, StageInput},
  store::CrmStore,
};
use serde::Deserialize;

use crate::{
  ApiState,
  envelope::{Envelope, ListParams, Listing},
  error::ApiError,
  i18n::Message,
  validate::Rules,
};

fn not_found(id: i64) -> ApiError { ApiError::NotFound(format!("pipeline {id} not found")) }

// ─── Bodies ───────────────────────────────────────────────────────────────────

fn default_rotten_days() -> i64 { 30 }

fn default_probability() -> i64 { 100 }

#[derive(Debug, Deserialize)]
pub struct StageBody {
  /// Present when updating an existing stage.
  pub id:          Option<i64>,
  pub code:        Option<String>,
  pub name:        Option<String>,
  #[serde(default = "default_probability")]
  pub probability: i64,
}

#[derive(Debug, Deserialize)]
pub struct PipelineBody {
  pub name:        Option<String>,
  #[serde(default)]
  pub is_default:  bool,
  #[serde(default = "default_rotten_days")]
  pub rotten_days: i64,
  #[serde(default)]
  pub stages:      Vec<StageBody>,
}

impl PipelineBody {
  /// Validate the body. `except` is the pipeline being updated, which may
  /// keep its own name.
  async fn into_input<S: CrmStore>(
    self,
    store: &S,
    except: Option<i64>,
  ) -> Result<PipelineInput, ApiError> {
    let mut rules = Rules::new();

    let name = rules.required("name", self.name.as_deref()).map(str::to_owned);
    if let Some(name) = &name {
      let taken = store
        .pipeline_name_taken(name.clone(), except)
        .await
        .map_err(ApiError::store)?;
      rules.check(!taken, "name", "The name has already been taken.");
    }

    let rotten_days = u32::try_from(self.rotten_days).ok().filter(|d| *d >= 1);
    rules.check(rotten_days.is_some(), "rotten_days", "The rotten days must be at least 1.");

    rules.non_empty("stages", &self.stages);
    let mut stages = Vec::with_capacity(self.stages.len());
    for (i, stage) in self.stages.iter().enumerate() {
      let code = rules.required(&format!("stages.{i}.code"), stage.code.as_deref());
      let name = rules.required(&format!("stages.{i}.name"), stage.name.as_deref());
      let probability = u8::try_from(stage.probability).ok().filter(|p| *p <= 100);
      rules.check(
        probability.is_some(),
        &format!("stages.{i}.probability"),
        "The probability must be between 0 and 100.",
      );
      if let (Some(code), Some(name), Some(probability)) = (code, name, probability) {
        stages.push(StageInput {
          id: stage.id,
          code: code.to_owned(),
          name: name.to_owned(),
          probability,
        });
      }
    }

    let (name, rotten_days) = rules.finish_with(name.zip(rotten_days))?;
    Ok(PipelineInput { name, is_default: self.is_default, rotten_days, stages })
  }
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /settings/pipelines`
pub async fn list<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<ListParams>,
) -> Result<Listing<Pipeline>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let query = params.query(state.config.page_size);
  let page = state.store.list_pipelines(query).await.map_err(ApiError::store)?;
  Ok(Listing::new(page, query))
}

/// `GET /settings/pipelines/:id`
pub async fn show<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Envelope<Pipeline>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let pipeline = state
    .store
    .get_pipeline(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Envelope::data(pipeline))
}

// ─── Write ────────────────────────────────────────────────────────────────────

/// `POST /settings/pipelines`
pub async fn store<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<PipelineBody>,
) -> Result<Envelope<Pipeline>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let input = body.into_input(state.store.as_ref(), None).await?;

  state.events.dispatch(LifecycleEvent::before(Resource::Pipeline, Action::Create, None));
  let pipeline = state.store.create_pipeline(input).await.map_err(ApiError::store)?;
  state
    .events
    .dispatch(LifecycleEvent::after(Resource::Pipeline, Action::Create, pipeline.id));

  Ok(Envelope::new(pipeline, Message::PipelineCreated))
}

/// `PUT /settings/pipelines/:id`
pub async fn update<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
  Json(body): Json<PipelineBody>,
) -> Result<Envelope<Pipeline>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let input = body.into_input(state.store.as_ref(), Some(id)).await?;

  state.events.dispatch(LifecycleEvent::before(Resource::Pipeline, Action::Update, Some(id)));
  let pipeline = state
    .store
    .update_pipeline(id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  state.events.dispatch(LifecycleEvent::after(Resource::Pipeline, Action::Update, id));

  Ok(Envelope::new(pipeline, Message::PipelineUpdated))
}

/// `DELETE /settings/pipelines/:id`
pub async fn destroy<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let pipeline = state
    .store
    .get_pipeline(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;

  if pipeline.is_default {
    return Err(ApiError::Rejected(Message::PipelineDefaultDeleteError));
  }

  let target = state
    .store
    .default_pipeline()
    .await
    .map_err(ApiError::cascade)?
    .ok_or_else(|| ApiError::cascade(crm_core::Error::DefaultPipelineMissing))?;
  let stage = target.first_stage().map_err(ApiError::cascade)?;
  let moved = state
    .store
    .reassign_leads(id, target.id, stage.id)
    .await
    .map_err(ApiError::cascade)?;
  tracing::info!(pipeline_id = id, to = target.id, moved, "leads reassigned to default pipeline");

  state.events.dispatch(LifecycleEvent::before(Resource::Pipeline, Action::Delete, Some(id)));
  let deleted = state
    .store
    .delete_pipeline(id)
    .await
    .map_err(ApiError::persistence(Message::PipelineDeleteFailed))?;
  if !deleted {
    return Err(not_found(id));
  }
  state.events.dispatch(LifecycleEvent::after(Resource::Pipeline, Action::Delete, id));

  Ok(Envelope::message(Message::PipelineDeleted))
}
