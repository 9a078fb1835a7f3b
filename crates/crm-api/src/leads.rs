//! Handlers for `/leads` and the tag catalogue.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/leads` | Body: [`LeadBody`]; defaults to the default pipeline |
//! | `GET`    | `/leads/:id` | Lead with its tags |
//! | `POST`   | `/leads/:lead_id/tags` | Body: `{"id": <tag id>}`; idempotent |
//! | `DELETE` | `/leads/:lead_id/tags/:tag_id` | |
//! | `GET`    | `/settings/tags` | Tag catalogue |
//! | `POST`   | `/settings/tags` | Body: `{"name": "...", "color": "..."}` |

use axum::{
  Json,
  extract::{Path, State},
};
use crm_core::{
  events::{Action, LifecycleEvent, Resource},
  lead::{Lead, NewLead, NewTag, Tag},
  mail::MailTransport,
  store::CrmStore,
};
use serde::Deserialize;

use crate::{
  ApiState,
  envelope::Envelope,
  error::ApiError,
  i18n::Message,
  validate::Rules,
};

async fn find_lead<S: CrmStore>(store: &S, id: i64) -> Result<Lead, ApiError> {
  store
    .get_lead(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("lead {id} not found")))
}

// ─── Leads ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct LeadBody {
  pub title:                  Option<String>,
  pub description:            Option<String>,
  pub lead_value:             Option<f64>,
  pub person_id:              Option<i64>,
  pub lead_pipeline_id:       Option<i64>,
  pub lead_pipeline_stage_id: Option<i64>,
}

/// `POST /leads`
pub async fn store<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<LeadBody>,
) -> Result<Envelope<Lead>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let mut rules = Rules::new();
  let title = rules.required("title", body.title.as_deref()).map(str::to_owned);

  let pipeline = match body.lead_pipeline_id {
    Some(id) => state.store.get_pipeline(id).await.map_err(ApiError::store)?,
    None => Some(
      state
        .store
        .default_pipeline()
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::store(crm_core::Error::DefaultPipelineMissing))?,
    ),
  };
  rules.check(pipeline.is_some(), "lead_pipeline_id", "The selected pipeline is invalid.");

  let target = match pipeline {
    Some(p) => {
      let stage_id = match body.lead_pipeline_stage_id {
        Some(id) => p.stages.iter().any(|s| s.id == id).then_some(id),
        None => Some(p.first_stage().map_err(ApiError::store)?.id),
      };
      rules.check(stage_id.is_some(), "lead_pipeline_stage_id", "The selected stage is invalid.");
      stage_id.map(|stage_id| (p.id, stage_id))
    }
    None => None,
  };
  let (title, (pipeline_id, stage_id)) = rules.finish_with(title.zip(target))?;

  state.events.dispatch(LifecycleEvent::before(Resource::Lead, Action::Create, None));
  let lead = state
    .store
    .create_lead(NewLead {
      title,
      description:            body.description,
      lead_value:             body.lead_value,
      person_id:              body.person_id,
      lead_pipeline_id:       pipeline_id,
      lead_pipeline_stage_id: stage_id,
    })
    .await
    .map_err(ApiError::store)?;
  state.events.dispatch(LifecycleEvent::after(Resource::Lead, Action::Create, lead.id));

  Ok(Envelope::new(lead, Message::LeadCreated))
}

/// `GET /leads/:id`
pub async fn show<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Envelope<Lead>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  Ok(Envelope::data(find_lead(state.store.as_ref(), id).await?))
}

// ─── Lead tags ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TagRef {
  pub id: Option<i64>,
}

/// `POST /leads/:lead_id/tags`: attaching a tag the lead already carries
/// changes nothing.
pub async fn attach_tag<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(lead_id): Path<i64>,
  Json(body): Json<TagRef>,
) -> Result<Envelope<Lead>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let mut rules = Rules::new();
  rules.check(body.id.is_some(), "id", "The id field is required.");
  let tag_id = rules.finish_with(body.id)?;

  let lead = find_lead(state.store.as_ref(), lead_id).await?;
  state
    .store
    .get_tag(tag_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("tag {tag_id} not found")))?;

  state.events.dispatch(LifecycleEvent::before(Resource::LeadTag, Action::Create, Some(lead_id)));
  if !lead.has_tag(tag_id) {
    state.store.attach_tag(lead_id, tag_id).await.map_err(ApiError::store)?;
  }
  state.events.dispatch(LifecycleEvent::after(Resource::LeadTag, Action::Create, lead_id));

  let lead = find_lead(state.store.as_ref(), lead_id).await?;
  Ok(Envelope::new(lead, Message::TagAttached))
}

/// `DELETE /leads/:lead_id/tags/:tag_id`
pub async fn detach_tag<S, M>(
  State(state): State<ApiState<S, M>>,
  Path((lead_id, tag_id)): Path<(i64, i64)>,
) -> Result<Envelope<Lead>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  find_lead(state.store.as_ref(), lead_id).await?;

  state.events.dispatch(LifecycleEvent::before(Resource::LeadTag, Action::Delete, Some(lead_id)));
  state.store.detach_tag(lead_id, tag_id).await.map_err(ApiError::store)?;
  state.events.dispatch(LifecycleEvent::after(Resource::LeadTag, Action::Delete, lead_id));

  let lead = find_lead(state.store.as_ref(), lead_id).await?;
  Ok(Envelope::new(lead, Message::TagDetached))
}

// ─── Tag catalogue ───────────────────────────────────────────────────────────

/// `GET /settings/tags`
pub async fn list_tags<S, M>(
  State(state): State<ApiState<S, M>>,
) -> Result<Envelope<Vec<Tag>>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let tags = state.store.list_tags().await.map_err(ApiError::store)?;
  Ok(Envelope::data(tags))
}

#[derive(Debug, Deserialize)]
pub struct TagBody {
  pub name:  Option<String>,
  pub color: Option<String>,
}

/// `POST /settings/tags`
pub async fn create_tag<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<TagBody>,
) -> Result<Envelope<Tag>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let mut rules = Rules::new();
  let name = rules.required("name", body.name.as_deref()).map(str::to_owned);
  if let Some(name) = &name {
    let existing = state.store.list_tags().await.map_err(ApiError::store)?;
    let taken = existing.iter().any(|t| &t.name == name);
    rules.check(!taken, "name", "The name has already been taken.");
  }
  let name = rules.finish_with(name)?;

  state.events.dispatch(LifecycleEvent::before(Resource::Tag, Action::Create, None));
  let tag = state
    .store
    .create_tag(NewTag { name, color: body.color })
    .await
    .map_err(ApiError::store)?;
  state.events.dispatch(LifecycleEvent::after(Resource::Tag, Action::Create, tag.id));

  Ok(Envelope::new(tag, Message::TagCreated))
}
