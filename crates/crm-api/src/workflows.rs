//! Handlers for `/settings/workflows` endpoints.
//!
//! Conditions and actions are stored as given; only `name` is checked.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use crm_core::{
  events::{Action, LifecycleEvent, Resource},
  mail::MailTransport,
  store::CrmStore,
  workflow::{Workflow, WorkflowInput},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  ApiState,
  envelope::{Envelope, ListParams, Listing},
  error::ApiError,
  i18n::Message,
  validate::Rules,
};

fn not_found(id: i64) -> ApiError { ApiError::NotFound(format!("workflow {id} not found")) }

#[derive(Debug, Default, Deserialize)]
pub struct WorkflowBody {
  pub name:           Option<String>,
  pub description:    Option<String>,
  pub entity_type:    Option<String>,
  pub event:          Option<String>,
  pub condition_type: Option<String>,
  pub conditions:     Option<Value>,
  pub actions:        Option<Value>,
}

impl WorkflowBody {
  fn into_input(self) -> Result<WorkflowInput, ApiError> {
    let mut rules = Rules::new();
    let name = rules.required("name", self.name.as_deref()).map(str::to_owned);
    let name = rules.finish_with(name)?;

    Ok(WorkflowInput {
      name,
      description:    self.description,
      entity_type:    self.entity_type.unwrap_or_default(),
      event:          self.event.unwrap_or_default(),
      condition_type: self.condition_type.unwrap_or_else(|| "and".to_owned()),
      conditions:     self.conditions.unwrap_or_else(|| json!([])),
      actions:        self.actions.unwrap_or_else(|| json!([])),
    })
  }
}

/// `GET /settings/workflows`
pub async fn list<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<ListParams>,
) -> Result<Listing<Workflow>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let query = params.query(state.config.page_size);
  let page = state.store.list_workflows(query).await.map_err(ApiError::store)?;
  Ok(Listing::new(page, query))
}

/// `GET /settings/workflows/:id`
pub async fn show<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Envelope<Workflow>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let workflow = state
    .store
    .get_workflow(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Envelope::data(workflow))
}

/// `POST /settings/workflows`
pub async fn store<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<WorkflowBody>,
) -> Result<Envelope<Workflow>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let input = body.into_input()?;

  state.events.dispatch(LifecycleEvent::before(Resource::Workflow, Action::Create, None));
  let workflow = state.store.create_workflow(input).await.map_err(ApiError::store)?;
  state
    .events
    .dispatch(LifecycleEvent::after(Resource::Workflow, Action::Create, workflow.id));

  Ok(Envelope::new(workflow, Message::WorkflowCreated))
}

/// `PUT /settings/workflows/:id`
pub async fn update<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
  Json(body): Json<WorkflowBody>,
) -> Result<Envelope<Workflow>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let input = body.into_input()?;

  state.events.dispatch(LifecycleEvent::before(Resource::Workflow, Action::Update, Some(id)));
  let workflow = state
    .store
    .update_workflow(id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  state.events.dispatch(LifecycleEvent::after(Resource::Workflow, Action::Update, id));

  Ok(Envelope::new(workflow, Message::WorkflowUpdated))
}

/// `DELETE /settings/workflows/:id`
pub async fn destroy<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  state
    .store
    .get_workflow(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;

  state.events.dispatch(LifecycleEvent::before(Resource::Workflow, Action::Delete, Some(id)));
  state
    .store
    .delete_workflow(id)
    .await
    .map_err(ApiError::persistence(Message::WorkflowDeleteFailed))?;
  state.events.dispatch(LifecycleEvent::after(Resource::Workflow, Action::Delete, id));

  Ok(Envelope::message(Message::WorkflowDeleted))
}
