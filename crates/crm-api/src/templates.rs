//! Handlers for `/settings/email-templates` endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use crm_core::{
  events::{Action, LifecycleEvent, Resource},
  mail::MailTransport,
  store::CrmStore,
  template::{EmailTemplate, EmailTemplateInput},
};
use serde::Deserialize;

use crate::{
  ApiState,
  envelope::{Envelope, ListParams, Listing},
  error::ApiError,
  i18n::Message,
  validate::Rules,
};

fn not_found(id: i64) -> ApiError { ApiError::NotFound(format!("email template {id} not found")) }

#[derive(Debug, Default, Deserialize)]
pub struct TemplateBody {
  pub name:    Option<String>,
  pub subject: Option<String>,
  pub content: Option<String>,
}

impl TemplateBody {
  fn into_input(self) -> Result<EmailTemplateInput, ApiError> {
    let mut rules = Rules::new();
    let name = rules.required("name", self.name.as_deref()).map(str::to_owned);
    let subject = rules.required("subject", self.subject.as_deref()).map(str::to_owned);
    let content = rules.required("content", self.content.as_deref()).map(str::to_owned);
    let ((name, subject), content) = rules.finish_with(name.zip(subject).zip(content))?;
    Ok(EmailTemplateInput { name, subject, content })
  }
}

/// `GET /settings/email-templates`
pub async fn list<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<ListParams>,
) -> Result<Listing<EmailTemplate>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let query = params.query(state.config.page_size);
  let page = state
    .store
    .list_email_templates(query)
    .await
    .map_err(ApiError::store)?;
  Ok(Listing::new(page, query))
}

/// `GET /settings/email-templates/:id`
pub async fn show<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Envelope<EmailTemplate>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let template = state
    .store
    .get_email_template(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Envelope::data(template))
}

/// `POST /settings/email-templates`
pub async fn store<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<TemplateBody>,
) -> Result<Envelope<EmailTemplate>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let input = body.into_input()?;

  state.events.dispatch(LifecycleEvent::before(Resource::EmailTemplate, Action::Create, None));
  let template = state
    .store
    .create_email_template(input)
    .await
    .map_err(ApiError::store)?;
  state
    .events
    .dispatch(LifecycleEvent::after(Resource::EmailTemplate, Action::Create, template.id));

  Ok(Envelope::new(template, Message::TemplateCreated))
}

/// `PUT /settings/email-templates/:id`
pub async fn update<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
  Json(body): Json<TemplateBody>,
) -> Result<Envelope<EmailTemplate>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let input = body.into_input()?;

  state
    .events
    .dispatch(LifecycleEvent::before(Resource::EmailTemplate, Action::Update, Some(id)));
  let template = state
    .store
    .update_email_template(id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  state.events.dispatch(LifecycleEvent::after(Resource::EmailTemplate, Action::Update, id));

  Ok(Envelope::new(template, Message::TemplateUpdated))
}

/// `DELETE /settings/email-templates/:id`
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
    .get_email_template(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;

  state
    .events
    .dispatch(LifecycleEvent::before(Resource::EmailTemplate, Action::Delete, Some(id)));
  state
    .store
    .delete_email_template(id)
    .await
    .map_err(ApiError::persistence(Message::TemplateDeleteFailed))?;
  state.events.dispatch(LifecycleEvent::after(Resource::EmailTemplate, Action::Delete, id));

  Ok(Envelope::message(Message::TemplateDeleted))
}
