//! Handlers for `/contacts/persons` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contacts/persons` | Paginated listing |
//! | `GET`    | `/contacts/persons/search` | `?query=` name substring |
//! | `POST`   | `/contacts/persons` | Body: [`PersonBody`] |
//! | `GET`    | `/contacts/persons/:id` | 404 if not found |
//! | `PUT`    | `/contacts/persons/:id` | Body: [`PersonBody`] |
//! | `DELETE` | `/contacts/persons/:id` | |
//! | `POST`   | `/contacts/persons/mass-destroy` | Body: `{"indices":[..]}` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use crm_core::{
  events::{Action, LifecycleEvent, Resource},
  mail::MailTransport,
  person::{LabeledValue, Person, PersonInput},
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

// ─── Bodies ───────────────────────────────────────────────────────────────────

/// A submitted phone number. Entries without a value are discarded.
#[derive(Debug, Deserialize)]
pub struct ContactNumberBody {
  pub value: Option<String>,
  pub label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PersonBody {
  pub name:            Option<String>,
  #[serde(default)]
  pub emails:          Vec<LabeledValue>,
  pub contact_numbers: Option<Vec<ContactNumberBody>>,
  pub job_title:       Option<String>,
  pub organization_id: Option<i64>,
}

/// Drop numbers whose value is null, keeping the rest in submitted order.
pub fn sanitize_contact_numbers(numbers: Vec<ContactNumberBody>) -> Vec<LabeledValue> {
  numbers
    .into_iter()
    .filter_map(|n| {
      let value = n.value?;
      Some(LabeledValue::new(value, n.label.unwrap_or_else(|| "work".to_owned())))
    })
    .collect()
}

impl PersonBody {
  fn into_input(self) -> Result<PersonInput, ApiError> {
    let mut rules = Rules::new();
    let name = rules.required("name", self.name.as_deref()).map(str::to_owned);
    for (i, email) in self.emails.iter().enumerate() {
      rules.required(&format!("emails.{i}.value"), Some(email.value.as_str()));
    }
    let name = rules.finish_with(name)?;

    Ok(PersonInput {
      name,
      emails:          self.emails,
      contact_numbers: sanitize_contact_numbers(self.contact_numbers.unwrap_or_default()),
      job_title:       self.job_title,
      organization_id: self.organization_id,
    })
  }
}

/// Body of every mass operation.
#[derive(Debug, Default, Deserialize)]
pub struct MassDestroyBody {
  #[serde(default)]
  pub indices: Vec<i64>,
}

impl MassDestroyBody {
  pub(crate) fn validate(&self) -> Result<(), ApiError> {
    let mut rules = Rules::new();
    rules.non_empty("indices", &self.indices);
    rules.finish()
  }
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /contacts/persons[?limit=&offset=&order=]`
pub async fn list<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<ListParams>,
) -> Result<Listing<Person>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let query = params.query(state.config.page_size);
  let page = state.store.list_persons(query).await.map_err(ApiError::store)?;
  Ok(Listing::new(page, query))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub query: String,
}

/// `GET /contacts/persons/search?query=<term>`
pub async fn search<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<SearchParams>,
) -> Result<Envelope<Vec<Person>>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let persons = state
    .store
    .search_persons(params.query)
    .await
    .map_err(ApiError::store)?;
  Ok(Envelope::data(persons))
}

/// `GET /contacts/persons/:id`
pub async fn show<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Envelope<Person>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let person = state
    .store
    .get_person(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))?;
  Ok(Envelope::data(person))
}

// ─── Write ────────────────────────────────────────────────────────────────────

/// `POST /contacts/persons`
pub async fn store<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<PersonBody>,
) -> Result<Envelope<Person>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let input = body.into_input()?;

  state.events.dispatch(LifecycleEvent::before(Resource::Person, Action::Create, None));
  let person = state.store.create_person(input).await.map_err(ApiError::store)?;
  state.events.dispatch(LifecycleEvent::after(Resource::Person, Action::Create, person.id));

  Ok(Envelope::new(person, Message::PersonCreated))
}

/// `PUT /contacts/persons/:id`
pub async fn update<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
  Json(body): Json<PersonBody>,
) -> Result<Envelope<Person>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let input = body.into_input()?;

  state.events.dispatch(LifecycleEvent::before(Resource::Person, Action::Update, Some(id)));
  let person = state
    .store
    .update_person(id, input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))?;
  state.events.dispatch(LifecycleEvent::after(Resource::Person, Action::Update, id));

  Ok(Envelope::new(person, Message::PersonUpdated))
}

/// `DELETE /contacts/persons/:id`
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
    .get_person(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))?;

  state.events.dispatch(LifecycleEvent::before(Resource::Person, Action::Delete, Some(id)));
  state
    .store
    .delete_person(id)
    .await
    .map_err(ApiError::persistence(Message::PersonDestroyFailed))?;
  state.events.dispatch(LifecycleEvent::after(Resource::Person, Action::Delete, id));

  Ok(Envelope::message(Message::PersonDestroyed))
}

/// `POST /contacts/persons/mass-destroy`: ids that do not resolve are
/// skipped; the response reports success either way.
pub async fn mass_destroy<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<MassDestroyBody>,
) -> Result<Envelope<()>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  body.validate()?;

  for id in body.indices {
    if state.store.get_person(id).await.map_err(ApiError::store)?.is_none() {
      continue;
    }
    state.events.dispatch(LifecycleEvent::before(Resource::Person, Action::Delete, Some(id)));
    state.store.delete_person(id).await.map_err(ApiError::store)?;
    state.events.dispatch(LifecycleEvent::after(Resource::Person, Action::Delete, id));
  }

  Ok(Envelope::message(Message::PersonsMassDestroyed))
}
