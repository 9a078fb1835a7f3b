//! Handlers for `/mail` endpoints and the email lifecycle.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/mail` | Optional `?folder=draft\|outbox\|inbox\|sent\|trash` |
//! | `POST`   | `/mail` | Body: [`EmailBody`]; sends unless `is_draft` |
//! | `GET`    | `/mail/:id` | Email with attachments |
//! | `PUT`    | `/mail/:id` | Body: [`EmailUpdateBody`] |
//! | `DELETE` | `/mail/:id` | `?type=trash` trashes; anything else deletes |
//! | `POST`   | `/mail/mass-update` | Body: `{"indices":[..],"folders":[..]}` |
//! | `POST`   | `/mail/mass-destroy` | Body: `{"indices":[..]}`, `?type=` as above |
//! | `GET`    | `/mail/attachments/:id/download` | Raw file |
//!
//! Sending is fire-and-forget: a transport failure is logged and the email
//! stays in the outbox. Nothing retries it.

use axum::{
  Extension, Json,
  extract::{Path, Query, State},
  http::{HeaderValue, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use crm_core::{
  email::{self, Email, EmailPatch, Folder, MailboxState, NewEmail},
  events::{Action, LifecycleEvent, Resource},
  mail::MailTransport,
  store::{CrmStore, SortOrder},
};
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

use crate::{
  ApiState,
  auth::AdminUser,
  envelope::{Envelope, ListParams, Listing},
  error::ApiError,
  i18n::Message,
  persons::MassDestroyBody,
  storage::StorageError,
  validate::Rules,
};

async fn find_email<S: CrmStore>(store: &S, id: i64) -> Result<Option<Email>, ApiError> {
  store.get_email(id).await.map_err(ApiError::store)
}

/// Read a form-style flag: booleans, `0`/`1`, and the strings `""`, `"0"`,
/// `"false"` (false) or any other string (true). `null` counts as absent.
fn loose_flag<'de, D: Deserializer<'de>>(de: D) -> Result<Option<bool>, D::Error> {
  match Value::deserialize(de)? {
    Value::Null => Ok(None),
    Value::Bool(b) => Ok(Some(b)),
    Value::Number(n) => Ok(Some(n.as_f64().is_some_and(|n| n != 0.0))),
    Value::String(s) => Ok(Some(!matches!(s.as_str(), "" | "0" | "false"))),
    other => Err(D::Error::custom(format!("expected a flag, found {other}"))),
  }
}

fn not_found(id: i64) -> ApiError { ApiError::NotFound(format!("email {id} not found")) }

/// Hand `email` to the transport. On success the email is refiled under
/// inbox and sent and the refreshed record returned; on failure it is
/// returned unchanged.
async fn deliver<S, M>(state: &ApiState<S, M>, email: Email) -> Result<Email, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  match state.mailer.send(&email).await {
    Ok(sent) => {
      tracing::info!(email_id = email.id, message_id = %sent.message_id, "email sent");
      state
        .store
        .update_email(email.id, EmailPatch::folders(MailboxState::Delivered.folders()))
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| not_found(email.id))
    }
    Err(e) => {
      tracing::warn!(email_id = email.id, error = %e, "transport failed; email left in outbox");
      Ok(email)
    }
  }
}

// ─── Read ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EmailListParams {
  pub limit:  Option<u32>,
  pub offset: Option<u32>,
  pub order:  Option<SortOrder>,
  pub folder: Option<Folder>,
}

/// `GET /mail[?folder=&limit=&offset=&order=]`
pub async fn list<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<EmailListParams>,
) -> Result<Listing<Email>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let query = ListParams { limit: params.limit, offset: params.offset, order: params.order }
    .query(state.config.page_size);
  let page = state
    .store
    .list_emails(query, params.folder)
    .await
    .map_err(ApiError::store)?;
  Ok(Listing::new(page, query))
}

/// `GET /mail/:id`
pub async fn show<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Envelope<Email>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let email = find_email(state.store.as_ref(), id).await?.ok_or_else(|| not_found(id))?;
  Ok(Envelope::data(email))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EmailBody {
  pub subject:   Option<String>,
  pub reply:     Option<String>,
  #[serde(default)]
  pub reply_to:  Vec<String>,
  #[serde(default)]
  pub cc:        Vec<String>,
  #[serde(default)]
  pub bcc:       Vec<String>,
  pub person_id: Option<i64>,
  pub lead_id:   Option<i64>,
  pub parent_id: Option<i64>,
  #[serde(default, deserialize_with = "loose_flag")]
  pub is_draft:  Option<bool>,
}

/// `POST /mail`: a draft is only stored; anything else goes to the outbox
/// and is sent immediately.
pub async fn store<S, M>(
  State(state): State<ApiState<S, M>>,
  Extension(admin): Extension<AdminUser>,
  Json(body): Json<EmailBody>,
) -> Result<Envelope<Email>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let mut rules = Rules::new();
  rules.non_empty("reply_to", &body.reply_to);
  let reply = rules.required("reply", body.reply.as_deref()).map(str::to_owned);
  let reply = rules.finish_with(reply)?;

  let parent_refs = match body.parent_id {
    Some(parent_id) => {
      let parent = find_email(state.store.as_ref(), parent_id)
        .await?
        .ok_or_else(|| not_found(parent_id))?;
      Some(parent.reference_ids)
    }
    None => None,
  };

  let is_draft = body.is_draft.unwrap_or(false);
  let id = email::message_id(Utc::now(), &state.config.mail_domain);

  state.events.dispatch(LifecycleEvent::before(Resource::Email, Action::Create, None));
  let mut created = state
    .store
    .create_email(NewEmail {
      subject:       body.subject,
      source:        "web".to_owned(),
      user_type:     "admin".to_owned(),
      name:          Some(admin.name),
      reply,
      folders:       MailboxState::for_draft_flag(is_draft).folders(),
      from:          state.config.from_address.clone(),
      reply_to:      body.reply_to,
      cc:            body.cc,
      bcc:           body.bcc,
      reference_ids: email::reference_chain(parent_refs.as_deref(), &id),
      unique_id:     id.clone(),
      message_id:    id,
      person_id:     body.person_id,
      lead_id:       body.lead_id,
      parent_id:     body.parent_id,
      user_id:       Some(admin.id),
    })
    .await
    .map_err(ApiError::store)?;

  if !is_draft {
    created = deliver(&state, created).await?;
  }
  state.events.dispatch(LifecycleEvent::after(Resource::Email, Action::Create, created.id));

  let message = if is_draft { Message::MailSavedToDraft } else { Message::MailCreated };
  Ok(Envelope::new(created, message))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EmailUpdateBody {
  pub subject:   Option<String>,
  pub reply:     Option<String>,
  pub reply_to:  Option<Vec<String>>,
  pub cc:        Option<Vec<String>>,
  pub bcc:       Option<Vec<String>>,
  pub is_read:   Option<bool>,
  pub person_id: Option<i64>,
  pub lead_id:   Option<i64>,
  /// Explicit folders; overridden by `is_draft` when both are given.
  pub folders:   Option<Vec<Folder>>,
  /// `true` files the email as a draft, `false` sends it, absent leaves
  /// the folders alone.
  #[serde(default, deserialize_with = "loose_flag")]
  pub is_draft:  Option<bool>,
}

/// `PUT /mail/:id`
pub async fn update<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
  Json(body): Json<EmailUpdateBody>,
) -> Result<Envelope<Email>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let folders = body
    .is_draft
    .map(|d| MailboxState::for_draft_flag(d).folders())
    .or(body.folders);
  let patch = EmailPatch {
    subject: body.subject,
    reply: body.reply,
    is_read: body.is_read,
    folders,
    reply_to: body.reply_to,
    cc: body.cc,
    bcc: body.bcc,
    person_id: body.person_id,
    lead_id: body.lead_id,
  };

  state.events.dispatch(LifecycleEvent::before(Resource::Email, Action::Update, Some(id)));
  let mut updated = state
    .store
    .update_email(id, patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| not_found(id))?;
  state.events.dispatch(LifecycleEvent::after(Resource::Email, Action::Update, id));

  let message = match body.is_draft {
    Some(true) => Message::MailSavedToDraft,
    Some(false) => {
      updated = deliver(&state, updated).await?;
      Message::MailCreated
    }
    None => Message::MailUpdated,
  };
  Ok(Envelope::new(updated, message))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `?type=` of the delete endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteKind {
  /// Move to the trash folder; the record is kept.
  Trash,
  #[default]
  Delete,
}

impl DeleteKind {
  fn action(self) -> Action {
    match self {
      Self::Trash => Action::Trash,
      Self::Delete => Action::Delete,
    }
  }
}

/// Only `trash` is special; any other value removes the record.
impl<'de> Deserialize<'de> for DeleteKind {
  fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
    let kind = String::deserialize(de)?;
    Ok(if kind == "trash" { Self::Trash } else { Self::Delete })
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
  #[serde(rename = "type", default)]
  pub kind: DeleteKind,
}

/// Trash or remove one email, surrounded by its lifecycle events.
async fn remove<S, M>(state: &ApiState<S, M>, id: i64, kind: DeleteKind) -> Result<(), ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let action = kind.action();
  state.events.dispatch(LifecycleEvent::before(Resource::Email, action, Some(id)));
  match kind {
    DeleteKind::Trash => {
      state
        .store
        .update_email(id, EmailPatch::folders(MailboxState::Trash.folders()))
        .await
        .map_err(ApiError::persistence(Message::MailDeleteFailed))?;
    }
    DeleteKind::Delete => {
      state
        .store
        .delete_email(id)
        .await
        .map_err(ApiError::persistence(Message::MailDeleteFailed))?;
    }
  }
  state.events.dispatch(LifecycleEvent::after(Resource::Email, action, id));
  Ok(())
}

/// `DELETE /mail/:id[?type=trash|delete]`
pub async fn destroy<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
  Query(params): Query<DeleteParams>,
) -> Result<Envelope<()>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  find_email(state.store.as_ref(), id).await?.ok_or_else(|| not_found(id))?;
  remove(&state, id, params.kind).await?;
  Ok(Envelope::message(Message::MailDeleted))
}

// ─── Mass operations ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct MassUpdateBody {
  #[serde(default)]
  pub indices: Vec<i64>,
  #[serde(default)]
  pub folders: Vec<Folder>,
}

/// `POST /mail/mass-update`: refile every resolvable id; unknown ids are
/// skipped.
pub async fn mass_update<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<MassUpdateBody>,
) -> Result<Envelope<()>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let mut rules = Rules::new();
  rules.non_empty("indices", &body.indices);
  rules.non_empty("folders", &body.folders);
  rules.finish()?;

  for id in body.indices {
    if find_email(state.store.as_ref(), id).await?.is_none() {
      continue;
    }
    state.events.dispatch(LifecycleEvent::before(Resource::Email, Action::Update, Some(id)));
    state
      .store
      .update_email(id, EmailPatch::folders(body.folders.clone()))
      .await
      .map_err(ApiError::store)?;
    state.events.dispatch(LifecycleEvent::after(Resource::Email, Action::Update, id));
  }

  Ok(Envelope::message(Message::MailMassUpdated))
}

/// `POST /mail/mass-destroy[?type=trash|delete]`: unknown ids are skipped.
pub async fn mass_destroy<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<DeleteParams>,
  Json(body): Json<MassDestroyBody>,
) -> Result<Envelope<()>, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  body.validate()?;

  for id in body.indices {
    if find_email(state.store.as_ref(), id).await?.is_none() {
      continue;
    }
    remove(&state, id, params.kind).await?;
  }

  Ok(Envelope::message(Message::MailMassDestroyed))
}

// ─── Attachments ──────────────────────────────────────────────────────────────

/// `GET /mail/attachments/:id/download`
pub async fn download<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(id): Path<i64>,
) -> Result<Response, ApiError>
where
  S: CrmStore,
  M: MailTransport,
{
  let attachment = state
    .store
    .get_attachment(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("attachment {id} not found")))?;

  let bytes = state.storage.download(&attachment.path).await.map_err(|e| match e {
    StorageError::Missing(path) => ApiError::NotFound(format!("file {path} not found")),
    other => ApiError::store(other),
  })?;

  let content_type = attachment
    .content_type
    .as_deref()
    .and_then(|ct| HeaderValue::from_str(ct).ok())
    .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
  let disposition = HeaderValue::from_str(&format!(
    "attachment; filename=\"{}\"",
    attachment.name.replace('"', "")
  ))
  .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

  Ok(
    (
      [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
      bytes,
    )
      .into_response(),
  )
}
