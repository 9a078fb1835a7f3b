//! JSON REST API for the CRM admin panel.
//!
//! Exposes an axum [`Router`] backed by any [`CrmStore`] and
//! [`MailTransport`]. Every route requires HTTP Basic auth. TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", crm_api::api_router(state))
//! ```

pub mod auth;
pub mod emails;
pub mod envelope;
pub mod error;
pub mod events;
pub mod i18n;
pub mod leads;
pub mod persons;
pub mod pipelines;
pub mod storage;
pub mod templates;
pub mod validate;
pub mod workflows;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router, middleware,
  routing::{get, post},
};
use crm_core::{mail::MailTransport, store::CrmStore};

pub use error::ApiError;

use auth::AuthConfig;
use events::EventBus;
use storage::LocalStorage;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Settings the handlers need at request time.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Right-hand side of generated message ids.
  pub mail_domain:  String,
  /// `From` address of composed emails.
  pub from_address: String,
  /// Default `limit` of listings.
  pub page_size:    u32,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, M> {
  pub store:   Arc<S>,
  pub mailer:  Arc<M>,
  pub events:  EventBus,
  pub auth:    Arc<AuthConfig>,
  pub storage: Arc<LocalStorage>,
  pub config:  Arc<ApiConfig>,
}

// Manual impl: `S` and `M` themselves need not be `Clone`.
impl<S, M> Clone for ApiState<S, M> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      mailer:  self.mailer.clone(),
      events:  self.events.clone(),
      auth:    self.auth.clone(),
      storage: self.storage.clone(),
      config:  self.config.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, M>(state: ApiState<S, M>) -> Router<()>
where
  S: CrmStore + 'static,
  M: MailTransport + 'static,
{
  Router::new()
    // Contacts
    .route("/contacts/persons", get(persons::list::<S, M>).post(persons::store::<S, M>))
    .route("/contacts/persons/search", get(persons::search::<S, M>))
    .route("/contacts/persons/mass-destroy", post(persons::mass_destroy::<S, M>))
    .route(
      "/contacts/persons/{id}",
      get(persons::show::<S, M>)
        .put(persons::update::<S, M>)
        .delete(persons::destroy::<S, M>),
    )
    // Leads and tags
    .route("/leads", post(leads::store::<S, M>))
    .route("/leads/{id}", get(leads::show::<S, M>))
    .route("/leads/{lead_id}/tags", post(leads::attach_tag::<S, M>))
    .route("/leads/{lead_id}/tags/{tag_id}", axum::routing::delete(leads::detach_tag::<S, M>))
    .route("/settings/tags", get(leads::list_tags::<S, M>).post(leads::create_tag::<S, M>))
    // Mail
    .route("/mail", get(emails::list::<S, M>).post(emails::store::<S, M>))
    .route("/mail/mass-update", post(emails::mass_update::<S, M>))
    .route("/mail/mass-destroy", post(emails::mass_destroy::<S, M>))
    .route("/mail/attachments/{id}/download", get(emails::download::<S, M>))
    .route(
      "/mail/{id}",
      get(emails::show::<S, M>)
        .put(emails::update::<S, M>)
        .delete(emails::destroy::<S, M>),
    )
    // Settings
    .route(
      "/settings/email-templates",
      get(templates::list::<S, M>).post(templates::store::<S, M>),
    )
    .route(
      "/settings/email-templates/{id}",
      get(templates::show::<S, M>)
        .put(templates::update::<S, M>)
        .delete(templates::destroy::<S, M>),
    )
    .route(
      "/settings/pipelines",
      get(pipelines::list::<S, M>).post(pipelines::store::<S, M>),
    )
    .route(
      "/settings/pipelines/{id}",
      get(pipelines::show::<S, M>)
        .put(pipelines::update::<S, M>)
        .delete(pipelines::destroy::<S, M>),
    )
    .route(
      "/settings/workflows",
      get(workflows::list::<S, M>).post(workflows::store::<S, M>),
    )
    .route(
      "/settings/workflows/{id}",
      get(workflows::show::<S, M>)
        .put(workflows::update::<S, M>)
        .delete(workflows::destroy::<S, M>),
    )
    .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth::<S, M>))
    .with_state(state)
}
