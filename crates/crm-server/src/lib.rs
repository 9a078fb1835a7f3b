//! Server assembly for the CRM admin API: configuration, the HTTP stack
//! around [`crm_api::api_router`], the mail transport, and the audit log.

pub mod mailer;

use std::path::{Path, PathBuf};

use axum::{Router, body::Body, extract::Request};
use crm_api::{ApiState, events::EventBus};
use crm_core::{mail::MailTransport, store::CrmStore};
use serde::Deserialize;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CRM_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Root of attachment storage.
  pub storage_dir:        PathBuf,
  #[serde(default = "default_page_size")]
  pub page_size:          u32,
  pub auth_username:      String,
  pub auth_password_hash: String,
  #[serde(default = "default_admin_id")]
  pub admin_id:           i64,
  #[serde(default = "default_admin_name")]
  pub admin_name:         String,
  pub mail:               MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
  /// Right-hand side of generated message ids.
  pub domain:       String,
  pub from_address: String,
  /// Without a relay, emails are logged instead of sent.
  pub smtp:         Option<SmtpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
  pub host:     String,
  #[serde(default = "default_smtp_port")]
  pub port:     u16,
  pub username: Option<String>,
  pub password: Option<String>,
  /// STARTTLS on `port`; otherwise implicit TLS.
  #[serde(default = "default_starttls")]
  pub starttls: bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_page_size() -> u32 { 50 }
fn default_admin_id() -> i64 { 1 }
fn default_admin_name() -> String { "Administrator".to_owned() }
fn default_smtp_port() -> u16 { 587 }
fn default_starttls() -> bool { true }

impl ServerConfig {
  /// Layer `CRM_*` environment variables over the TOML file at `path`.
  /// Nested keys use `__`, e.g. `CRM_MAIL__SMTP__HOST`. A missing file is
  /// not an error.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CRM")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }
}

// ─── HTTP stack ───────────────────────────────────────────────────────────────

/// The API under `/api/v1`, traced with one span per request.
pub fn app<S, M>(state: ApiState<S, M>) -> Router
where
  S: CrmStore + 'static,
  M: MailTransport + 'static,
{
  Router::new()
    .nest("/api/v1", crm_api::api_router(state))
    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
      tracing::info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        request_id = %Uuid::new_v4(),
      )
    }))
}

// ─── Audit log ────────────────────────────────────────────────────────────────

/// Log every lifecycle event at `info` under the `crm::audit` target until
/// the bus is dropped.
pub fn spawn_audit(events: &EventBus) -> JoinHandle<()> {
  let mut rx = events.subscribe();
  tokio::spawn(async move {
    loop {
      match rx.recv().await {
        Ok(event) => {
          tracing::info!(target: "crm::audit", event = %event.name(), id = ?event.id);
        }
        Err(RecvError::Lagged(skipped)) => {
          tracing::warn!(target: "crm::audit", skipped, "audit subscriber lagged");
        }
        Err(RecvError::Closed) => break,
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::http::StatusCode;
  use crm_api::{
    ApiConfig,
    auth::{AdminUser, AuthConfig},
    storage::LocalStorage,
  };
  use crm_core::events::{Action, LifecycleEvent, Resource};
  use crm_store_sqlite::SqliteStore;
  use tower::ServiceExt;

  use super::*;
  use crate::mailer::Mailer;

  #[test]
  fn config_file_with_defaults() {
    let path = std::env::temp_dir().join(format!("crm-server-config-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      r#"
        store_path = "/tmp/crm.sqlite3"
        storage_dir = "/tmp/crm-storage"
        auth_username = "admin"
        auth_password_hash = "$argon2id$placeholder"

        [mail]
        domain = "example.com"
        from_address = "admin@example.com"

        [mail.smtp]
        host = "smtp.example.com"
      "#,
    )
    .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!((cfg.host.as_str(), cfg.port, cfg.page_size), ("127.0.0.1", 8080, 50));
    assert_eq!(cfg.admin_name, "Administrator");
    let smtp = cfg.mail.smtp.unwrap();
    assert_eq!((smtp.port, smtp.starttls), (587, true));
  }

  #[tokio::test]
  async fn api_is_mounted_under_v1_behind_auth() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = ApiState {
      store:   Arc::new(store),
      mailer:  Arc::new(Mailer::Log),
      events:  EventBus::default(),
      auth:    Arc::new(AuthConfig {
        username:      "admin".into(),
        password_hash: "$argon2id$placeholder".into(),
        admin:         AdminUser { id: 1, name: "Admin".into() },
      }),
      storage: Arc::new(LocalStorage::new(std::env::temp_dir())),
      config:  Arc::new(ApiConfig {
        mail_domain:  "example.com".into(),
        from_address: "admin@example.com".into(),
        page_size:    50,
      }),
    };
    let app = app(state);

    let req = axum::http::Request::builder()
      .uri("/api/v1/contacts/persons")
      .body(Body::empty())
      .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = axum::http::Request::builder()
      .uri("/contacts/persons")
      .body(Body::empty())
      .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn audit_task_ends_with_the_bus() {
    let events = EventBus::default();
    let handle = spawn_audit(&events);
    events.dispatch(LifecycleEvent::after(Resource::Person, Action::Create, 1));
    drop(events);
    handle.await.unwrap();
  }
}
