//! Router-level tests: real handlers over an in-memory `SqliteStore`.

mod auth;
mod emails;
mod settings;

use std::{
  path::PathBuf,
  sync::{
    Arc, Mutex, OnceLock,
    atomic::{AtomicUsize, Ordering},
  },
};

use argon2::{
  Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString,
};
use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Method, Request, StatusCode, header},
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use crm_core::{
  email::Email,
  events::LifecycleEvent,
  mail::{MailTransport, Sent, TransportError},
};
use crm_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;

use crate::{
  ApiConfig, ApiState, api_router,
  auth::{AdminUser, AuthConfig},
  events::EventBus,
  storage::LocalStorage,
};

pub(crate) const USERNAME: &str = "admin";
pub(crate) const PASSWORD: &str = "secret";

/// Hashed once per test binary with cheap parameters; verification reads
/// the parameters back out of the PHC string.
fn password_hash() -> &'static str {
  static HASH: OnceLock<String> = OnceLock::new();
  HASH.get_or_init(|| {
    let params = Params::new(1024, 1, 1, None).unwrap();
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
      .hash_password(PASSWORD.as_bytes(), &salt)
      .unwrap()
      .to_string()
  })
}

// ─── Mail transports ─────────────────────────────────────────────────────────

/// Accepts everything and remembers which emails it was handed.
#[derive(Default)]
pub(crate) struct OkMailer {
  pub sent: Mutex<Vec<i64>>,
}

impl MailTransport for OkMailer {
  async fn send<'a>(&'a self, email: &'a Email) -> Result<Sent, TransportError> {
    self.sent.lock().unwrap().push(email.id);
    Ok(Sent { message_id: email.message_id.clone() })
  }
}

/// Fails every send, as an unreachable SMTP relay would.
#[derive(Default)]
pub(crate) struct FailingMailer;

impl MailTransport for FailingMailer {
  async fn send<'a>(&'a self, _email: &'a Email) -> Result<Sent, TransportError> {
    Err(TransportError::Unavailable("connection refused".into()))
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

pub(crate) struct Harness<M> {
  pub app:          Router,
  pub store:        Arc<SqliteStore>,
  pub mailer:       Arc<M>,
  pub events:       EventBus,
  pub storage_root: PathBuf,
}

pub(crate) async fn harness() -> Harness<OkMailer> { harness_with(OkMailer::default()).await }

pub(crate) async fn harness_with<M: MailTransport + 'static>(mailer: M) -> Harness<M> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  assemble(scratch_dir(), store, mailer)
}

/// A harness whose store lives in a file, plus a second connection to the
/// same file for installing failure triggers behind the store's back.
pub(crate) async fn harness_on_disk() -> (Harness<OkMailer>, rusqlite::Connection) {
  let root = scratch_dir();
  let db = root.join("crm.sqlite3");
  let store = SqliteStore::open(&db).await.unwrap();
  let side = rusqlite::Connection::open(&db).unwrap();
  (assemble(root, store, OkMailer::default()), side)
}

fn scratch_dir() -> PathBuf {
  static NEXT: AtomicUsize = AtomicUsize::new(0);
  let dir = std::env::temp_dir().join(format!(
    "crm-api-test-{}-{}",
    std::process::id(),
    NEXT.fetch_add(1, Ordering::Relaxed)
  ));
  std::fs::create_dir_all(&dir).unwrap();
  dir
}

fn assemble<M: MailTransport + 'static>(
  storage_root: PathBuf,
  store: SqliteStore,
  mailer: M,
) -> Harness<M> {
  let store = Arc::new(store);
  let mailer = Arc::new(mailer);
  let events = EventBus::default();
  let state = ApiState {
    store:   store.clone(),
    mailer:  mailer.clone(),
    events:  events.clone(),
    auth:    Arc::new(AuthConfig {
      username:      USERNAME.to_owned(),
      password_hash: password_hash().to_owned(),
      admin:         AdminUser { id: 1, name: "Admin".to_owned() },
    }),
    storage: Arc::new(LocalStorage::new(&storage_root)),
    config:  Arc::new(ApiConfig {
      mail_domain:  "crm.test".to_owned(),
      from_address: "admin@crm.test".to_owned(),
      page_size:    50,
    }),
  };

  Harness { app: api_router(state), store, mailer, events, storage_root }
}

/// Make every `op` (`UPDATE` or `DELETE`) on `table` abort.
pub(crate) fn refuse(side: &rusqlite::Connection, op: &str, table: &str) {
  side
    .execute_batch(&format!(
      "CREATE TRIGGER refuse_{op}_{table} BEFORE {op} ON {table}
       BEGIN SELECT RAISE(ABORT, 'refused'); END;"
    ))
    .unwrap();
}

pub(crate) fn basic(user: &str, pass: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{pass}")))
}

impl<M> Harness<M> {
  /// Send an authenticated request and return the raw response.
  pub async fn raw(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::AUTHORIZATION, basic(USERNAME, PASSWORD));
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string())),
      None => builder.body(Body::empty()),
    }
    .unwrap();
    self.app.clone().oneshot(req).await.unwrap()
  }

  /// Send an authenticated request and decode the JSON response.
  pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let res = self.raw(method, uri, body).await;
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
  }

  pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
    self.call(Method::GET, uri, None).await
  }

  pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
    self.call(Method::POST, uri, Some(body)).await
  }

  pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
    self.call(Method::PUT, uri, Some(body)).await
  }

  pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
    self.call(Method::DELETE, uri, None).await
  }
}

/// Dotted names of every event received so far.
pub(crate) fn drain(rx: &mut broadcast::Receiver<LifecycleEvent>) -> Vec<String> {
  let mut names = Vec::new();
  while let Ok(event) = rx.try_recv() {
    names.push(event.name());
  }
  names
}
