//! API error type and [`axum::response::IntoResponse`] implementation.

use std::collections::BTreeMap;

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::i18n::Message;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Field-level validation failures, keyed by field path (`stages.0.code`).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.entry(field.into()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }
}

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("validation failed: {0:?}")]
  Validation(ValidationErrors),

  /// A business rule refused the request; nothing was changed.
  #[error("rejected: {0}")]
  Rejected(Message),

  /// Moving dependent records failed, so the primary mutation was skipped.
  #[error("dependency cascade failed: {0}")]
  DependencyCascade(#[source] BoxError),

  /// The store failed while applying a destructive mutation.
  #[error("{message}: {source}")]
  Persistence {
    message: Message,
    #[source]
    source:  BoxError,
  },

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl ApiError {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn cascade<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::DependencyCascade(Box::new(e))
  }

  /// A store failure reported to the client as `message`.
  pub fn persistence<E: std::error::Error + Send + Sync + 'static>(
    message: Message,
  ) -> impl FnOnce(E) -> Self {
    move |e| Self::Persistence { message, source: Box::new(e) }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "message": Message::Unauthorized })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"crm\""),
        );
        res
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, Json(json!({ "message": m }))).into_response(),
      ApiError::Validation(errors) => (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "message": Message::ValidationFailed, "errors": errors })),
      )
        .into_response(),
      ApiError::Rejected(m) => (StatusCode::BAD_REQUEST, Json(json!({ "message": m }))).into_response(),
      ApiError::DependencyCascade(e) => {
        tracing::error!(error = %e, "dependency cascade failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "message": Message::PipelineReassignFailed })),
        )
          .into_response()
      }
      ApiError::Persistence { message, source } => {
        tracing::error!(error = %source, key = message.key(), "persistence failure");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": message }))).into_response()
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "message": Message::ServerError })),
        )
          .into_response()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::body::to_bytes;
  use serde_json::Value;

  use super::*;

  async fn render(err: ApiError) -> (StatusCode, Value) {
    let res = err.into_response();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn io_error() -> std::io::Error { std::io::Error::other("disk full") }

  #[tokio::test]
  async fn persistence_reports_its_own_message() {
    let err = ApiError::persistence(Message::MailDeleteFailed)(io_error());
    let (status, body) = render(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Email can not be deleted." }));
  }

  #[tokio::test]
  async fn cascade_reports_that_leads_were_not_moved() {
    let (status, body) = render(ApiError::cascade(io_error())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Leads of the pipeline could not be moved." }));
  }

  #[tokio::test]
  async fn store_errors_hide_their_cause() {
    let (status, body) = render(ApiError::store(io_error())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Something went wrong." }));
  }

  #[tokio::test]
  async fn validation_lists_every_field() {
    let mut errors = ValidationErrors::default();
    errors.add("name", "The name field is required.");
    let (status, body) = render(ApiError::Validation(errors)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["name"], json!(["The name field is required."]));
  }
}
