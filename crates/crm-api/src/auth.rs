//! HTTP Basic-auth middleware and standalone verifier.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use crm_core::{mail::MailTransport, store::CrmStore};

use crate::{ApiState, error::ApiError};

/// The administrator requests are made on behalf of. Inserted into request
/// extensions once credentials check out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
  pub id:   i64,
  pub name: String,
}

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub admin:         AdminUser,
}

/// Verify Basic credentials in `headers` against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != config.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(())
}

/// Reject unauthenticated requests with 401; otherwise attach the
/// [`AdminUser`] and continue.
pub async fn require_auth<S, M>(
  State(state): State<ApiState<S, M>>,
  mut req: Request,
  next: Next,
) -> Result<Response, ApiError>
where
  S: CrmStore + 'static,
  M: MailTransport + 'static,
{
  if let Err(e) = verify_auth(req.headers(), &state.auth) {
    tracing::debug!(uri = %req.uri(), "rejected credentials");
    return Err(e);
  }
  req.extensions_mut().insert(state.auth.admin.clone());
  Ok(next.run(req).await)
}
