//! The outgoing mail transport abstraction.
//!
//! Implemented by the server binary (SMTP or log-only). Sending reports its
//! outcome as a `Result`; whether a failure is retried, surfaced, or ignored
//! is the caller's decision.

use std::future::Future;

use thiserror::Error;

use crate::email::Email;

/// Proof of a successful hand-off to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
  /// The `Message-ID` the transport sent the email with.
  pub message_id: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("invalid address {address:?}: {reason}")]
  InvalidAddress { address: String, reason: String },

  #[error("could not build message: {0}")]
  Message(String),

  #[error("transport unavailable: {0}")]
  Unavailable(String),

  #[error("rejected by server: {0}")]
  Rejected(String),
}

pub trait MailTransport: Send + Sync {
  /// Deliver `email` to its `reply_to`, `cc`, and `bcc` recipients.
  fn send<'a>(
    &'a self,
    email: &'a Email,
  ) -> impl Future<Output = Result<Sent, TransportError>> + Send + 'a;
}
