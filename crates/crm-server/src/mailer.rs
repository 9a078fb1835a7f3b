//! Outgoing mail: SMTP through `lettre`, or a log-only transport for
//! deployments without a relay.

use crm_core::{
  email::Email,
  mail::{MailTransport, Sent, TransportError},
};
use lettre::{
  Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
  message::{Mailbox, header::ContentType},
  transport::smtp::authentication::Credentials,
};

use crate::SmtpConfig;

pub enum Mailer {
  Smtp(AsyncSmtpTransport<Tokio1Executor>),
  /// Builds the message, logs it, and reports success.
  Log,
}

impl Mailer {
  /// SMTP when `smtp` is configured, [`Mailer::Log`] otherwise.
  pub fn from_config(smtp: Option<&SmtpConfig>) -> Result<Self, lettre::transport::smtp::Error> {
    let Some(cfg) = smtp else {
      return Ok(Self::Log);
    };

    let builder = if cfg.starttls {
      AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
    } else {
      AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
    };
    let mut builder = builder.port(cfg.port);
    if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
      builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }
    Ok(Self::Smtp(builder.build()))
  }
}

fn address(raw: &str) -> Result<Address, TransportError> {
  raw.trim().parse().map_err(|e: lettre::address::AddressError| {
    TransportError::InvalidAddress { address: raw.to_owned(), reason: e.to_string() }
  })
}

/// Render `email` as a MIME message. `reply_to` holds the primary
/// recipients.
pub fn build_message(email: &Email) -> Result<Message, TransportError> {
  let mut builder = Message::builder()
    .from(Mailbox::new(email.name.clone(), address(&email.from)?))
    .subject(email.subject.clone().unwrap_or_default())
    .message_id(Some(format!("<{}>", email.message_id)))
    .header(ContentType::TEXT_HTML);

  for to in &email.reply_to {
    builder = builder.to(Mailbox::new(None, address(to)?));
  }
  for cc in &email.cc {
    builder = builder.cc(Mailbox::new(None, address(cc)?));
  }
  for bcc in &email.bcc {
    builder = builder.bcc(Mailbox::new(None, address(bcc)?));
  }
  // Thread headers carry every id before this one.
  if let Some((_, earlier)) = email.reference_ids.split_last()
    && let Some(parent) = earlier.last()
  {
    builder = builder.in_reply_to(format!("<{parent}>"));
    let refs: Vec<_> = earlier.iter().map(|id| format!("<{id}>")).collect();
    builder = builder.references(refs.join(" "));
  }

  builder
    .body(email.reply.clone())
    .map_err(|e| TransportError::Message(e.to_string()))
}

impl MailTransport for Mailer {
  async fn send<'a>(&'a self, email: &'a Email) -> Result<Sent, TransportError> {
    let message = build_message(email)?;
    match self {
      Self::Smtp(transport) => {
        transport.send(message).await.map_err(|e| {
          if e.is_permanent() {
            TransportError::Rejected(e.to_string())
          } else {
            TransportError::Unavailable(e.to_string())
          }
        })?;
      }
      Self::Log => {
        tracing::info!(
          email_id = email.id,
          to = ?email.reply_to,
          subject = email.subject.as_deref().unwrap_or(""),
          "no SMTP relay configured; email logged instead of sent",
        );
      }
    }
    Ok(Sent { message_id: email.message_id.clone() })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use crm_core::email::Folder;

  use super::*;

  fn email() -> Email {
    Email {
      id:            7,
      subject:       Some("Proposal".into()),
      source:        "web".into(),
      user_type:     "admin".into(),
      name:          Some("Admin".into()),
      reply:         "<p>Hello</p>".into(),
      is_read:       false,
      folders:       vec![Folder::Outbox],
      from:          "admin@crm.test".into(),
      reply_to:      vec!["client@example.com".into()],
      cc:            vec!["boss@example.com".into()],
      bcc:           vec![],
      unique_id:     "1700000001@crm.test".into(),
      message_id:    "1700000001@crm.test".into(),
      reference_ids: vec!["1700000000@crm.test".into(), "1700000001@crm.test".into()],
      person_id:     None,
      lead_id:       None,
      parent_id:     Some(6),
      user_id:       Some(1),
      attachments:   vec![],
      created_at:    Utc::now(),
      updated_at:    Utc::now(),
    }
  }

  #[test]
  fn message_carries_recipients_and_thread_headers() {
    let raw = String::from_utf8(build_message(&email()).unwrap().formatted()).unwrap();
    assert!(raw.contains("To: client@example.com"));
    assert!(raw.contains("Cc: boss@example.com"));
    assert!(raw.contains("Message-ID: <1700000001@crm.test>"));
    assert!(raw.contains("In-Reply-To: <1700000000@crm.test>"));
    assert!(raw.contains("Content-Type: text/html"));
  }

  #[test]
  fn first_message_has_no_thread_headers() {
    let mut e = email();
    e.reference_ids = vec![e.message_id.clone()];
    let raw = String::from_utf8(build_message(&e).unwrap().formatted()).unwrap();
    assert!(!raw.contains("In-Reply-To"));
  }

  #[test]
  fn invalid_recipient_is_reported() {
    let mut e = email();
    e.reply_to = vec!["not an address".into()];
    assert!(matches!(
      build_message(&e),
      Err(TransportError::InvalidAddress { address, .. }) if address == "not an address"
    ));
  }

  #[tokio::test]
  async fn log_transport_reports_success() {
    let sent = Mailer::Log.send(&email()).await.unwrap();
    assert_eq!(sent.message_id, "1700000001@crm.test");
  }

  #[test]
  fn no_smtp_section_means_log() {
    assert!(matches!(Mailer::from_config(None), Ok(Mailer::Log)));
  }
}
