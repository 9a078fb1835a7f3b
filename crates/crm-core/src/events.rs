//! Lifecycle events emitted around every mutation.
//!
//! Each handler emits a `Before` event, performs one store operation, then
//! emits an `After` event. Listeners match on the typed fields; [`name`]
//! yields the dotted name external listeners already subscribe to, such as
//! `settings.pipeline.delete.before`.
//!
//! [`name`]: LifecycleEvent::name

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of record an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
  Person,
  Lead,
  LeadTag,
  Tag,
  Email,
  EmailTemplate,
  Pipeline,
  Workflow,
}

impl Resource {
  fn prefix(self) -> &'static str {
    match self {
      Self::Person => "contacts.person",
      Self::Lead => "lead",
      Self::LeadTag => "leads.tag",
      Self::Tag => "settings.tag",
      Self::Email => "email",
      Self::EmailTemplate => "settings.email_templates",
      Self::Pipeline => "settings.pipeline",
      Self::Workflow => "settings.workflow",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  Create,
  Update,
  Delete,
  /// Soft delete: the email is moved to the trash folder.
  Trash,
}

impl Action {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Delete => "delete",
      Self::Trash => "trash",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Before,
  After,
}

/// A before/after notification around one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
  pub resource: Resource,
  pub action:   Action,
  pub phase:    Phase,
  /// The record concerned. `None` for a `Before` event of a create, when no
  /// id has been assigned yet.
  pub id:       Option<i64>,
}

impl LifecycleEvent {
  pub fn before(resource: Resource, action: Action, id: Option<i64>) -> Self {
    Self { resource, action, phase: Phase::Before, id }
  }

  pub fn after(resource: Resource, action: Action, id: i64) -> Self {
    Self { resource, action, phase: Phase::After, id: Some(id) }
  }

  /// Dotted event name, e.g. `email.trash.after`.
  pub fn name(&self) -> String {
    let phase = match self.phase {
      Phase::Before => "before",
      Phase::After => "after",
    };
    format!("{}.{}.{}", self.resource.prefix(), self.action.as_str(), phase)
  }
}

impl fmt::Display for LifecycleEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.id {
      Some(id) => write!(f, "{} #{id}", self.name()),
      None => f.write_str(&self.name()),
    }
  }
}
