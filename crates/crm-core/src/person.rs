//! Persons: the contact records managed from the admin panel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A labelled contact value: one email address or one phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledValue {
  pub value: String,
  /// Free-text label, e.g. `"work"` or `"home"`.
  #[serde(default = "default_label")]
  pub label: String,
}

fn default_label() -> String { "work".to_owned() }

impl LabeledValue {
  pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
    Self { value: value.into(), label: label.into() }
  }
}

/// A stored person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub id:              i64,
  pub name:            String,
  pub emails:          Vec<LabeledValue>,
  /// Ordered as submitted; never contains an entry without a value.
  pub contact_numbers: Vec<LabeledValue>,
  pub job_title:       Option<String>,
  pub organization_id: Option<i64>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

/// Input to [`crate::store::PersonRepository::create_person`] and
/// [`crate::store::PersonRepository::update_person`].
#[derive(Debug, Clone, Default)]
pub struct PersonInput {
  pub name:            String,
  pub emails:          Vec<LabeledValue>,
  pub contact_numbers: Vec<LabeledValue>,
  pub job_title:       Option<String>,
  pub organization_id: Option<i64>,
}
