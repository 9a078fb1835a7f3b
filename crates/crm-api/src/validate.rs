//! Request payload validation.
//!
//! Handlers collect every violation before answering, so a client sees all
//! of its field errors in one 422 response.

use crate::error::{ApiError, ValidationErrors};

#[derive(Debug, Default)]
pub struct Rules {
  errors: ValidationErrors,
}

impl Rules {
  pub fn new() -> Self { Self::default() }

  /// `value` must be present and not blank. Returns the trimmed value.
  pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
      Some(v) => Some(v),
      None => {
        self.errors.add(field, format!("The {} field is required.", label(field)));
        None
      }
    }
  }

  pub fn non_empty<T>(&mut self, field: &str, items: &[T]) {
    if items.is_empty() {
      self.errors.add(field, format!("The {} must have at least 1 item.", label(field)));
    }
  }

  /// Record `message` against `field` unless `ok` holds.
  pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
    if !ok {
      self.errors.add(field, message);
    }
  }

  pub fn finish(self) -> Result<(), ApiError> {
    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(ApiError::Validation(self.errors))
    }
  }

  /// [`finish`](Self::finish), then yield `value`, which the checked rules
  /// guarantee to be present.
  pub fn finish_with<T>(self, value: Option<T>) -> Result<T, ApiError> {
    self.finish()?;
    value.ok_or_else(|| ApiError::Validation(ValidationErrors::default()))
  }
}

/// `reply_to` → `reply to`.
fn label(field: &str) -> String { field.replace('_', " ") }
