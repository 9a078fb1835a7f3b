//! Repository traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g. `crm-store-sqlite`).
//! Higher layers (`crm-api`, `crm-server`) depend on these abstractions, not
//! on any concrete backend.
//!
//! Lookups return `Option` and deletes return `bool` so that "no such record"
//! never has to be recovered from a backend error.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  email::{Attachment, Email, EmailPatch, Folder, NewAttachment, NewEmail},
  lead::{Lead, NewLead, NewTag, Tag},
  person::{Person, PersonInput},
  pipeline::{Pipeline, PipelineInput},
  template::{EmailTemplate, EmailTemplateInput},
  workflow::{Workflow, WorkflowInput},
};

// ─── Query types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  #[default]
  Asc,
  Desc,
}

/// Pagination shared by every `list_*` method. Records are ordered by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
  pub limit:  u32,
  pub offset: u32,
  pub order:  SortOrder,
}

impl Default for ListQuery {
  fn default() -> Self {
    Self { limit: 50, offset: 0, order: SortOrder::Asc }
  }
}

/// One page of a listing plus the total number of matching records.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// The error type shared by every repository of a backend.
///
/// All methods of the repository traits return `Send` futures so they can
/// be used in multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait Repository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

pub trait PersonRepository: Repository {
  fn list_persons(
    &self,
    query: ListQuery,
  ) -> impl Future<Output = Result<Page<Person>, Self::Error>> + Send + '_;

  /// Persons whose name contains `term`.
  fn search_persons(
    &self,
    term: String,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  fn get_person(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  fn create_person(
    &self,
    input: PersonInput,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Returns `None` if `id` does not exist.
  fn update_person(
    &self,
    id: i64,
    input: PersonInput,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Returns `false` if `id` does not exist.
  fn delete_person(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait LeadRepository: Repository {
  fn create_lead(
    &self,
    input: NewLead,
  ) -> impl Future<Output = Result<Lead, Self::Error>> + Send + '_;

  /// The lead with its tags loaded.
  fn get_lead(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Lead>, Self::Error>> + Send + '_;

  /// Attach a tag. Attaching an already-attached tag is a no-op.
  fn attach_tag(
    &self,
    lead_id: i64,
    tag_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Detach a tag. Detaching a tag that is not attached is a no-op.
  fn detach_tag(
    &self,
    lead_id: i64,
    tag_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_tags(&self) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + '_;

  fn get_tag(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  fn create_tag(
    &self,
    input: NewTag,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;
}

pub trait EmailRepository: Repository {
  /// List emails, optionally restricted to those filed under `folder`.
  fn list_emails(
    &self,
    query: ListQuery,
    folder: Option<Folder>,
  ) -> impl Future<Output = Result<Page<Email>, Self::Error>> + Send + '_;

  /// The email with its attachments loaded.
  fn get_email(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Email>, Self::Error>> + Send + '_;

  fn create_email(
    &self,
    input: NewEmail,
  ) -> impl Future<Output = Result<Email, Self::Error>> + Send + '_;

  /// Apply `patch`; returns `None` if `id` does not exist.
  fn update_email(
    &self,
    id: i64,
    patch: EmailPatch,
  ) -> impl Future<Output = Result<Option<Email>, Self::Error>> + Send + '_;

  /// Hard delete, attachments included. Returns `false` if `id` does not
  /// exist.
  fn delete_email(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn create_attachment(
    &self,
    input: NewAttachment,
  ) -> impl Future<Output = Result<Attachment, Self::Error>> + Send + '_;

  fn get_attachment(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Attachment>, Self::Error>> + Send + '_;
}

pub trait EmailTemplateRepository: Repository {
  fn list_email_templates(
    &self,
    query: ListQuery,
  ) -> impl Future<Output = Result<Page<EmailTemplate>, Self::Error>> + Send + '_;

  fn get_email_template(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<EmailTemplate>, Self::Error>> + Send + '_;

  fn create_email_template(
    &self,
    input: EmailTemplateInput,
  ) -> impl Future<Output = Result<EmailTemplate, Self::Error>> + Send + '_;

  fn update_email_template(
    &self,
    id: i64,
    input: EmailTemplateInput,
  ) -> impl Future<Output = Result<Option<EmailTemplate>, Self::Error>> + Send + '_;

  fn delete_email_template(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait PipelineRepository: Repository {
  fn list_pipelines(
    &self,
    query: ListQuery,
  ) -> impl Future<Output = Result<Page<Pipeline>, Self::Error>> + Send + '_;

  fn get_pipeline(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Pipeline>, Self::Error>> + Send + '_;

  /// The pipeline flagged `is_default`.
  fn default_pipeline(
    &self,
  ) -> impl Future<Output = Result<Option<Pipeline>, Self::Error>> + Send + '_;

  /// Whether a pipeline other than `except` already uses `name`.
  fn pipeline_name_taken(
    &self,
    name: String,
    except: Option<i64>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Create a pipeline and its stages. If `input.is_default` is set, every
  /// other pipeline loses the flag.
  fn create_pipeline(
    &self,
    input: PipelineInput,
  ) -> impl Future<Output = Result<Pipeline, Self::Error>> + Send + '_;

  /// Replace a pipeline's attributes and stage list.
  ///
  /// Stages whose id is omitted from `input.stages` are deleted; their leads
  /// move to the first remaining stage. The current default pipeline keeps
  /// its flag even if `input.is_default` is false.
  fn update_pipeline(
    &self,
    id: i64,
    input: PipelineInput,
  ) -> impl Future<Output = Result<Option<Pipeline>, Self::Error>> + Send + '_;

  /// Move every lead of pipeline `from` onto `to_pipeline` / `to_stage`.
  /// Returns the number of leads moved.
  fn reassign_leads(
    &self,
    from: i64,
    to_pipeline: i64,
    to_stage: i64,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Delete a pipeline and its stages. Fails if leads still reference it.
  fn delete_pipeline(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

pub trait WorkflowRepository: Repository {
  fn list_workflows(
    &self,
    query: ListQuery,
  ) -> impl Future<Output = Result<Page<Workflow>, Self::Error>> + Send + '_;

  fn get_workflow(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Workflow>, Self::Error>> + Send + '_;

  fn create_workflow(
    &self,
    input: WorkflowInput,
  ) -> impl Future<Output = Result<Workflow, Self::Error>> + Send + '_;

  fn update_workflow(
    &self,
    id: i64,
    input: WorkflowInput,
  ) -> impl Future<Output = Result<Option<Workflow>, Self::Error>> + Send + '_;

  fn delete_workflow(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

/// Every repository of the CRM, backed by one store.
pub trait CrmStore:
  PersonRepository
  + LeadRepository
  + EmailRepository
  + EmailTemplateRepository
  + PipelineRepository
  + WorkflowRepository
{
}

impl<T> CrmStore for T where
  T: PersonRepository
    + LeadRepository
    + EmailRepository
    + EmailTemplateRepository
    + PipelineRepository
    + WorkflowRepository
{
}
