//! The catalogue of user-facing response messages.
//!
//! Each message has a stable translation key, used by clients that localise
//! on their side, and an English text sent in the `message` field.

use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
  PersonCreated,
  PersonUpdated,
  PersonDestroyed,
  PersonDestroyFailed,
  PersonsMassDestroyed,

  LeadCreated,
  TagAttached,
  TagDetached,
  TagCreated,

  MailSavedToDraft,
  MailCreated,
  MailUpdated,
  MailDeleted,
  MailDeleteFailed,
  MailMassUpdated,
  MailMassDestroyed,

  TemplateCreated,
  TemplateUpdated,
  TemplateDeleted,
  TemplateDeleteFailed,

  PipelineCreated,
  PipelineUpdated,
  PipelineDeleted,
  PipelineDeleteFailed,
  PipelineDefaultDeleteError,
  PipelineReassignFailed,

  WorkflowCreated,
  WorkflowUpdated,
  WorkflowDeleted,
  WorkflowDeleteFailed,

  Unauthorized,
  ValidationFailed,
  ServerError,
}

impl Message {
  pub fn key(self) -> &'static str {
    match self {
      Self::PersonCreated => "contacts.persons.create-success",
      Self::PersonUpdated => "contacts.persons.update-success",
      Self::PersonDestroyed => "response.destroy-success",
      Self::PersonDestroyFailed => "response.destroy-failed",
      Self::PersonsMassDestroyed => "contacts.persons.mass-destroy-success",
      Self::LeadCreated => "leads.create-success",
      Self::TagAttached => "leads.tag-create-success",
      Self::TagDetached => "leads.tag-destroy-success",
      Self::TagCreated => "settings.tags.create-success",
      Self::MailSavedToDraft => "mail.saved-to-draft",
      Self::MailCreated => "mail.create-success",
      Self::MailUpdated => "mail.update-success",
      Self::MailDeleted => "mail.delete-success",
      Self::MailDeleteFailed => "mail.delete-failed",
      Self::MailMassUpdated => "mail.mass-update-success",
      Self::MailMassDestroyed => "mail.destroy-success",
      Self::TemplateCreated => "settings.email-templates.create-success",
      Self::TemplateUpdated => "settings.email-templates.update-success",
      Self::TemplateDeleted => "settings.email-templates.delete-success",
      Self::TemplateDeleteFailed => "settings.email-templates.delete-failed",
      Self::PipelineCreated => "settings.pipelines.create-success",
      Self::PipelineUpdated => "settings.pipelines.update-success",
      Self::PipelineDeleted => "settings.pipelines.delete-success",
      Self::PipelineDeleteFailed => "settings.pipelines.delete-failed",
      Self::PipelineDefaultDeleteError => "settings.pipelines.default-delete-error",
      Self::PipelineReassignFailed => "settings.pipelines.reassign-failed",
      Self::WorkflowCreated => "settings.workflows.create-success",
      Self::WorkflowUpdated => "settings.workflows.update-success",
      Self::WorkflowDeleted => "settings.workflows.delete-success",
      Self::WorkflowDeleteFailed => "settings.workflows.delete-failed",
      Self::Unauthorized => "response.unauthorized",
      Self::ValidationFailed => "response.validation-failed",
      Self::ServerError => "response.server-error",
    }
  }

  pub fn text(self) -> &'static str {
    match self {
      Self::PersonCreated => "Person created successfully.",
      Self::PersonUpdated => "Person updated successfully.",
      Self::PersonDestroyed => "Person deleted successfully.",
      Self::PersonDestroyFailed => "Person can not be deleted.",
      Self::PersonsMassDestroyed => "Persons deleted successfully.",
      Self::LeadCreated => "Lead created successfully.",
      Self::TagAttached => "Tag added successfully.",
      Self::TagDetached => "Tag removed successfully.",
      Self::TagCreated => "Tag created successfully.",
      Self::MailSavedToDraft => "Email saved to draft successfully.",
      Self::MailCreated => "Email sent successfully.",
      Self::MailUpdated => "Email updated successfully.",
      Self::MailDeleted => "Email deleted successfully.",
      Self::MailDeleteFailed => "Email can not be deleted.",
      Self::MailMassUpdated => "Emails updated successfully.",
      Self::MailMassDestroyed => "Emails deleted successfully.",
      Self::TemplateCreated => "Email template created successfully.",
      Self::TemplateUpdated => "Email template updated successfully.",
      Self::TemplateDeleted => "Email template deleted successfully.",
      Self::TemplateDeleteFailed => "Email template can not be deleted.",
      Self::PipelineCreated => "Pipeline created successfully.",
      Self::PipelineUpdated => "Pipeline updated successfully.",
      Self::PipelineDeleted => "Pipeline deleted successfully.",
      Self::PipelineDeleteFailed => "Pipeline can not be deleted.",
      Self::PipelineDefaultDeleteError => "Default pipeline can not be deleted.",
      Self::PipelineReassignFailed => "Leads of the pipeline could not be moved.",
      Self::WorkflowCreated => "Workflow created successfully.",
      Self::WorkflowUpdated => "Workflow updated successfully.",
      Self::WorkflowDeleted => "Workflow deleted successfully.",
      Self::WorkflowDeleteFailed => "Workflow can not be deleted.",
      Self::Unauthorized => "Unauthenticated.",
      Self::ValidationFailed => "The given data was invalid.",
      Self::ServerError => "Something went wrong.",
    }
  }
}

impl fmt::Display for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.text())
  }
}

impl Serialize for Message {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.text())
  }
}
