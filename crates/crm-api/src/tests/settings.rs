use axum::http::StatusCode;
use crm_core::{
  lead::NewLead,
  store::{LeadRepository, PipelineRepository},
};
use serde_json::json;

use super::*;

fn pipeline_body(name: &str, is_default: bool) -> Value {
  json!({
    "name": name,
    "is_default": is_default,
    "rotten_days": 14,
    "stages": [
      { "code": "new", "name": "New", "probability": 10 },
      { "code": "won", "name": "Won", "probability": 100 }
    ]
  })
}

async fn create_pipeline(h: &Harness<OkMailer>, name: &str, is_default: bool) -> Value {
  let (status, body) = h.post("/settings/pipelines", pipeline_body(name, is_default)).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  body["data"].clone()
}

// ─── Email templates ─────────────────────────────────────────────────────────

#[tokio::test]
async fn template_crud() {
  let h = harness().await;
  let (status, body) = h
    .post(
      "/settings/email-templates",
      json!({ "name": "Welcome", "subject": "Hi {%name%}", "content": "<p>Welcome</p>" }),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Email template created successfully.");
  let id = body["data"]["id"].as_i64().unwrap();

  let (status, body) = h
    .put(
      &format!("/settings/email-templates/{id}"),
      json!({ "name": "Welcome", "subject": "Hello", "content": "<p>Welcome</p>" }),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["subject"], "Hello");

  let (status, body) = h.delete(&format!("/settings/email-templates/{id}")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Email template deleted successfully.");
  assert_eq!(
    h.get(&format!("/settings/email-templates/{id}")).await.0,
    StatusCode::NOT_FOUND
  );
}

#[tokio::test]
async fn failed_template_delete_is_500() {
  let (h, side) = harness_on_disk().await;
  let (_, body) = h
    .post(
      "/settings/email-templates",
      json!({ "name": "Welcome", "subject": "Hi", "content": "<p>Welcome</p>" }),
    )
    .await;
  let id = body["data"]["id"].as_i64().unwrap();
  refuse(&side, "DELETE", "email_templates");

  let (status, body) = h.delete(&format!("/settings/email-templates/{id}")).await;

  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["message"], "Email template can not be deleted.");
  assert_eq!(h.get(&format!("/settings/email-templates/{id}")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn template_requires_every_field() {
  let h = harness().await;
  let (status, body) = h.post("/settings/email-templates", json!({ "name": "x" })).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["errors"]["subject"].is_array());
  assert!(body["errors"]["content"].is_array());
}

// ─── Pipelines ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn pipeline_stages_keep_submitted_order() {
  let h = harness().await;
  let data = create_pipeline(&h, "Enterprise", false).await;

  assert_eq!(data["rotten_days"], 14);
  let codes: Vec<_> = data["stages"]
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["code"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(codes, ["new", "won"]);
}

#[tokio::test]
async fn new_default_pipeline_takes_the_flag() {
  let h = harness().await;
  let seeded = h.store.default_pipeline().await.unwrap().unwrap();
  let data = create_pipeline(&h, "Enterprise", true).await;

  let current = h.store.default_pipeline().await.unwrap().unwrap();
  assert_eq!(data["id"], current.id);
  assert!(!h.store.get_pipeline(seeded.id).await.unwrap().unwrap().is_default);
}

#[tokio::test]
async fn pipeline_validation_reports_each_field() {
  let h = harness().await;
  create_pipeline(&h, "Enterprise", false).await;

  let (status, body) = h
    .post(
      "/settings/pipelines",
      json!({
        "name": "Enterprise",
        "rotten_days": 0,
        "stages": [{ "code": "", "name": "Won", "probability": 150 }]
      }),
    )
    .await;

  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  let errors = &body["errors"];
  assert_eq!(errors["name"][0], "The name has already been taken.");
  assert!(errors["rotten_days"].is_array());
  assert!(errors["stages.0.code"].is_array());
  assert!(errors["stages.0.probability"].is_array());
}

#[tokio::test]
async fn pipeline_without_stages_is_422() {
  let h = harness().await;
  let (status, body) = h.post("/settings/pipelines", json!({ "name": "Empty" })).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["errors"]["stages"].is_array());
}

#[tokio::test]
async fn update_may_keep_its_own_name() {
  let h = harness().await;
  let data = create_pipeline(&h, "Enterprise", false).await;
  let id = data["id"].as_i64().unwrap();

  let (status, body) = h
    .put(&format!("/settings/pipelines/{id}"), pipeline_body("Enterprise", false))
    .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["message"], "Pipeline updated successfully.");
}

#[tokio::test]
async fn deleting_default_pipeline_is_400_without_side_effects() {
  let h = harness().await;
  let default = h.store.default_pipeline().await.unwrap().unwrap();
  let mut rx = h.events.subscribe();

  let (status, body) = h.delete(&format!("/settings/pipelines/{}", default.id)).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Default pipeline can not be deleted.");
  assert!(h.store.get_pipeline(default.id).await.unwrap().is_some());
  assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn deleting_pipeline_moves_leads_to_default_first_stage() {
  let h = harness().await;
  let default = h.store.default_pipeline().await.unwrap().unwrap();
  let data = create_pipeline(&h, "Enterprise", false).await;
  let id = data["id"].as_i64().unwrap();
  let stage_id = data["stages"][1]["id"].as_i64().unwrap();
  let lead = h
    .store
    .create_lead(NewLead {
      title:                  "Deal".into(),
      description:            None,
      lead_value:             None,
      person_id:              None,
      lead_pipeline_id:       id,
      lead_pipeline_stage_id: stage_id,
    })
    .await
    .unwrap();
  let mut rx = h.events.subscribe();

  let (status, body) = h.delete(&format!("/settings/pipelines/{id}")).await;

  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["message"], "Pipeline deleted successfully.");
  assert!(h.store.get_pipeline(id).await.unwrap().is_none());
  let moved = h.store.get_lead(lead.id).await.unwrap().unwrap();
  assert_eq!(moved.lead_pipeline_id, default.id);
  assert_eq!(moved.lead_pipeline_stage_id, default.first_stage().unwrap().id);
  assert_eq!(
    drain(&mut rx),
    ["settings.pipeline.delete.before", "settings.pipeline.delete.after"]
  );
}

#[tokio::test]
async fn failed_lead_move_keeps_the_pipeline() {
  let (h, side) = harness_on_disk().await;
  let data = create_pipeline(&h, "Enterprise", false).await;
  let id = data["id"].as_i64().unwrap();
  let stage_id = data["stages"][0]["id"].as_i64().unwrap();
  let lead = h
    .store
    .create_lead(NewLead {
      title:                  "Deal".into(),
      description:            None,
      lead_value:             None,
      person_id:              None,
      lead_pipeline_id:       id,
      lead_pipeline_stage_id: stage_id,
    })
    .await
    .unwrap();
  refuse(&side, "UPDATE", "leads");
  let mut rx = h.events.subscribe();

  let (status, body) = h.delete(&format!("/settings/pipelines/{id}")).await;

  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["message"], "Leads of the pipeline could not be moved.");
  assert!(h.store.get_pipeline(id).await.unwrap().is_some());
  assert_eq!(h.store.get_lead(lead.id).await.unwrap().unwrap().lead_pipeline_id, id);
  assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn failed_pipeline_delete_is_500() {
  let (h, side) = harness_on_disk().await;
  let id = create_pipeline(&h, "Enterprise", false).await["id"].as_i64().unwrap();
  refuse(&side, "DELETE", "lead_pipelines");

  let (status, body) = h.delete(&format!("/settings/pipelines/{id}")).await;

  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["message"], "Pipeline can not be deleted.");
  assert!(h.store.get_pipeline(id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_unknown_pipeline_is_404() {
  let h = harness().await;
  assert_eq!(h.delete("/settings/pipelines/9999").await.0, StatusCode::NOT_FOUND);
}

// ─── Workflows ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn workflow_crud_keeps_json_documents() {
  let h = harness().await;
  let conditions = json!([{ "attribute": "lead_value", "operator": ">", "value": 1000 }]);
  let (status, body) = h
    .post(
      "/settings/workflows",
      json!({
        "name": "Big deals",
        "entity_type": "leads",
        "event": "lead.create.after",
        "conditions": conditions,
        "actions": [{ "id": "add_tag", "value": "big" }]
      }),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["conditions"], conditions);
  assert_eq!(body["data"]["condition_type"], "and");
  let id = body["data"]["id"].as_i64().unwrap();

  let (status, body) = h
    .put(&format!("/settings/workflows/{id}"), json!({ "name": "Huge deals" }))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["name"], "Huge deals");

  let (status, body) = h.delete(&format!("/settings/workflows/{id}")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Workflow deleted successfully.");
}

#[tokio::test]
async fn workflow_name_is_required() {
  let h = harness().await;
  let (status, _) = h.post("/settings/workflows", json!({ "event": "x" })).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
