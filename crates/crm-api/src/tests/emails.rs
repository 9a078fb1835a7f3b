use axum::http::{Method, StatusCode, header};
use crm_core::{
  email::NewAttachment,
  store::EmailRepository,
};
use serde_json::json;

use super::*;

fn compose(is_draft: bool) -> Value {
  json!({
    "subject": "Proposal",
    "reply": "<p>Please find attached.</p>",
    "reply_to": ["client@example.com"],
    "is_draft": is_draft
  })
}

async fn draft<M: MailTransport + 'static>(h: &Harness<M>) -> i64 {
  let (status, body) = h.post("/mail", compose(true)).await;
  assert_eq!(status, StatusCode::OK);
  body["data"]["id"].as_i64().unwrap()
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn draft_is_stored_but_not_sent() {
  let h = harness().await;
  let (status, body) = h.post("/mail", compose(true)).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Email saved to draft successfully.");
  assert_eq!(body["data"]["folders"], json!(["draft"]));
  assert!(h.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn successful_send_files_under_inbox_and_sent() {
  let h = harness().await;
  let (status, body) = h.post("/mail", compose(false)).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Email sent successfully.");
  assert_eq!(body["data"]["folders"], json!(["inbox", "sent"]));
  let id = body["data"]["id"].as_i64().unwrap();
  assert_eq!(*h.mailer.sent.lock().unwrap(), [id]);
}

#[tokio::test]
async fn transport_failure_leaves_email_in_outbox() {
  let h = harness_with(FailingMailer).await;
  let (status, body) = h.post("/mail", compose(false)).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["folders"], json!(["outbox"]));
  let id = body["data"]["id"].as_i64().unwrap();
  let stored = h.store.get_email(id).await.unwrap().unwrap();
  assert_eq!(stored.folders, [crm_core::email::Folder::Outbox]);
}

#[tokio::test]
async fn numeric_zero_draft_flag_sends() {
  let h = harness().await;
  let mut body = compose(false);
  body["is_draft"] = json!(0);

  let (status, body) = h.post("/mail", body).await;

  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["message"], "Email sent successfully.");
  assert_eq!(body["data"]["folders"], json!(["inbox", "sent"]));
}

#[tokio::test]
async fn string_draft_flags_follow_form_truthiness() {
  let h = harness().await;
  for (flag, folders) in [
    (json!("1"), json!(["draft"])),
    (json!("0"), json!(["inbox", "sent"])),
    (json!(""), json!(["inbox", "sent"])),
    (json!(null), json!(["inbox", "sent"])),
  ] {
    let mut body = compose(false);
    body["is_draft"] = flag.clone();
    let (status, body) = h.post("/mail", body).await;
    assert_eq!(status, StatusCode::OK, "{flag}: {body}");
    assert_eq!(body["data"]["folders"], folders, "{flag}");
  }
}

#[tokio::test]
async fn server_assigns_sender_fields() {
  let h = harness().await;
  let (_, body) = h.post("/mail", compose(true)).await;
  let email = &body["data"];

  assert_eq!(email["source"], "web");
  assert_eq!(email["user_type"], "admin");
  assert_eq!(email["name"], "Admin");
  assert_eq!(email["from"], "admin@crm.test");
  assert!(email["message_id"].as_str().unwrap().ends_with("@crm.test"));
  assert_eq!(email["reference_ids"], json!([email["message_id"]]));
}

#[tokio::test]
async fn reply_extends_parent_thread() {
  let h = harness().await;
  let parent = draft(&h).await;
  let (_, parent_body) = h.get(&format!("/mail/{parent}")).await;

  let mut body = compose(true);
  body["parent_id"] = json!(parent);
  let (status, reply) = h.post("/mail", body).await;

  assert_eq!(status, StatusCode::OK);
  let refs = reply["data"]["reference_ids"].as_array().unwrap();
  assert_eq!(refs.len(), 2);
  assert_eq!(refs[0], parent_body["data"]["message_id"]);
}

#[tokio::test]
async fn unknown_parent_is_404() {
  let h = harness().await;
  let mut body = compose(true);
  body["parent_id"] = json!(9999);
  assert_eq!(h.post("/mail", body).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_recipients_and_body_are_422() {
  let h = harness().await;
  let (status, body) = h.post("/mail", json!({ "subject": "Hi" })).await;

  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["errors"]["reply_to"].is_array());
  assert!(body["errors"]["reply"].is_array());
}

#[tokio::test]
async fn create_emits_before_then_after() {
  let h = harness().await;
  let mut rx = h.events.subscribe();
  h.post("/mail", compose(false)).await;
  assert_eq!(drain(&mut rx), ["email.create.before", "email.create.after"]);
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_without_draft_flag_keeps_folders() {
  let h = harness().await;
  let id = draft(&h).await;

  let (status, body) = h
    .put(&format!("/mail/{id}"), json!({ "subject": "Revised", "is_read": true }))
    .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Email updated successfully.");
  assert_eq!(body["data"]["subject"], "Revised");
  assert_eq!(body["data"]["is_read"], true);
  assert_eq!(body["data"]["folders"], json!(["draft"]));
}

#[tokio::test]
async fn clearing_draft_flag_sends() {
  let h = harness().await;
  let id = draft(&h).await;

  let (status, body) = h.put(&format!("/mail/{id}"), json!({ "is_draft": false })).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Email sent successfully.");
  assert_eq!(body["data"]["folders"], json!(["inbox", "sent"]));
  assert_eq!(*h.mailer.sent.lock().unwrap(), [id]);
}

#[tokio::test]
async fn sending_a_draft_that_fails_stays_in_outbox() {
  let h = harness_with(FailingMailer).await;
  let id = draft(&h).await;

  let (status, body) = h.put(&format!("/mail/{id}"), json!({ "is_draft": 0 })).await;

  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["message"], "Email sent successfully.");
  assert_eq!(body["data"]["folders"], json!(["outbox"]));
  let stored = h.store.get_email(id).await.unwrap().unwrap();
  assert_eq!(stored.folders, [crm_core::email::Folder::Outbox]);
}

#[tokio::test]
async fn setting_draft_flag_moves_back_to_draft() {
  let h = harness_with(FailingMailer).await;
  let (_, body) = h.post("/mail", compose(false)).await;
  let id = body["data"]["id"].as_i64().unwrap();

  let (status, body) = h.put(&format!("/mail/{id}"), json!({ "is_draft": true })).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Email saved to draft successfully.");
  assert_eq!(body["data"]["folders"], json!(["draft"]));
}

#[tokio::test]
async fn update_of_unknown_email_is_404() {
  let h = harness().await;
  assert_eq!(
    h.put("/mail/9999", json!({ "subject": "x" })).await.0,
    StatusCode::NOT_FOUND
  );
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn trash_keeps_the_record() {
  let h = harness().await;
  let id = draft(&h).await;
  let mut rx = h.events.subscribe();

  let (status, body) = h.delete(&format!("/mail/{id}?type=trash")).await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Email deleted successfully.");
  let stored = h.store.get_email(id).await.unwrap().unwrap();
  assert_eq!(stored.folders, [crm_core::email::Folder::Trash]);
  assert_eq!(drain(&mut rx), ["email.trash.before", "email.trash.after"]);
}

#[tokio::test]
async fn delete_is_the_default() {
  let h = harness().await;
  let id = draft(&h).await;
  let mut rx = h.events.subscribe();

  let (status, _) = h.delete(&format!("/mail/{id}")).await;

  assert_eq!(status, StatusCode::OK);
  assert!(h.store.get_email(id).await.unwrap().is_none());
  assert_eq!(drain(&mut rx), ["email.delete.before", "email.delete.after"]);
}

#[tokio::test]
async fn unrecognised_delete_type_removes_the_record() {
  let h = harness().await;
  let id = draft(&h).await;
  let mut rx = h.events.subscribe();

  let (status, _) = h.delete(&format!("/mail/{id}?type=archive")).await;

  assert_eq!(status, StatusCode::OK);
  assert!(h.store.get_email(id).await.unwrap().is_none());
  assert_eq!(drain(&mut rx), ["email.delete.before", "email.delete.after"]);
}

#[tokio::test]
async fn failed_delete_is_500_and_keeps_the_email() {
  let (h, side) = harness_on_disk().await;
  let id = draft(&h).await;
  refuse(&side, "DELETE", "emails");

  let (status, body) = h.delete(&format!("/mail/{id}")).await;

  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["message"], "Email can not be deleted.");
  assert!(h.store.get_email(id).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_of_unknown_email_is_404() {
  let h = harness().await;
  assert_eq!(h.delete("/mail/9999").await.0, StatusCode::NOT_FOUND);
}

// ─── Mass operations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn mass_update_skips_unknown_ids() {
  let h = harness().await;
  let a = draft(&h).await;
  let b = draft(&h).await;

  let (status, body) = h
    .post("/mail/mass-update", json!({ "indices": [a, 9999, b], "folders": ["inbox"] }))
    .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Emails updated successfully.");
  for id in [a, b] {
    let stored = h.store.get_email(id).await.unwrap().unwrap();
    assert_eq!(stored.folders, [crm_core::email::Folder::Inbox]);
  }
}

#[tokio::test]
async fn mass_destroy_trashes_or_deletes() {
  let h = harness().await;
  let a = draft(&h).await;
  let b = draft(&h).await;
  let c = draft(&h).await;

  let (status, _) = h
    .post("/mail/mass-destroy?type=trash", json!({ "indices": [a, 9999] }))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    h.store.get_email(a).await.unwrap().unwrap().folders,
    [crm_core::email::Folder::Trash]
  );

  let (status, _) = h.post("/mail/mass-destroy", json!({ "indices": [b, c] })).await;
  assert_eq!(status, StatusCode::OK);
  assert!(h.store.get_email(b).await.unwrap().is_none());
  assert!(h.store.get_email(c).await.unwrap().is_none());
}

#[tokio::test]
async fn listing_filters_by_folder() {
  let h = harness().await;
  draft(&h).await;
  h.post("/mail", compose(false)).await;

  let (_, body) = h.get("/mail?folder=draft").await;
  assert_eq!(body["meta"]["total"], 1);
  let (_, body) = h.get("/mail?folder=sent").await;
  assert_eq!(body["meta"]["total"], 1);
  let (_, body) = h.get("/mail").await;
  assert_eq!(body["meta"]["total"], 2);
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn attachment_download_streams_file() {
  let h = harness().await;
  let email_id = draft(&h).await;
  std::fs::create_dir_all(h.storage_root.join("emails")).unwrap();
  std::fs::write(h.storage_root.join("emails/quote.pdf"), b"%PDF-1.4").unwrap();
  let attachment = h
    .store
    .create_attachment(NewAttachment {
      email_id,
      name: "quote.pdf".into(),
      path: "emails/quote.pdf".into(),
      size: Some(8),
      content_type: Some("application/pdf".into()),
    })
    .await
    .unwrap();

  let res = h
    .raw(Method::GET, &format!("/mail/attachments/{}/download", attachment.id), None)
    .await;

  assert_eq!(res.status(), StatusCode::OK);
  assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
  assert_eq!(
    res.headers()[header::CONTENT_DISPOSITION],
    "attachment; filename=\"quote.pdf\""
  );
  let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
  assert_eq!(&bytes[..], b"%PDF-1.4");
}

#[tokio::test]
async fn attachment_with_missing_file_is_404() {
  let h = harness().await;
  let email_id = draft(&h).await;
  let attachment = h
    .store
    .create_attachment(NewAttachment {
      email_id,
      name: "gone.txt".into(),
      path: "emails/gone.txt".into(),
      size: None,
      content_type: None,
    })
    .await
    .unwrap();

  let (status, _) = h.get(&format!("/mail/attachments/{}/download", attachment.id)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(h.get("/mail/attachments/9999/download").await.0, StatusCode::NOT_FOUND);
}
