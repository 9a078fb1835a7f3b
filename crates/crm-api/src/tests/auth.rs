use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use tower::ServiceExt;

use super::*;

#[tokio::test]
async fn missing_credentials_get_401_with_challenge() {
  let h = harness().await;
  let req = Request::builder().uri("/contacts/persons").body(Body::empty()).unwrap();
  let res = h.app.clone().oneshot(req).await.unwrap();

  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(
    res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
    "Basic realm=\"crm\""
  );
}

#[tokio::test]
async fn wrong_password_is_rejected_before_the_handler_runs() {
  let h = harness().await;
  let mut rx = h.events.subscribe();
  let req = Request::builder()
    .method("POST")
    .uri("/contacts/persons")
    .header(header::AUTHORIZATION, basic(USERNAME, "wrong"))
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(r#"{"name":"Ada"}"#))
    .unwrap();
  let res = h.app.clone().oneshot(req).await.unwrap();

  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn valid_credentials_pass() {
  let h = harness().await;
  let (status, body) = h.get("/contacts/persons").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["meta"]["total"], 0);
}
