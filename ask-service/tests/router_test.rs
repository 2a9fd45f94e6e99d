//! In-process router tests driven with `tower::ServiceExt::oneshot`.

mod common;

use ask_service::services::MockChatModel;
use ask_service::startup::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

fn router() -> axum::Router {
    build_router(AppState {
        config: common::test_config(0),
        model: Arc::new(MockChatModel::new(true)),
    })
}

#[tokio::test]
async fn ask_wraps_completion_in_response_key() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ask")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"prompt":"Say hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!({ "response": "Mock response for: Say hi" }));
}

#[tokio::test]
async fn non_object_body_is_rejected() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ask")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("[1, 2, 3]"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
