use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use cognicode_core::CogniCodeConfig;
use cognicode_server::{create_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_pool_and_memory() {
    let state = AppState::new(CogniCodeConfig::default());
    let (status, body) = get_json(state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "production");
    assert_eq!(body["agents"]["linter_agents"], 1);
    assert_eq!(body["agents"]["refactor_agents"], 1);
    assert_eq!(body["agents"]["testgen_agents"], 1);
    assert_eq!(body["agents"]["active_connections"], 0);
    assert_eq!(body["agents"]["initialized"], true);
    assert!(body["memory"]["total_bytes"].is_u64());
    assert_eq!(body["cache"]["capacity"], 1000);
}

#[tokio::test]
async fn agents_status_lists_every_capability() {
    let state = AppState::new(CogniCodeConfig::default());
    let (status, body) = get_json(state, "/api/agents/status").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["agents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|agent| agent["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["linter", "refactor", "testgen"]);

    let linter = &body["agents"][0];
    assert_eq!(linter["status"], "ready");
    assert_eq!(linter["model"], "microsoft/codebert-base");
    assert!(linter["lastRun"].is_null());
    assert!(linter["capabilities"].as_array().unwrap().len() >= 1);
    assert_eq!(body["poolStatus"]["initialized"], true);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let state = AppState::new(CogniCodeConfig::default());
    let response = create_router(state)
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_is_open_in_development_only() {
    let mut dev = CogniCodeConfig::default();
    dev.server.environment = "development".into();
    let response = create_router(AppState::new(dev))
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://example.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );

    let response = create_router(AppState::new(CogniCodeConfig::default()))
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://example.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let response = create_router(AppState::new(CogniCodeConfig::default()))
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
}
