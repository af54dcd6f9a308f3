//! Integration tests for health, info, the banner and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get, post_json, submit, wait_for_status, Options};
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health reflects engine readiness and job counts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_initializing_until_engine_loads() {
    let app = common::build_test_app_with(Options {
        loaded: false,
        ..Default::default()
    })
    .await;

    let json = body_json(get(&app, "/health").await).await;
    assert_eq!(json["status"], "initializing");
    assert_eq!(json["model_loaded"], false);
    assert_eq!(json["active_jobs"], 0);
    assert_eq!(json["total_jobs"], 0);

    let response = post_json(&app, "/api/generate", json!({ "prompt": "too early" })).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(app.state.jobs.counts().total, 0);

    app.state.engine.load().await.unwrap();

    let json = body_json(get(&app, "/health").await).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model_loaded"], true);

    let response = post_json(&app, "/api/generate", json!({ "prompt": "now" })).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn failed_engine_load_keeps_service_initializing() {
    let app = common::build_test_app_with(Options {
        failing_load: true,
        ..Default::default()
    })
    .await;

    app.state.engine.spawn_load().await.unwrap();
    assert!(!app.state.engine.is_loaded());

    let json = body_json(get(&app, "/health").await).await;
    assert_eq!(json["status"], "initializing");
    assert_eq!(json["model_loaded"], false);

    let response = post_json(&app, "/api/generate", json!({ "prompt": "never" })).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.state.jobs.counts().total, 0);
}

#[tokio::test]
async fn health_counts_active_and_total_jobs() {
    let app = common::build_test_app_with(Options {
        workers: 1,
        gated: true,
        ..Default::default()
    })
    .await;

    let first = submit(&app, json!({ "prompt": "one" })).await;
    submit(&app, json!({ "prompt": "two" })).await;

    let json = body_json(get(&app, "/health").await).await;
    assert_eq!(json["active_jobs"], 2);
    assert_eq!(json["total_jobs"], 2);

    app.engine.release(1);
    wait_for_status(&app, &first, "completed").await;

    let json = body_json(get(&app, "/health").await).await;
    assert_eq!(json["active_jobs"], 1);
    assert_eq!(json["total_jobs"], 2);
    app.engine.release(1);
}

// ---------------------------------------------------------------------------
// Test: static documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn info_lists_ranges_and_presets() {
    let app = common::build_test_app().await;

    let response = get(&app, "/api/info").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["workers"], 2);
    assert_eq!(json["parameters"]["width"]["min"], 256);
    assert_eq!(json["parameters"]["width"]["max"], 1280);
    assert_eq!(json["parameters"]["video_length"]["default"], 61);
    assert_eq!(json["parameters"]["num_inference_steps"]["max"], 50);
    assert_eq!(json["presets"]["portrait_60s"]["width"], 544);
    assert_eq!(json["presets"]["portrait_60s"]["height"], 960);
    assert_eq!(json["presets"]["landscape_30s"]["video_length"], 65);
    assert_eq!(json["estimated_generation_time"]["seconds_per_step"], 20);
    assert_eq!(json["estimated_generation_time"]["default_job_secs"], 600);
}

#[tokio::test]
async fn root_lists_endpoints() {
    let app = common::build_test_app().await;

    let json = body_json(get(&app, "/").await).await;
    assert_eq!(json["status"], "running");
    assert_eq!(json["endpoints"]["generate"], "/api/generate");
}

// ---------------------------------------------------------------------------
// Test: middleware behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app().await;
    let response = get(&app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app().await;
    let response = get(&app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let app = common::build_test_app().await;

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/generate")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}
