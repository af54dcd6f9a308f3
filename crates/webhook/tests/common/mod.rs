#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use vidgen_api::config::ServerConfig;
use vidgen_api::router::build_app_router;
use vidgen_api::state::AppState;
use vidgen_engine::testing::ScriptedEngine;
use vidgen_engine::EngineHandle;
use vidgen_store::{ArtifactStore, JobStore};
use vidgen_webhook::config::WebhookConfig;
use vidgen_webhook::router::build_webhook_router;
use vidgen_webhook::state::WebhookState;
use vidgen_webhook::upstream::ApiClient;
use vidgen_worker::{Dispatcher, DispatcherConfig};

/// Nothing listens here; connections are refused immediately.
pub const UNREACHABLE_API: &str = "http://127.0.0.1:1";

/// A real API gateway serving on a loopback port.
pub struct UpstreamApi {
    pub base_url: String,
    pub state: AppState,
    pub engine: Arc<ScriptedEngine>,
    pub dir: tempfile::TempDir,
}

/// Serve `router` on an ephemeral loopback port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Start a loaded API gateway backed by a [`ScriptedEngine`].
pub async fn spawn_api(gated: bool) -> UpstreamApi {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        max_workers: 2,
        engine_concurrency: 2,
        save_path: dir.path().join("results"),
        model_base: dir.path().join("ckpts"),
        engine_command: "unused".to_string(),
        engine_args: Vec::new(),
        seconds_per_step: 20,
    };

    let jobs = Arc::new(JobStore::new());
    let artifacts = Arc::new(
        ArtifactStore::open(&config.save_path, Arc::clone(&jobs))
            .await
            .unwrap(),
    );

    let scratch = dir.path().join("scratch");
    let engine = Arc::new(if gated {
        ScriptedEngine::gated(scratch)
    } else {
        ScriptedEngine::new(scratch)
    });
    let handle = EngineHandle::new(engine.clone());
    handle.load().await.unwrap();

    let dispatcher = Dispatcher::start(
        DispatcherConfig {
            workers: config.max_workers,
            engine_concurrency: config.engine_concurrency,
        },
        Arc::clone(&jobs),
        Arc::clone(&artifacts),
        Arc::clone(&handle),
    );

    let state = AppState {
        jobs,
        artifacts,
        dispatcher,
        engine: handle,
        config: Arc::new(config.clone()),
    };
    let base_url = serve(build_app_router(state.clone(), &config)).await;

    UpstreamApi {
        base_url,
        state,
        engine,
        dir,
    }
}

/// Build the webhook router pointed at `api_base_url`.
pub fn build_webhook(api_base_url: &str) -> Router {
    let config = WebhookConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_base_url: api_base_url.to_string(),
        upstream_timeout_secs: 5,
        estimated_secs: 900,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
    };
    let api = ApiClient::new(
        config.api_base_url.clone(),
        Duration::from_secs(config.upstream_timeout_secs),
    )
    .unwrap();
    let state = WebhookState {
        api: Arc::new(api),
        config: Arc::new(config.clone()),
    };
    build_webhook_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    post_raw(app, uri, "application/json", body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, content_type: &str, body: String) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Submit through the webhook and return the job id.
pub async fn submit(app: &Router, body: serde_json::Value) -> String {
    let response = post_json(app, "/webhook/generate", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Poll `/webhook/status/{id}` until the job reaches `status`.
pub async fn wait_for_status(app: &Router, job_id: &str, status: &str) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let json = body_json(get(app, &format!("/webhook/status/{job_id}")).await).await;
        if json["status"] == status {
            return json;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} never reached {status}; last: {json}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
