#![allow(dead_code)]

use std::path::PathBuf;
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
use vidgen_worker::{Dispatcher, DispatcherConfig};

/// Build a test `ServerConfig` with safe defaults rooted at `dir`.
pub fn test_config(dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_workers: 2,
        engine_concurrency: 2,
        save_path: dir.join("results"),
        model_base: dir.join("ckpts"),
        engine_command: "unused".to_string(),
        engine_args: Vec::new(),
        seconds_per_step: 20,
    }
}

/// A fully wired application backed by a [`ScriptedEngine`].
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub engine: Arc<ScriptedEngine>,
    pub dir: tempfile::TempDir,
}

#[derive(Clone, Copy)]
pub struct Options {
    pub workers: usize,
    pub gated: bool,
    /// Load the engine before returning.
    pub loaded: bool,
    /// Every engine load fails.
    pub failing_load: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            workers: 2,
            gated: false,
            loaded: true,
            failing_load: false,
        }
    }
}

pub async fn build_test_app() -> TestApp {
    build_test_app_with(Options::default()).await
}

/// Build the full application router with the production middleware stack.
pub async fn build_test_app_with(options: Options) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.max_workers = options.workers;
    config.engine_concurrency = options.workers;

    let jobs = Arc::new(JobStore::new());
    let artifacts = Arc::new(
        ArtifactStore::open(&config.save_path, Arc::clone(&jobs))
            .await
            .unwrap(),
    );

    let scratch: PathBuf = dir.path().join("scratch");
    let engine = Arc::new(if options.failing_load {
        ScriptedEngine::failing_load(scratch)
    } else if options.gated {
        ScriptedEngine::gated(scratch)
    } else {
        ScriptedEngine::new(scratch)
    });
    let handle = EngineHandle::new(engine.clone());
    if options.loaded && !options.failing_load {
        handle.load().await.unwrap();
    }

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

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        engine,
        dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &TestApp, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn delete(app: &TestApp, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit a job and return its id.
pub async fn submit(app: &TestApp, body: serde_json::Value) -> String {
    let response = post_json(app, "/api/generate", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Poll `/api/status/{id}` until the job reaches `status`.
pub async fn wait_for_status(app: &TestApp, job_id: &str, status: &str) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let json = body_json(get(app, &format!("/api/status/{job_id}")).await).await;
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
