use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidgen_api::config::ServerConfig;
use vidgen_api::router::build_app_router;
use vidgen_api::state::AppState;
use vidgen_engine::{CommandEngine, CommandEngineConfig, EngineHandle};
use vidgen_store::{ArtifactStore, JobStore};
use vidgen_worker::{Dispatcher, DispatcherConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vidgen_api=debug,vidgen_worker=debug,vidgen_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| fatal("Invalid configuration", e));
    tracing::info!(
        host = %config.host,
        port = config.port,
        workers = config.max_workers,
        save_path = %config.save_path.display(),
        "Loaded server configuration",
    );

    // --- Stores ---
    let jobs = Arc::new(JobStore::new());
    let artifacts = ArtifactStore::open(&config.save_path, Arc::clone(&jobs))
        .await
        .unwrap_or_else(|e| fatal("Failed to open artifact directory", e));
    let artifacts = Arc::new(artifacts);

    // --- Engine ---
    let engine = EngineHandle::new(Arc::new(CommandEngine::new(CommandEngineConfig {
        program: config.engine_command.clone(),
        args: config.engine_args.clone(),
        model_base: config.model_base.clone(),
        work_dir: config.work_dir(),
    })));
    // Load in the background; the API answers 503 on /api/generate until done.
    engine.spawn_load();

    // --- Dispatcher ---
    let dispatcher = Dispatcher::start(
        DispatcherConfig {
            workers: config.max_workers,
            engine_concurrency: config.engine_concurrency,
        },
        Arc::clone(&jobs),
        Arc::clone(&artifacts),
        Arc::clone(&engine),
    );

    // --- App state ---
    let state = AppState {
        jobs,
        artifacts,
        dispatcher: Arc::clone(&dispatcher),
        engine,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .unwrap_or_else(|e| fatal("Invalid HOST address", e));
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| fatal("Failed to bind to address", e));

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, waiting for running jobs");
    dispatcher.shutdown().await;

    tracing::info!("Graceful shutdown complete");
}

/// Log a startup failure and exit.
fn fatal(context: &str, err: impl Display) -> ! {
    tracing::error!(error = %err, "{context}");
    std::process::exit(1)
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
