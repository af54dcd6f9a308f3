use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidgen_webhook::config::WebhookConfig;
use vidgen_webhook::router::build_webhook_router;
use vidgen_webhook::state::WebhookState;
use vidgen_webhook::upstream::ApiClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidgen_webhook=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WebhookConfig::from_env().unwrap_or_else(|e| fatal("Invalid configuration", e));
    tracing::info!(
        host = %config.host,
        port = config.port,
        api_base_url = %config.api_base_url,
        "Loaded webhook configuration",
    );

    let api = ApiClient::new(
        config.api_base_url.clone(),
        Duration::from_secs(config.upstream_timeout_secs),
    )
    .unwrap_or_else(|e| fatal("Failed to build HTTP client", e));

    let state = WebhookState {
        api: Arc::new(api),
        config: Arc::new(config.clone()),
    };
    let app = build_webhook_router(state, &config);

    let host: IpAddr = config
        .host
        .parse()
        .unwrap_or_else(|e| fatal("Invalid WEBHOOK_HOST address", e));
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting webhook gateway");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| fatal("Failed to bind to address", e));

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    tracing::info!("Webhook gateway stopped");
}

fn fatal(context: &str, err: impl Display) -> ! {
    tracing::error!(error = %err, "{context}");
    std::process::exit(1)
}

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
