use std::{future::Future, io, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::{sync::oneshot, task::JoinError};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod id;
mod models;
mod store;

use store::UrlStore;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub store: UrlStore,
    pub config: config::AppConfig,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent; env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortly=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting shortly on {}:{}", config.host, config.port);
    tracing::info!("Base URL: {}", config.base_url);

    // A bad data file is not fatal: keep serving from an empty store.
    let store = UrlStore::new(&config.data_file);
    if let Err(e) = store.load().await {
        tracing::error!("Loading data failed, starting with an empty store: {}", e);
    }

    let state = Arc::new(AppState { store, config });

    // ── Serve ──────────────────────────────────────────────────────────────
    let bind_addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    run(listener, state, shutdown_signal()).await
}

/// Serve until `shutdown` resolves or the server stops on its own, then save
/// the store one last time.
///
/// After `shutdown`, in-flight requests get `config.shutdown_grace` to finish
/// before the server task is aborted. A server that exits with an error still
/// gets the final save, and the error is returned afterwards.
async fn run(
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let router = app(state.clone());
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                stop_rx.await.ok();
            })
            .await
    });

    let mut outcome = Ok(());

    tokio::select! {
        res = &mut server => {
            // Server ended without being asked to; still flush below.
            outcome = unexpected_exit(res);
        }
        _ = shutdown => {
            tracing::info!("Shutting down server..");
            let _ = stop_tx.send(());

            let grace = state.config.shutdown_grace;
            match tokio::time::timeout(grace, &mut server).await {
                Ok(Ok(Ok(()))) => tracing::info!("All in-flight requests finished"),
                Ok(Ok(Err(e))) => tracing::error!("Shutdown error: {}", e),
                Ok(Err(e)) => tracing::error!("Server task failed: {}", e),
                Err(_) => {
                    tracing::warn!(
                        "Grace period of {:?} elapsed with requests still in flight",
                        grace
                    );
                    server.abort();
                }
            }
        }
    }

    // Final flush
    match state.store.save().await {
        Ok(()) => tracing::info!("Data saved to {}", state.store.path().display()),
        Err(e) => tracing::error!("Error saving data: {}", e),
    }

    tracing::info!("Bye!");
    outcome
}

/// Log a server task that ended before shutdown was requested. An error exit
/// is handed back so the process exits non-zero.
fn unexpected_exit(res: Result<io::Result<()>, JoinError>) -> anyhow::Result<()> {
    match res {
        Ok(Ok(())) => {
            tracing::warn!("Server exited unexpectedly");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("Server error: {}", e);
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("Server task failed: {}", e);
            Err(e.into())
        }
    }
}

/// Build the HTTP router around the shared state.
fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Liveness probe
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        .route("/shorten", post(handlers::shorten::shorten))
        // Short-id redirect is the catch-all, so it goes last
        .route("/:id", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Resolve on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
