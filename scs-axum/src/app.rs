use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use scs_core::MissionService;
use serde_json::{json, Value};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rest;
use crate::state::{ApiOptions, ApiState};

pub const API_PREFIX: &str = "/api/v1";

pub struct AxumApp {
    pub state: ApiState,
    pub router: Router<()>,
}

impl Clone for AxumApp {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({"status": "OK"}))
}

impl AxumApp {
    pub fn new(missions: Arc<dyn MissionService>, options: ApiOptions) -> Self {
        let state = ApiState::new(missions, options);
        let body_limit = state.options.multipart.max_total_size;

        let api = Router::new()
            .route("/health", get(health))
            .nest("/missions", rest::mission_router(state.clone()));

        let router = Router::new()
            .nest(API_PREFIX, api)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            );

        Self { state, router }
    }

    /// Serve until SIGINT/SIGTERM. After the signal no new connections are
    /// accepted; in-flight requests get `grace` to finish before their
    /// contexts are cancelled.
    pub async fn listen<A>(self, addr: A, grace: Duration) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        self.listen_until(addr, grace, shutdown_signal()).await
    }

    pub async fn listen_until<A, S>(self, addr: A, grace: Duration, signal: S) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
        S: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");

        let drain = CancellationToken::new();
        let cancel_requests = self.state.shutdown.clone();

        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown({
                let drain = drain.clone();
                async move { drain.cancelled().await }
            })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            res = &mut serve => return res.map_err(Into::into),
            _ = signal => {
                tracing::info!(grace_secs = grace.as_secs(), "shutdown signal received, draining");
                drain.cancel();
            }
        }

        match tokio::time::timeout(grace, &mut serve).await {
            Ok(res) => res?,
            Err(_) => {
                tracing::warn!("grace period elapsed, cancelling in-flight requests");
                cancel_requests.cancel();
                if tokio::time::timeout(Duration::from_secs(1), &mut serve).await.is_err() {
                    tracing::warn!("connections still open after cancellation");
                }
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
