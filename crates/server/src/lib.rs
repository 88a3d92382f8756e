//! Codesmith HTTP front end.
//!
//! Exposes a [`nodes::PipelineExecutor`] over JSON:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | POST | `/api/generate` | run one request through the pipeline |
//! | GET | `/api/requests/:id` | state snapshot of a previous run |
//! | GET | `/api/health` | liveness plus the active model |
//! | GET | `/api/config` | provider, model and endpoint in use |
//! | GET | `/api/examples` | the built-in example catalog |
//! | GET | `/api/test-agents` | self-test of the local checkers |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Handlers translate HTTP to executor calls and back;
//! all pipeline semantics stay in `nodes`.

mod catalog;
mod error;
mod routes;
mod state;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

pub use catalog::{example, ExampleRequest, EXAMPLES};
pub use error::ServerError;
pub use routes::router;
pub use state::{AppState, ProviderInfo};

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, provider = %state.provider().provider, "HTTP front end listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl-C; shutting down");
        return;
    }
    info!("Shutdown signal received");
}
