use std::{future::Future, io, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ledger::{ChainStore, EmptyChainError, ReplacementPolicy};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{config::NodeConfig, error::ApiError, routes};

pub type SharedStore = Arc<ChainStore<Box<dyn ReplacementPolicy>>>;

/// Shared application state passed to axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("refusing to serve before the genesis block is installed")]
    NotInitialized(#[from] EmptyChainError),
    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Build the chain store with its genesis block already in place.
pub fn build_store(config: &NodeConfig) -> SharedStore {
    Arc::new(ChainStore::bootstrap(config.replacement_policy()))
}

pub fn router(state: AppState, config: &NodeConfig) -> Router {
    Router::new()
        .route("/", get(routes::get_blockchain).post(routes::append_block))
        .route("/tip", get(routes::get_tip))
        .route("/blocks/:index", get(routes::get_block))
        .route("/chain", post(routes::replace_chain))
        .route("/validate", get(routes::validate_chain))
        .route("/health", get(routes::health))
        .route("/version", get(routes::version))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(middleware::from_fn_with_state(
            config.request_timeout,
            enforce_timeout,
        ))
        .with_state(state)
}

async fn enforce_timeout(State(limit): State<Duration>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(%path, ?limit, "Request timed out");
            ApiError::Timeout.into_response()
        }
    }
}

/// Serve the node API on `listener` until `shutdown` resolves.
///
/// Fails up front if the store has no genesis block: requests must never
/// observe an empty chain.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    config: &NodeConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let genesis = state.store.snapshot()?.genesis().clone();
    let app = router(state, config);

    let address = listener.local_addr()?;
    info!(genesis = %genesis.hash(), "Listening on {address}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Server stopped");
    Ok(())
}
