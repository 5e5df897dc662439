mod config;
mod error;
mod json;
pub mod routes;
mod server;

pub use config::{
    ConfigError, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT,
    MAX_CANDIDATE_BLOCKS, MAX_ENCODED_BLOCK_BYTES, NodeConfig, parse_listen_addr,
};
pub use error::ApiError;
pub use json::PrettyJson;
pub use server::{AppState, ServeError, SharedStore, build_store, router, serve};
