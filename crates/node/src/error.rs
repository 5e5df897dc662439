use axum::{
    extract::rejection::{BytesRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger::{EmptyChainError, RejectedBlock, RejectedChain};
use serde_json::json;
use tracing::{debug, error};

use crate::json::PrettyJson;

/// Everything a handler can fail with, mapped onto a status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("request body too large: {0}")]
    PayloadTooLarge(String),
    #[error(transparent)]
    Append(#[from] RejectedBlock),
    #[error(transparent)]
    Replace(#[from] RejectedChain),
    #[error(transparent)]
    EmptyChain(#[from] EmptyChainError),
    #[error("block {0} not found")]
    NotFound(u64),
    #[error("request timed out")]
    Timeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Append(_) | Self::EmptyChain(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Replace(RejectedChain::InvalidCandidate(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Replace(RejectedChain::NotLonger { .. } | RejectedChain::ForeignGenesis { .. }) => {
                StatusCode::CONFLICT
            }
            Self::Replace(RejectedChain::EmptyChain(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, Self::EmptyChain(_) | Self::Replace(RejectedChain::EmptyChain(_))) {
            // unreachable once startup has installed the genesis block
            error!(err = %self, "Chain store is empty");
        } else {
            debug!(%status, err = %self, "Request failed");
        }
        (status, PrettyJson(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        // the body limit layer surfaces as a buffering failure with status 413
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::Malformed(rejection.body_text())
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}
