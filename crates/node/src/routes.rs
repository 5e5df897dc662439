//! HTTP handlers over the chain store.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        Path, State,
        rejection::{BytesRejection, PathRejection},
    },
    http::StatusCode,
};
use ledger::Chain;
use ledger_types::{Block, BlockConstructor};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

use crate::{error::ApiError, json::PrettyJson, server::AppState};

/// Body of `POST /`.
#[derive(Debug, Deserialize)]
pub struct NewBlock {
    #[serde(rename = "BPM")]
    pub bpm: i64,
}

/// Body of `POST /chain`: a complete candidate chain, genesis first.
///
/// The upper bound is [`MAX_CANDIDATE_BLOCKS`](crate::MAX_CANDIDATE_BLOCKS).
#[derive(Debug, Deserialize, Validate)]
#[serde(transparent)]
pub struct CandidateChain {
    #[validate(min_items = 1)]
    #[validate(max_items = 10000)]
    pub blocks: Vec<Block>,
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::Malformed(err.to_string()))
}

/// GET /
pub async fn get_blockchain(
    State(state): State<AppState>,
) -> Result<PrettyJson<Arc<Chain>>, ApiError> {
    Ok(PrettyJson(state.store.snapshot()?))
}

/// POST /: generate a block on the current tip and append it
pub async fn append_block(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, PrettyJson<Block>), ApiError> {
    let NewBlock { bpm } = decode(&body?)?;

    let tip = state.store.current_tip()?;
    let block = BlockConstructor::next(&tip, bpm).build();
    commit_block(&state, block)
}

/// Append an already generated block; 201 only once it is stored.
///
/// A concurrent append may have moved the tip since `block` was generated,
/// in which case the block is dropped and the rejection is returned.
pub fn commit_block(
    state: &AppState,
    block: Block,
) -> Result<(StatusCode, PrettyJson<Block>), ApiError> {
    state.store.try_append(block.clone())?;
    Ok((StatusCode::CREATED, PrettyJson(block)))
}

/// GET /tip
pub async fn get_tip(State(state): State<AppState>) -> Result<PrettyJson<Block>, ApiError> {
    Ok(PrettyJson(state.store.current_tip()?))
}

/// GET /blocks/:index
pub async fn get_block(
    State(state): State<AppState>,
    index: Result<Path<u64>, PathRejection>,
) -> Result<PrettyJson<Block>, ApiError> {
    let Path(index) = index?;
    let chain = state.store.snapshot()?;
    chain
        .get(index)
        .cloned()
        .map(PrettyJson)
        .ok_or(ApiError::NotFound(index))
}

/// POST /chain: offer a whole candidate chain
pub async fn replace_chain(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<PrettyJson<Arc<Chain>>, ApiError> {
    let candidate: CandidateChain = decode(&body?)?;
    candidate
        .validate()
        .map_err(|err| ApiError::Malformed(err.to_string()))?;

    Ok(PrettyJson(state.store.try_replace(candidate.blocks)?))
}

/// GET /validate: re-check every stored link and hash
#[derive(Debug, Serialize)]
pub struct ValidateResp {
    pub ok: bool,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn validate_chain(
    State(state): State<AppState>,
) -> Result<PrettyJson<ValidateResp>, ApiError> {
    let chain = state.store.snapshot()?;
    let error = chain.verify().err().map(|err| err.to_string());
    Ok(PrettyJson(ValidateResp {
        ok: error.is_none(),
        length: chain.len(),
        error,
    }))
}

/// GET /health
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}
pub async fn health() -> PrettyJson<Health> {
    PrettyJson(Health { status: "ok" })
}

/// GET /version
#[derive(Serialize)]
pub struct Version {
    pub version: &'static str,
}
pub async fn version() -> PrettyJson<Version> {
    PrettyJson(Version {
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use axum::{body, response::IntoResponse};
    use serde_json::Value;

    use super::*;
    use crate::{MAX_CANDIDATE_BLOCKS, NodeConfig, build_store};

    fn state() -> AppState {
        AppState::new(build_store(&NodeConfig::default()))
    }

    #[tokio::test]
    async fn test_stale_block_is_not_reported_as_created() {
        let state = state();
        let genesis = state.store.current_tip().unwrap();

        // two blocks generated on the same tip; only the first can land
        let first = BlockConstructor::next(&genesis, 60).build();
        let stale = BlockConstructor::next(&genesis, 61).build();

        let (status, PrettyJson(stored)) = commit_block(&state, first.clone()).unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(stored, first);
        let before = state.store.snapshot().unwrap();

        let err = commit_block(&state, stale).unwrap_err();
        assert!(matches!(err, ApiError::Append(_)), "{err}");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(
            body["error"].as_str().unwrap().contains("rejected"),
            "{body}"
        );

        assert_eq!(state.store.snapshot().unwrap(), before);
        assert_eq!(state.store.len(), 2);
    }

    #[test]
    fn test_candidate_chain_size_bounds() {
        let genesis = BlockConstructor::genesis().build();
        let candidate = |len: usize| CandidateChain {
            blocks: vec![genesis.clone(); len],
        };

        assert!(candidate(0).validate().is_err());
        assert!(candidate(1).validate().is_ok());
        assert!(candidate(MAX_CANDIDATE_BLOCKS).validate().is_ok());
        assert!(candidate(MAX_CANDIDATE_BLOCKS + 1).validate().is_err());
    }
}
