use ledger_types::{Block, consts::GENESIS_INDEX};

/// Why `cur` cannot follow `prev`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkMismatch {
    #[error("index gap: expected block {expected}, found block {found}")]
    IndexGap { expected: u64, found: u64 },
    #[error("block {index} does not reference the hash of its predecessor")]
    HashChainBroken { index: u64 },
    #[error("stored hash of block {index} does not match its contents")]
    HashRecomputeMismatch { index: u64 },
}

/// Why a whole sequence of blocks is not a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,
    #[error("genesis block must have index 0, found {found}")]
    GenesisIndex { found: u64 },
    #[error("genesis block must not reference a previous hash")]
    GenesisHasParent,
    #[error("block at position {position}: {source}")]
    Link {
        position: usize,
        #[source]
        source: LinkMismatch,
    },
}

impl ChainError {
    /// The link failure behind this error, if any.
    pub fn link_mismatch(&self) -> Option<LinkMismatch> {
        match self {
            Self::Link { source, .. } => Some(*source),
            _ => None,
        }
    }
}

/// Checks that `cur` may directly follow `prev`.
///
/// Order: index continuity, hash linkage, hash re-derivation. Stops at the
/// first failure.
pub fn validate_link(prev: &Block, cur: &Block) -> Result<(), LinkMismatch> {
    let expected = prev.index() + 1;
    if cur.index() != expected {
        return Err(LinkMismatch::IndexGap {
            expected,
            found: cur.index(),
        });
    }
    if cur.prev_hash() != Some(prev.hash()) {
        return Err(LinkMismatch::HashChainBroken { index: cur.index() });
    }
    if !cur.has_valid_hash() {
        return Err(LinkMismatch::HashRecomputeMismatch { index: cur.index() });
    }
    Ok(())
}

#[inline]
pub fn is_valid_link(prev: &Block, cur: &Block) -> bool {
    validate_link(prev, cur).is_ok()
}

/// Genesis rules: index 0, empty predecessor, hash matching its contents.
pub fn validate_genesis(genesis: &Block) -> Result<(), ChainError> {
    if genesis.index() != GENESIS_INDEX {
        return Err(ChainError::GenesisIndex {
            found: genesis.index(),
        });
    }
    if genesis.prev_hash().is_some() {
        return Err(ChainError::GenesisHasParent);
    }
    if !genesis.has_valid_hash() {
        return Err(ChainError::Link {
            position: 0,
            source: LinkMismatch::HashRecomputeMismatch {
                index: genesis.index(),
            },
        });
    }
    Ok(())
}

/// Checks a complete sequence: a valid genesis followed by valid links only.
///
/// Required for any chain that comes from outside the store, since it may be
/// forged or reordered.
pub fn validate_chain(blocks: &[Block]) -> Result<(), ChainError> {
    let genesis = blocks.first().ok_or(ChainError::Empty)?;
    validate_genesis(genesis)?;
    for (position, pair) in blocks.windows(2).enumerate() {
        validate_link(&pair[0], &pair[1]).map_err(|source| ChainError::Link {
            position: position + 1,
            source,
        })?;
    }
    Ok(())
}

#[inline]
pub fn is_valid_chain(blocks: &[Block]) -> bool {
    validate_chain(blocks).is_ok()
}
