use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ledger_types::{Block, BlockConstructor, BlockHash};
use tracing::{debug, info, warn};

use crate::{
    chain::Chain,
    policy::{LongestChain, PolicyRejection, ReplacementPolicy},
    validation::{ChainError, LinkMismatch, validate_link},
};

/// The store was read before a genesis block was installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("chain store has no genesis block")]
pub struct EmptyChainError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("chain store already holds a chain")]
    AlreadyInitialized,
    #[error("invalid genesis block: {0}")]
    InvalidGenesis(#[from] ChainError),
}

/// A block that was not appended. The block itself is discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectedBlock {
    #[error("block {index} rejected: {reason}")]
    LinkMismatch {
        index: u64,
        #[source]
        reason: LinkMismatch,
    },
    #[error(transparent)]
    EmptyChain(#[from] EmptyChainError),
}

/// A candidate chain that did not replace the canonical one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectedChain {
    #[error("invalid candidate chain: {0}")]
    InvalidCandidate(#[from] ChainError),
    #[error(
        "candidate chain of {candidate} blocks does not supersede the current chain of {current} blocks"
    )]
    NotLonger { current: usize, candidate: usize },
    #[error("candidate chain starts from genesis {found}, expected {expected}")]
    ForeignGenesis { expected: BlockHash, found: BlockHash },
    #[error(transparent)]
    EmptyChain(#[from] EmptyChainError),
}

impl From<PolicyRejection> for RejectedChain {
    fn from(rejection: PolicyRejection) -> Self {
        match rejection {
            PolicyRejection::NotLonger { current, candidate } => {
                Self::NotLonger { current, candidate }
            }
            PolicyRejection::ForeignGenesis { expected, found } => {
                Self::ForeignGenesis { expected, found }
            }
        }
    }
}

/// Owner of the canonical chain.
///
/// The chain sits behind an `Arc` that writers swap or copy-on-write under the
/// write lock. Readers clone the `Arc` and keep a consistent snapshot for as
/// long as they like without holding the lock.
pub struct ChainStore<P: ReplacementPolicy = LongestChain> {
    chain: RwLock<Option<Arc<Chain>>>,
    policy: P,
}

impl ChainStore<LongestChain> {
    /// Uninitialized store using the longest-chain rule.
    pub fn new() -> Self {
        Self::with_policy(LongestChain)
    }
}

impl Default for ChainStore<LongestChain> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ReplacementPolicy> ChainStore<P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            chain: RwLock::new(None),
            policy,
        }
    }

    /// Build a store and install `genesis` before anyone can see it.
    pub fn with_genesis(policy: P, genesis: Block) -> Result<Self, InitError> {
        let store = Self::with_policy(policy);
        store.initialize(genesis)?;
        Ok(store)
    }

    /// Build a store around a freshly generated genesis block.
    pub fn bootstrap(policy: P) -> Self {
        let genesis = BlockConstructor::genesis().build();
        let chain = Chain::from_genesis(genesis).expect("Generated genesis block is valid");
        info!(hash = %chain.genesis().hash(), "Genesis block installed");
        Self {
            chain: RwLock::new(Some(Arc::new(chain))),
            policy,
        }
    }

    /// Install the genesis block. Only allowed once.
    pub fn initialize(&self, genesis: Block) -> Result<Arc<Chain>, InitError> {
        let mut guard = self.write();
        if guard.is_some() {
            return Err(InitError::AlreadyInitialized);
        }
        let chain = Arc::new(Chain::from_genesis(genesis)?);
        info!(hash = %chain.genesis().hash(), "Genesis block installed");
        *guard = Some(Arc::clone(&chain));
        Ok(chain)
    }

    pub fn is_initialized(&self) -> bool {
        self.read().is_some()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Consistent view of the whole chain.
    pub fn snapshot(&self) -> Result<Arc<Chain>, EmptyChainError> {
        self.read().as_ref().map(Arc::clone).ok_or(EmptyChainError)
    }

    pub fn current_tip(&self) -> Result<Block, EmptyChainError> {
        self.read()
            .as_ref()
            .map(|chain| chain.tip().clone())
            .ok_or(EmptyChainError)
    }

    /// Number of blocks in the canonical chain, 0 before genesis.
    pub fn len(&self) -> usize {
        self.read().as_ref().map_or(0, |chain| chain.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `block` iff it extends the current tip. All or nothing.
    pub fn try_append(&self, block: Block) -> Result<Arc<Chain>, RejectedBlock> {
        let mut guard = self.write();
        let current = guard.as_mut().ok_or(EmptyChainError)?;

        if let Err(reason) = validate_link(current.tip(), &block) {
            warn!(index = block.index(), %reason, "Rejected block");
            return Err(RejectedBlock::LinkMismatch {
                index: block.index(),
                reason,
            });
        }

        info!(index = block.index(), hash = %block.hash(), bpm = block.bpm(), "Block appended");
        // Copies the chain only while a reader still holds the previous snapshot
        Arc::make_mut(current).push_linked(block);
        let chain = Arc::clone(current);
        drop(guard);

        debug!(?chain, "Chain extended");
        Ok(chain)
    }

    /// Swap in `candidate` iff it is a valid chain and the policy prefers it.
    pub fn try_replace(&self, candidate: Vec<Block>) -> Result<Arc<Chain>, RejectedChain> {
        // Validation is pure, so it runs before the write lock is taken
        let candidate = Chain::try_from(candidate).inspect_err(|err| {
            warn!(%err, "Rejected invalid candidate chain");
        })?;

        let mut guard = self.write();
        let current = guard.as_ref().ok_or(EmptyChainError)?;

        if let Err(rejection) = self.policy.check(current, &candidate) {
            warn!(%rejection, "Candidate chain kept out by replacement policy");
            return Err(rejection.into());
        }

        info!(
            previous = current.len(),
            length = candidate.len(),
            tip = %candidate.tip().hash(),
            "Chain replaced"
        );
        let candidate = Arc::new(candidate);
        *guard = Some(Arc::clone(&candidate));
        drop(guard);

        debug!(chain = ?candidate, "Replacement chain installed");
        Ok(candidate)
    }

    // The guarded value is only ever replaced whole, so a panic while the
    // lock was held cannot leave it half-updated.
    fn read(&self) -> RwLockReadGuard<'_, Option<Arc<Chain>>> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Arc<Chain>>> {
        self.chain.write().unwrap_or_else(PoisonError::into_inner)
    }
}
