use ledger_types::BlockHash;

use crate::chain::Chain;

/// Why a policy kept the current chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyRejection {
    #[error(
        "candidate chain of {candidate} blocks does not supersede the current chain of {current} blocks"
    )]
    NotLonger { current: usize, candidate: usize },
    #[error("candidate chain starts from genesis {found}, expected {expected}")]
    ForeignGenesis { expected: BlockHash, found: BlockHash },
}

/// Decides whether a candidate chain supersedes the current one.
///
/// Both arguments are [`Chain`]s, so a policy only ever sees candidates that
/// already passed full validation. Length alone says nothing about integrity.
pub trait ReplacementPolicy: Send + Sync {
    fn check(&self, current: &Chain, candidate: &Chain) -> Result<(), PolicyRejection>;

    fn accepts(&self, current: &Chain, candidate: &Chain) -> bool {
        self.check(current, candidate).is_ok()
    }
}

/// Longest-chain rule: strictly longer wins, ties keep the current chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestChain;

impl ReplacementPolicy for LongestChain {
    fn check(&self, current: &Chain, candidate: &Chain) -> Result<(), PolicyRejection> {
        if candidate.len() > current.len() {
            Ok(())
        } else {
            Err(PolicyRejection::NotLonger {
                current: current.len(),
                candidate: candidate.len(),
            })
        }
    }
}

/// Wraps another policy and additionally requires the candidate to share the
/// current chain's genesis block, so an unrelated history is never adopted
/// just for being longer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenesisAnchored<P = LongestChain> {
    inner: P,
}

impl<P> GenesisAnchored<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: ReplacementPolicy> ReplacementPolicy for GenesisAnchored<P> {
    fn check(&self, current: &Chain, candidate: &Chain) -> Result<(), PolicyRejection> {
        let expected = *current.genesis().hash();
        let found = *candidate.genesis().hash();
        if found != expected {
            return Err(PolicyRejection::ForeignGenesis { expected, found });
        }
        self.inner.check(current, candidate)
    }
}

impl ReplacementPolicy for Box<dyn ReplacementPolicy> {
    fn check(&self, current: &Chain, candidate: &Chain) -> Result<(), PolicyRejection> {
        (**self).check(current, candidate)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use ledger_types::{Block, BlockConstructor};

    use super::*;

    fn chain_from(genesis: Block, len: usize) -> Chain {
        let mut chain = Chain::from_genesis(genesis).unwrap();
        for bpm in 1..len {
            let block = BlockConstructor::next(chain.tip(), bpm as i64).build();
            chain.push(block).unwrap();
        }
        chain
    }

    fn genesis_at(secs: u32) -> Block {
        BlockConstructor::genesis().build_at(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, secs).unwrap())
    }

    #[test]
    fn test_longest_chain_rule() {
        let current = chain_from(genesis_at(0), 3);

        assert!(!LongestChain.accepts(&current, &chain_from(genesis_at(1), 2)));
        assert!(!LongestChain.accepts(&current, &chain_from(genesis_at(1), 3)));
        assert!(LongestChain.accepts(&current, &chain_from(genesis_at(1), 4)));
    }

    #[test]
    fn test_genesis_anchored_requires_shared_root() {
        let policy = GenesisAnchored::new(LongestChain);
        let current = chain_from(genesis_at(0), 2);

        let foreign = chain_from(genesis_at(1), 5);
        assert_eq!(
            policy.check(&current, &foreign),
            Err(PolicyRejection::ForeignGenesis {
                expected: *current.genesis().hash(),
                found: *foreign.genesis().hash(),
            })
        );

        let mut extended = current.clone();
        for bpm in [70, 71] {
            let block = BlockConstructor::next(extended.tip(), bpm).build();
            extended.push(block).unwrap();
        }
        assert!(policy.accepts(&current, &extended));
        assert_eq!(
            policy.check(&extended, &current),
            Err(PolicyRejection::NotLonger {
                current: 4,
                candidate: 2
            })
        );
    }

    #[test]
    fn test_boxed_policy() {
        let policy: Box<dyn ReplacementPolicy> = Box::new(LongestChain);
        let current = chain_from(genesis_at(0), 1);
        assert!(policy.accepts(&current, &chain_from(genesis_at(2), 2)));
    }
}
