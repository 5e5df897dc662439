use ledger_types::Block;
use serde::Serialize;

use crate::validation::{ChainError, LinkMismatch, validate_chain, validate_genesis, validate_link};

/// Ordered, hash-linked sequence of blocks rooted at a genesis block.
///
/// Only ever built through validation, so holding a `Chain` means every
/// invariant already holds.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    pub fn from_genesis(genesis: Block) -> Result<Self, ChainError> {
        validate_genesis(&genesis)?;
        Ok(Self {
            blocks: vec![genesis],
        })
    }

    pub fn genesis(&self) -> &Block {
        self.blocks.first().expect("Chain has at least one block")
    }

    pub fn tip(&self) -> &Block {
        self.blocks.last().expect("Chain has at least one block")
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true for a chain that passed validation.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Block at `index`; indices and positions coincide in a valid chain.
    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Append `block` if it extends the tip.
    pub fn push(&mut self, block: Block) -> Result<(), LinkMismatch> {
        validate_link(self.tip(), &block)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Caller has already run `validate_link` against the current tip.
    pub(crate) fn push_linked(&mut self, block: Block) {
        debug_assert!(
            validate_link(self.tip(), &block).is_ok(),
            "Block {} must extend the tip",
            block.index()
        );
        self.blocks.push(block);
    }

    /// Re-run full validation over the stored blocks.
    pub fn verify(&self) -> Result<(), ChainError> {
        validate_chain(&self.blocks)
    }
}

impl TryFrom<Vec<Block>> for Chain {
    type Error = ChainError;

    fn try_from(blocks: Vec<Block>) -> Result<Self, Self::Error> {
        validate_chain(&blocks)?;
        Ok(Self { blocks })
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use ledger_types::BlockConstructor;
    use serde_json::json;

    use super::*;

    fn grow(chain: &mut Chain, bpms: &[i64]) {
        for &bpm in bpms {
            let block = BlockConstructor::next(chain.tip(), bpm).build();
            chain.push(block).unwrap();
        }
    }

    #[test]
    fn test_chain_from_genesis() {
        let genesis = BlockConstructor::genesis().build();
        let chain = Chain::from_genesis(genesis.clone()).unwrap();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.genesis(), &genesis);
        assert_eq!(chain.tip(), &genesis);
        assert!(!chain.is_empty());
    }

    #[test]
    fn test_chain_rejects_non_genesis_root() {
        let genesis = BlockConstructor::genesis().build();
        let block = BlockConstructor::next(&genesis, 60).build();
        assert_eq!(
            Chain::from_genesis(block),
            Err(ChainError::GenesisIndex { found: 1 })
        );
    }

    #[test]
    fn test_push_extends_tip() {
        let mut chain = Chain::from_genesis(BlockConstructor::genesis().build()).unwrap();
        grow(&mut chain, &[60, 72]);

        assert_eq!(chain.len(), 3);
        assert_eq!(chain.tip().bpm(), 72);
        assert_eq!(chain.get(1).map(Block::bpm), Some(60));
        assert_eq!(chain.get(3), None);
        assert_eq!(chain.verify(), Ok(()));
    }

    #[test]
    fn test_push_rejects_stale_block() {
        let mut chain = Chain::from_genesis(BlockConstructor::genesis().build()).unwrap();
        let stale = BlockConstructor::next(chain.tip(), 60).build();
        grow(&mut chain, &[72]);

        assert_eq!(
            chain.push(stale),
            Err(LinkMismatch::IndexGap {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_try_from_validates() {
        let mut chain = Chain::from_genesis(BlockConstructor::genesis().build()).unwrap();
        grow(&mut chain, &[60, 72, 80]);

        let mut blocks = chain.clone().into_blocks();
        assert_eq!(Chain::try_from(blocks.clone()), Ok(chain));

        blocks.remove(1);
        assert!(Chain::try_from(blocks).is_err());
        assert_eq!(Chain::try_from(Vec::new()), Err(ChainError::Empty));
    }

    #[test]
    fn test_chain_serializes_as_array() {
        let chain = Chain::from_genesis(BlockConstructor::genesis().build()).unwrap();
        let value = serde_json::to_value(&chain).unwrap();

        assert!(value.is_array());
        assert_eq!(value[0]["Index"], json!(0));
        assert_eq!(value[0]["PrevHash"], json!(""));
    }
}
