mod chain;
mod policy;
mod store;
pub mod validation;

pub use chain::Chain;
pub use policy::{GenesisAnchored, LongestChain, PolicyRejection, ReplacementPolicy};
pub use store::{ChainStore, EmptyChainError, InitError, RejectedBlock, RejectedChain};
pub use validation::{
    ChainError, LinkMismatch, is_valid_chain, is_valid_link, validate_chain, validate_link,
};
