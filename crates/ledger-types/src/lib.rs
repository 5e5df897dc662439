mod block;
pub mod consts;

pub use block::{
    Block, BlockConstructor, BlockHash, ParseHashError, calculate_hash, canonical_timestamp,
};
