pub const GENESIS_INDEX: u64 = 0;
pub const GENESIS_BPM: i64 = 0;
