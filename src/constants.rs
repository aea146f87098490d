//! Ledger constants

/// Maximum height difference between the canonical tip and any retained fork
pub const CUT_OFF_AGE: u64 = 10;

/// Height of the genesis block
pub const GENESIS_HEIGHT: u64 = 1;

/// Value minted by a block's coinbase transaction
pub const COINBASE_REWARD: f64 = 25.0;
