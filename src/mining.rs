//! Block assembly from the mempool

use crate::chain::BlockChain;
use crate::crypto::{short_hash, SignatureVerifier};
use crate::error::Result;
use crate::settlement::handle_txs;
use crate::types::*;
use tracing::debug;

/// CreateNewBlock: 𝒞 × 𝕊 → ℬ
///
/// 1. Take the canonical tip and its pool
/// 2. Settle every pending transaction against that pool
/// 3. Include the accepted transactions in acceptance order, paying the
///    coinbase to `coinbase_owner`
///
/// The result is admissible by [`BlockChain::add_block`] as long as the
/// chain is not modified in between. Pending transactions that do not settle
/// stay in the mempool.
pub fn create_new_block<V: SignatureVerifier>(
    chain: &BlockChain<V>,
    coinbase_owner: ByteString,
) -> Result<Block> {
    let parent = chain.get_max_height_block()?;
    let utxo_pool = chain.get_max_height_utxo_pool()?;
    let pending = chain.get_transaction_pool().transactions();

    let settlement = handle_txs(utxo_pool, &pending, chain.verifier())?;

    let mut block = Block::new(Some(parent.hash), coinbase_owner);
    for tx in settlement.accepted {
        block.add_transaction(tx);
    }
    block.finalize();

    debug!(
        block = %short_hash(&block.hash),
        parent = %short_hash(&parent.hash),
        pending = pending.len(),
        included = block.transactions.len(),
        "assembled block"
    );
    Ok(block)
}
