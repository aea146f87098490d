//! Batch settlement of candidate transactions
//!
//! Settlement takes an unordered batch and returns the largest subset that can
//! be applied together, in an order where every producer precedes its
//! consumers.

use crate::crypto::{short_hash, SignatureVerifier};
use crate::error::{ConsensusError, Result};
use crate::transaction::{apply_transaction, is_valid_tx};
use crate::types::*;
use tracing::{debug, trace};

/// Outcome of settling a batch
#[derive(Debug, Clone)]
pub struct Settlement {
    /// Accepted transactions, in the order they became valid
    pub accepted: Vec<Transaction>,
    /// Pool after applying every accepted transaction
    pub utxo_pool: UtxoPool,
}

/// HandleTxs: 𝒰𝒮 × 𝒯𝒳* → 𝒯𝒳* × 𝒰𝒮
///
/// Fixed point over the candidate list:
/// 1. Scan candidates from the start
/// 2. On the first still-live tx valid against the working pool: apply it,
///    record it, mark it inert, restart the scan
/// 3. Stop when a full scan accepts nothing
///
/// Restarting after each acceptance lets a transaction rejected earlier in the
/// scan become valid once its parent has been applied. O(n²) validations in
/// the worst case.
///
/// `pool` is not modified. An `Err` means a transaction that just passed
/// validation could not be applied, which indicates a broken validator.
pub fn handle_txs<V>(pool: &UtxoPool, candidates: &[Transaction], verifier: &V) -> Result<Settlement>
where
    V: SignatureVerifier + ?Sized,
{
    let mut working_pool = pool.clone();
    let mut live = vec![true; candidates.len()];
    let mut accepted = Vec::new();

    let mut i = 0;
    while i < candidates.len() {
        if !live[i] || !is_valid_tx(&working_pool, &candidates[i], verifier) {
            i += 1;
            continue;
        }

        let tx = &candidates[i];
        apply_transaction(tx, &mut working_pool).map_err(|e| {
            ConsensusError::InvariantViolation(format!(
                "Validated transaction {} could not be applied: {}",
                short_hash(&tx.hash),
                e
            ))
        })?;
        trace!(tx = %short_hash(&tx.hash), position = i, "accepted transaction");

        accepted.push(tx.clone());
        live[i] = false;
        i = 0;
    }

    debug!(
        candidates = candidates.len(),
        accepted = accepted.len(),
        "settled transaction batch"
    );

    Ok(Settlement {
        accepted,
        utxo_pool: working_pool,
    })
}

/// Tuple form of [`handle_txs`]
pub fn settle<V>(
    pool: &UtxoPool,
    candidates: &[Transaction],
    verifier: &V,
) -> Result<(Vec<Transaction>, UtxoPool)>
where
    V: SignatureVerifier + ?Sized,
{
    let settlement = handle_txs(pool, candidates, verifier)?;
    Ok((settlement.accepted, settlement.utxo_pool))
}
