//! Transaction validation against a UTXO pool

use crate::crypto::SignatureVerifier;
use crate::error::{ConsensusError, Result};
use crate::types::*;
use std::collections::HashSet;

/// CheckTransaction: 𝒰𝒮 × 𝒯𝒳 → {valid, invalid}
///
/// A transaction tx = (ins, outs) is valid against pool us if and only if:
/// 1. |ins| > 0 ∨ |outs| > 0
/// 2. ∀i ∈ ins: i.prevout ∈ us, and no prevout is claimed twice
/// 3. ∀i ∈ ins: i.signature verifies under us(i.prevout).owner
/// 4. ∀o ∈ outs: o.value ≥ 0
/// 5. Σᵢ us(i.prevout).value ≥ Σₒ o.value
///
/// Reads `pool` only.
pub fn check_transaction<V>(pool: &UtxoPool, tx: &Transaction, verifier: &V) -> ValidationResult
where
    V: SignatureVerifier + ?Sized,
{
    // 1. Reject degenerate transactions
    if tx.inputs.is_empty() && tx.outputs.is_empty() {
        return ValidationResult::Invalid("Transaction has no inputs and no outputs".to_string());
    }

    // 2. Every claimed output exists, exactly once
    let mut visited: HashSet<OutPoint> = HashSet::with_capacity(tx.inputs.len());
    let mut spent = Vec::with_capacity(tx.inputs.len());
    for (i, input) in tx.inputs.iter().enumerate() {
        let utxo = match pool.get_tx_output(&input.prevout) {
            Some(utxo) => utxo,
            None => {
                return ValidationResult::Invalid(format!("Input {} not found in UTXO pool", i));
            }
        };
        if !visited.insert(input.prevout) {
            return ValidationResult::Invalid(format!("Input {} claims an output twice", i));
        }
        spent.push(utxo);
    }

    // 3. Each input is signed by the owner of the output it spends
    for (i, (input, utxo)) in tx.inputs.iter().zip(&spent).enumerate() {
        let payload = match tx.raw_data_to_sign(i) {
            Some(payload) => payload,
            None => return ValidationResult::Invalid(format!("No signing payload for input {}", i)),
        };
        if !verifier.verify(&utxo.owner, &payload, &input.signature) {
            return ValidationResult::Invalid(format!("Invalid signature at input {}", i));
        }
    }

    // 4. Output values are non-negative (NaN included)
    let mut total_output_value = 0.0;
    for (i, output) in tx.outputs.iter().enumerate() {
        if !(output.value >= 0.0) {
            return ValidationResult::Invalid(format!(
                "Invalid output value {} at index {}",
                output.value, i
            ));
        }
        total_output_value += output.value;
    }

    // 5. Value is conserved
    let mut total_input_value = 0.0;
    for utxo in &spent {
        if !(utxo.value >= 0.0) {
            return ValidationResult::Invalid("Spent output has a negative value".to_string());
        }
        total_input_value += utxo.value;
    }
    if total_input_value < total_output_value {
        return ValidationResult::Invalid(format!(
            "Outputs {} exceed inputs {}",
            total_output_value, total_input_value
        ));
    }

    ValidationResult::Valid
}

/// Boolean form of [`check_transaction`]
pub fn is_valid_tx<V>(pool: &UtxoPool, tx: &Transaction, verifier: &V) -> bool
where
    V: SignatureVerifier + ?Sized,
{
    check_transaction(pool, tx, verifier).is_valid()
}

/// Σ inputs − Σ outputs. Fees are not credited anywhere; the excess simply
/// leaves circulation.
pub fn transaction_fee(tx: &Transaction, pool: &UtxoPool) -> Result<Amount> {
    let mut total_input_value = 0.0;
    for (i, input) in tx.inputs.iter().enumerate() {
        let utxo = pool.get_tx_output(&input.prevout).ok_or_else(|| {
            ConsensusError::UtxoNotFound(format!("Input {} not found in UTXO pool", i))
        })?;
        total_input_value += utxo.value;
    }
    let total_output_value: Amount = tx.outputs.iter().map(|o| o.value).sum();
    Ok(total_input_value - total_output_value)
}

/// ApplyTransaction: 𝒯𝒳 × 𝒰𝒮 → 𝒰𝒮
///
/// us' = (us \ {i.prevout : i ∈ tx.inputs}) ∪ {(tx.hash, k) ↦ tx.outputs[k]}
///
/// Fails without touching `pool` if any input is missing.
pub fn apply_transaction(tx: &Transaction, pool: &mut UtxoPool) -> Result<()> {
    if let Some(missing) = tx.inputs.iter().position(|i| !pool.contains(&i.prevout)) {
        return Err(ConsensusError::UtxoNotFound(format!(
            "Input {} not found while applying transaction",
            missing
        )));
    }

    for input in &tx.inputs {
        pool.remove_utxo(&input.prevout);
    }
    for (outpoint, output) in tx.created_outpoints() {
        pool.add_utxo(outpoint, output.clone());
    }
    Ok(())
}
