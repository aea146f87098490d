//! Core ledger types

use crate::constants::COINBASE_REWARD;
use crate::crypto::double_sha256;
use crate::error::{ConsensusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Amount of value carried by an output
pub type Amount = f64;

/// OutPoint: (source transaction hash, output index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: Natural,
}

impl OutPoint {
    pub fn new(hash: Hash, index: Natural) -> Self {
        Self { hash, index }
    }
}

/// Transaction input: the outpoint being spent and the owner's signature over
/// [`Transaction::raw_data_to_sign`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub signature: ByteString,
}

/// Transaction output: a value and the serialized public key allowed to spend it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Amount,
    pub owner: ByteString,
}

/// Transaction: ordered inputs and outputs plus the identity computed by
/// [`Transaction::finalize`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub hash: Hash,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized coinbase paying `value` to `owner`.
    ///
    /// Its only input is a marker committing to the parent block (`[0; 32]`
    /// for genesis) at index `Natural::MAX`, so coinbases mined on different
    /// parents never share a hash. The marker is never looked up in a pool.
    pub fn coinbase(prev_block_hash: Option<Hash>, value: Amount, owner: ByteString) -> Self {
        let mut tx = Self::new();
        tx.add_input(prev_block_hash.unwrap_or([0; 32]), Natural::MAX);
        tx.add_output(value, owner);
        tx.finalize();
        tx
    }

    pub fn add_input(&mut self, prev_tx_hash: Hash, output_index: Natural) {
        self.inputs.push(TransactionInput {
            prevout: OutPoint::new(prev_tx_hash, output_index),
            signature: Vec::new(),
        });
    }

    pub fn add_output(&mut self, value: Amount, owner: ByteString) {
        self.outputs.push(TransactionOutput { value, owner });
    }

    /// Attach `signature` to input `index`.
    pub fn add_signature(&mut self, signature: ByteString, index: usize) -> Result<()> {
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            ConsensusError::TransactionValidation(format!("No input at index {}", index))
        })?;
        input.signature = signature;
        Ok(())
    }

    /// Payload signed by the owner of input `index`: that input's outpoint
    /// followed by every output. `None` if the input does not exist.
    pub fn raw_data_to_sign(&self, index: usize) -> Option<ByteString> {
        let input = self.inputs.get(index)?;
        let mut data = Vec::new();
        encode_outpoint(&mut data, &input.prevout);
        for output in &self.outputs {
            encode_output(&mut data, output);
        }
        Some(data)
    }

    /// Full serialization used to derive the transaction hash
    pub fn raw_tx(&self) -> ByteString {
        let mut data = Vec::new();
        for input in &self.inputs {
            encode_outpoint(&mut data, &input.prevout);
            data.extend_from_slice(&(input.signature.len() as u32).to_le_bytes());
            data.extend_from_slice(&input.signature);
        }
        for output in &self.outputs {
            encode_output(&mut data, output);
        }
        data
    }

    /// Compute and store the transaction hash. Call after all inputs, outputs
    /// and signatures are in place.
    pub fn finalize(&mut self) {
        self.hash = double_sha256(&self.raw_tx());
    }

    /// Outpoints created by this transaction, in output order
    pub fn created_outpoints(&self) -> impl Iterator<Item = (OutPoint, &TransactionOutput)> {
        let hash = self.hash;
        self.outputs
            .iter()
            .enumerate()
            .map(move |(i, output)| (OutPoint::new(hash, i as Natural), output))
    }
}

fn encode_outpoint(data: &mut ByteString, outpoint: &OutPoint) {
    data.extend_from_slice(&outpoint.hash);
    data.extend_from_slice(&outpoint.index.to_le_bytes());
}

fn encode_output(data: &mut ByteString, output: &TransactionOutput) {
    data.extend_from_slice(&output.value.to_bits().to_le_bytes());
    data.extend_from_slice(&(output.owner.len() as u32).to_le_bytes());
    data.extend_from_slice(&output.owner);
}

/// Block: parent link, coinbase, regular transactions and derived hash.
///
/// Only the genesis block has no parent. Height is not stored; the ledger
/// derives it from the parent chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub prev_block_hash: Option<Hash>,
    pub coinbase: Transaction,
    pub transactions: Vec<Transaction>,
    pub hash: Hash,
}

impl Block {
    /// Unfinalized block paying the standard reward to `coinbase_owner`
    pub fn new(prev_block_hash: Option<Hash>, coinbase_owner: ByteString) -> Self {
        Self {
            prev_block_hash,
            coinbase: Transaction::coinbase(prev_block_hash, COINBASE_REWARD, coinbase_owner),
            transactions: Vec::new(),
            hash: [0; 32],
        }
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn raw_block(&self) -> ByteString {
        let mut data = Vec::new();
        if let Some(prev) = &self.prev_block_hash {
            data.extend_from_slice(prev);
        }
        data.extend_from_slice(&self.coinbase.raw_tx());
        for tx in &self.transactions {
            data.extend_from_slice(&tx.raw_tx());
        }
        data
    }

    pub fn finalize(&mut self) {
        self.hash = double_sha256(&self.raw_block());
    }
}

/// Unspent outputs spendable on one ledger branch.
///
/// Cloning yields an independent snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtxoPool {
    utxos: HashMap<OutPoint, TransactionOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_utxo(&mut self, outpoint: OutPoint, output: TransactionOutput) {
        self.utxos.insert(outpoint, output);
    }

    pub fn remove_utxo(&mut self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.utxos.remove(outpoint)
    }

    pub fn get_tx_output(&self, outpoint: &OutPoint) -> Option<&TransactionOutput> {
        self.utxos.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    /// All outpoints in ascending order
    pub fn all_utxo(&self) -> Vec<OutPoint> {
        let mut outpoints: Vec<OutPoint> = self.utxos.keys().copied().collect();
        outpoints.sort();
        outpoints
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn total_value(&self) -> Amount {
        self.utxos.values().map(|o| o.value).sum()
    }

    /// Deterministic JSON dump of the pool, entries sorted by outpoint
    pub fn to_json(&self) -> Result<String> {
        let entries: Vec<(OutPoint, &TransactionOutput)> = self
            .all_utxo()
            .into_iter()
            .filter_map(|op| self.utxos.get(&op).map(|out| (op, out)))
            .collect();
        serde_json::to_string(&entries).map_err(|e| ConsensusError::Serialization(e.to_string()))
    }
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input([7; 32], 1);
        tx.add_output(10.0, vec![2; 33]);
        tx.add_output(5.5, vec![3; 33]);
        tx
    }

    #[test]
    fn test_finalize_sets_hash() {
        let mut tx = sample_tx();
        assert_eq!(tx.hash, [0; 32]);
        tx.finalize();
        assert_ne!(tx.hash, [0; 32]);
    }

    #[test]
    fn test_signature_changes_hash_but_not_signing_payload() {
        let mut tx = sample_tx();
        tx.finalize();
        let unsigned_hash = tx.hash;
        let payload = tx.raw_data_to_sign(0).unwrap();

        tx.add_signature(vec![0xaa; 70], 0).unwrap();
        tx.finalize();

        assert_ne!(tx.hash, unsigned_hash);
        assert_eq!(tx.raw_data_to_sign(0).unwrap(), payload);
    }

    #[test]
    fn test_raw_data_to_sign_out_of_range() {
        let tx = sample_tx();
        assert!(tx.raw_data_to_sign(1).is_none());
    }

    #[test]
    fn test_add_signature_out_of_range() {
        let mut tx = sample_tx();
        assert!(tx.add_signature(vec![1], 3).is_err());
    }

    #[test]
    fn test_signing_payload_commits_to_outputs() {
        let tx = sample_tx();
        let mut altered = sample_tx();
        altered.outputs[1].value = 6.0;
        assert_ne!(tx.raw_data_to_sign(0), altered.raw_data_to_sign(0));
    }

    #[test]
    fn test_created_outpoints() {
        let mut tx = sample_tx();
        tx.finalize();
        let created: Vec<OutPoint> = tx.created_outpoints().map(|(op, _)| op).collect();
        assert_eq!(created, vec![OutPoint::new(tx.hash, 0), OutPoint::new(tx.hash, 1)]);
    }

    #[test]
    fn test_coinbase_transaction() {
        let cb = Transaction::coinbase(Some([4; 32]), COINBASE_REWARD, vec![9; 33]);
        assert_eq!(cb.inputs.len(), 1);
        assert_eq!(cb.inputs[0].prevout, OutPoint::new([4; 32], Natural::MAX));
        assert_eq!(cb.outputs.len(), 1);
        assert_eq!(cb.outputs[0].value, COINBASE_REWARD);
        assert_ne!(cb.hash, [0; 32]);
    }

    #[test]
    fn test_coinbase_hash_depends_on_parent() {
        let owner = vec![9; 33];
        let genesis = Block::new(None, owner.clone());
        let a = Block::new(Some([1; 32]), owner.clone());
        let b = Block::new(Some([2; 32]), owner);
        assert_ne!(a.coinbase.hash, b.coinbase.hash);
        assert_ne!(genesis.coinbase.hash, a.coinbase.hash);
    }

    #[test]
    fn test_outpoint_index_encoded_in_full() {
        let mut low = Transaction::new();
        low.add_input([7; 32], 0);
        low.add_output(1.0, vec![2; 33]);
        let mut high = low.clone();
        high.inputs[0].prevout.index = 1 << 32;

        assert_ne!(low.raw_data_to_sign(0), high.raw_data_to_sign(0));
        assert_ne!(low.raw_tx(), high.raw_tx());
    }

    #[test]
    fn test_block_hash_depends_on_parent() {
        let mut a = Block::new(Some([1; 32]), vec![9; 33]);
        let mut b = Block::new(Some([2; 32]), vec![9; 33]);
        a.finalize();
        b.finalize();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_utxo_pool_clone_is_independent() {
        let mut pool = UtxoPool::new();
        let op = OutPoint::new([1; 32], 0);
        pool.add_utxo(op, TransactionOutput { value: 1.0, owner: vec![] });

        let mut copy = pool.clone();
        copy.remove_utxo(&op);

        assert!(pool.contains(&op));
        assert!(!copy.contains(&op));
    }

    #[test]
    fn test_utxo_pool_all_utxo_sorted() {
        let mut pool = UtxoPool::new();
        pool.add_utxo(OutPoint::new([2; 32], 0), TransactionOutput { value: 1.0, owner: vec![] });
        pool.add_utxo(OutPoint::new([1; 32], 5), TransactionOutput { value: 2.0, owner: vec![] });
        pool.add_utxo(OutPoint::new([1; 32], 1), TransactionOutput { value: 3.0, owner: vec![] });

        let all = pool.all_utxo();
        assert_eq!(all[0], OutPoint::new([1; 32], 1));
        assert_eq!(all[2], OutPoint::new([2; 32], 0));
        assert_eq!(pool.total_value(), 6.0);
    }

    #[test]
    fn test_utxo_pool_to_json() {
        let mut pool = UtxoPool::new();
        pool.add_utxo(OutPoint::new([1; 32], 0), TransactionOutput { value: 1.5, owner: vec![4] });
        let json = pool.to_json().unwrap();
        let parsed: Vec<(OutPoint, TransactionOutput)> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].1.value, 1.5);
    }
}
