//! Pending-transaction pool
//!
//! A staging area only: nothing is validated on insertion. Validity is decided
//! when a block carrying the transaction is admitted against the pool
//! snapshot it builds on.

use crate::types::*;
use std::collections::HashMap;

/// Transactions awaiting inclusion in a block, keyed by hash
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    pool: HashMap<Hash, Transaction>,
    // insertion order, so block producers see a deterministic list
    order: Vec<Hash>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `tx`. A transaction whose hash is already present is ignored.
    pub fn add_transaction(&mut self, tx: Transaction) {
        if self.pool.contains_key(&tx.hash) {
            return;
        }
        self.order.push(tx.hash);
        self.pool.insert(tx.hash, tx);
    }

    /// Remove the transaction with `tx_hash`; no-op if absent.
    pub fn remove_transaction(&mut self, tx_hash: &Hash) -> Option<Transaction> {
        let removed = self.pool.remove(tx_hash)?;
        self.order.retain(|h| h != tx_hash);
        Some(removed)
    }

    pub fn get_transaction(&self, tx_hash: &Hash) -> Option<&Transaction> {
        self.pool.get(tx_hash)
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.pool.contains_key(tx_hash)
    }

    /// All pending transactions in insertion order
    pub fn transactions(&self) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|h| self.pool.get(h).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
