//! Block tree with per-block UTXO snapshots
//!
//! Every retained block owns the UTXO pool that results from applying its
//! transactions on top of its parent's pool, so a new block can extend any
//! retained fork without replaying history. The deepest block is the
//! canonical tip. Whenever the tip advances, the level `cut_off_age + 1`
//! below it is dropped together with its snapshots; a block whose parent has
//! been dropped is indistinguishable from one with an unknown parent.

use crate::config::LedgerConfig;
use crate::constants::GENESIS_HEIGHT;
use crate::crypto::{short_hash, SignatureVerifier};
use crate::error::{ConsensusError, Result};
use crate::mempool::TransactionPool;
use crate::settlement::handle_txs;
use crate::types::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// A retained block with its derived state
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub block: Block,
    pub height: Natural,
    /// Pool after this block's transactions and coinbase
    pub utxo_pool: UtxoPool,
}

/// Ledger over a bounded window of competing forks
pub struct BlockChain<V> {
    blocks: HashMap<Hash, BlockNode>,
    // blocks at each retained height, in the order they were admitted
    levels: BTreeMap<Natural, Vec<Hash>>,
    max_height: Natural,
    transaction_pool: TransactionPool,
    config: LedgerConfig,
    verifier: V,
}

impl<V: SignatureVerifier> BlockChain<V> {
    /// Ledger containing only `genesis`, with the default cut-off age.
    ///
    /// The genesis block is trusted: every output of every genesis
    /// transaction enters its pool without validation.
    pub fn new(genesis: Block, verifier: V) -> Self {
        Self::with_config(genesis, verifier, LedgerConfig::default())
    }

    pub fn with_config(genesis: Block, verifier: V, config: LedgerConfig) -> Self {
        let mut utxo_pool = UtxoPool::new();
        for tx in &genesis.transactions {
            for (outpoint, output) in tx.created_outpoints() {
                utxo_pool.add_utxo(outpoint, output.clone());
            }
        }
        apply_coinbase(&genesis.coinbase, &mut utxo_pool);

        let hash = genesis.hash;
        info!(
            genesis = %short_hash(&hash),
            utxos = utxo_pool.len(),
            cut_off_age = config.cut_off_age,
            "initialized block chain"
        );

        let mut blocks = HashMap::new();
        blocks.insert(
            hash,
            BlockNode {
                block: genesis,
                height: GENESIS_HEIGHT,
                utxo_pool,
            },
        );
        let mut levels = BTreeMap::new();
        levels.insert(GENESIS_HEIGHT, vec![hash]);

        Self {
            blocks,
            levels,
            max_height: GENESIS_HEIGHT,
            transaction_pool: TransactionPool::new(),
            config,
            verifier,
        }
    }

    /// First block admitted at the maximum height
    pub fn get_max_height_block(&self) -> Result<&Block> {
        Ok(&self.tip_node()?.block)
    }

    /// Pool to build the next block on
    pub fn get_max_height_utxo_pool(&self) -> Result<&UtxoPool> {
        Ok(&self.tip_node()?.utxo_pool)
    }

    pub fn get_transaction_pool(&self) -> &TransactionPool {
        &self.transaction_pool
    }

    /// Stage `tx` for a future block
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transaction_pool.add_transaction(tx);
    }

    /// AddBlock: ℬ → {accepted, rejected}
    ///
    /// 1. Reject a block without a parent, or one already retained
    /// 2. Reject if the parent is not retained (unknown or pruned)
    /// 3. Settle the block's transactions on the parent's pool; reject unless
    ///    every one is accepted
    /// 4. Mint the coinbase, record the block at parent height + 1
    /// 5. If the tip advanced, prune the level `cut_off_age + 1` below it
    /// 6. Drop the block's transactions from the mempool
    ///
    /// Rejection returns `Ok(false)` and leaves the ledger untouched. `Err` is
    /// an internal invariant violation; the ledger must not be used again.
    pub fn add_block(&mut self, block: Block) -> Result<bool> {
        let hash = block.hash;

        let prev_hash = match block.prev_block_hash {
            Some(prev) => prev,
            None => {
                debug!(block = %short_hash(&hash), "rejected block: no parent");
                return Ok(false);
            }
        };

        if self.blocks.contains_key(&hash) {
            debug!(block = %short_hash(&hash), "rejected block: already retained");
            return Ok(false);
        }

        let parent = match self.blocks.get(&prev_hash) {
            Some(parent) => parent,
            None => {
                debug!(
                    block = %short_hash(&hash),
                    parent = %short_hash(&prev_hash),
                    "rejected block: parent unknown or pruned"
                );
                return Ok(false);
            }
        };

        let settlement = handle_txs(&parent.utxo_pool, &block.transactions, &self.verifier)?;
        if settlement.accepted.len() != block.transactions.len() {
            debug!(
                block = %short_hash(&hash),
                submitted = block.transactions.len(),
                accepted = settlement.accepted.len(),
                "rejected block: invalid transactions"
            );
            return Ok(false);
        }
        let height = parent.height + 1;

        let mut utxo_pool = settlement.utxo_pool;
        apply_coinbase(&block.coinbase, &mut utxo_pool);

        let tx_hashes: Vec<Hash> = block.transactions.iter().map(|tx| tx.hash).collect();
        self.blocks.insert(
            hash,
            BlockNode {
                block,
                height,
                utxo_pool,
            },
        );
        self.levels.entry(height).or_default().push(hash);

        if height > self.max_height {
            self.max_height = height;
            self.prune(height)?;
        }

        for tx_hash in &tx_hashes {
            self.transaction_pool.remove_transaction(tx_hash);
        }

        info!(
            block = %short_hash(&hash),
            height,
            transactions = tx_hashes.len(),
            max_height = self.max_height,
            "added block"
        );
        Ok(true)
    }

    /// Drop every block at level `new_height - cut_off_age - 1`. Nothing to do
    /// until the chain is deeper than `cut_off_age + 1`.
    fn prune(&mut self, new_height: Natural) -> Result<()> {
        let level_to_remove = match new_height.checked_sub(self.config.cut_off_age + 1) {
            Some(level) if level > 0 => level,
            _ => return Ok(()),
        };

        let hashes = self.levels.remove(&level_to_remove).ok_or_else(|| {
            ConsensusError::InvariantViolation(format!(
                "No blocks recorded at level {} while pruning",
                level_to_remove
            ))
        })?;

        for hash in &hashes {
            if self.blocks.remove(hash).is_none() {
                return Err(ConsensusError::InvariantViolation(format!(
                    "Block {} listed at level {} is not retained",
                    short_hash(hash),
                    level_to_remove
                )));
            }
        }

        debug!(level = level_to_remove, blocks = hashes.len(), "pruned level");
        Ok(())
    }

    fn tip_node(&self) -> Result<&BlockNode> {
        let tip = self
            .levels
            .get(&self.max_height)
            .and_then(|level| level.first())
            .ok_or_else(|| {
                ConsensusError::InvariantViolation(format!(
                    "No block recorded at maximum height {}",
                    self.max_height
                ))
            })?;
        self.blocks.get(tip).ok_or_else(|| {
            ConsensusError::InvariantViolation(format!(
                "Tip {} is not retained",
                short_hash(tip)
            ))
        })
    }

    pub fn max_height(&self) -> Natural {
        self.max_height
    }

    pub fn cut_off_age(&self) -> Natural {
        self.config.cut_off_age
    }

    pub fn contains_block(&self, hash: &Hash) -> bool {
        self.blocks.contains_key(hash)
    }

    pub fn block_height(&self, hash: &Hash) -> Option<Natural> {
        self.blocks.get(hash).map(|node| node.height)
    }

    /// Snapshot owned by a retained block
    pub fn utxo_pool_for(&self, hash: &Hash) -> Option<&UtxoPool> {
        self.blocks.get(hash).map(|node| &node.utxo_pool)
    }

    /// Retained blocks at `height`, in admission order
    pub fn blocks_at_height(&self, height: Natural) -> &[Hash] {
        self.levels.get(&height).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn retained_block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }
}

/// Mint the coinbase's first output if it is positive and has an owner
fn apply_coinbase(coinbase: &Transaction, utxo_pool: &mut UtxoPool) {
    if let Some(output) = coinbase.outputs.first() {
        if output.value > 0.0 && !output.owner.is_empty() {
            utxo_pool.add_utxo(OutPoint::new(coinbase.hash, 0), output.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COINBASE_REWARD;
    use crate::crypto::{owner_key, sign_input, Secp256k1Verifier};
    use secp256k1::SecretKey;

    fn secret(seed: u8) -> SecretKey {
        SecretKey::from_slice(&[seed; 32]).unwrap()
    }

    fn genesis() -> Block {
        let mut tx = Transaction::new();
        tx.add_output(10.0, owner_key(&secret(1)));
        tx.add_output(15.0, owner_key(&secret(1)));
        tx.finalize();

        let mut block = Block::new(None, owner_key(&secret(1)));
        block.add_transaction(tx);
        block.finalize();
        block
    }

    fn empty_child(parent: &Block, miner: u8) -> Block {
        let mut block = Block::new(Some(parent.hash), owner_key(&secret(miner)));
        block.finalize();
        block
    }

    fn chain() -> (BlockChain<Secp256k1Verifier>, Block) {
        let g = genesis();
        (BlockChain::new(g.clone(), Secp256k1Verifier::new()), g)
    }

    #[test]
    fn test_genesis_state() {
        let (chain, g) = chain();
        assert_eq!(chain.max_height(), GENESIS_HEIGHT);
        assert_eq!(chain.get_max_height_block().unwrap(), &g);
        // two genesis outputs plus the coinbase
        let pool = chain.get_max_height_utxo_pool().unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.total_value(), 25.0 + COINBASE_REWARD);
    }

    #[test]
    fn test_reject_block_without_parent() {
        let (mut chain, _) = chain();
        let mut orphan = Block::new(None, owner_key(&secret(2)));
        orphan.finalize();
        assert!(!chain.add_block(orphan).unwrap());
        assert_eq!(chain.retained_block_count(), 1);
    }

    #[test]
    fn test_reject_unknown_parent() {
        let (mut chain, _) = chain();
        let mut block = Block::new(Some([0xee; 32]), owner_key(&secret(2)));
        block.finalize();
        assert!(!chain.add_block(block).unwrap());
    }

    #[test]
    fn test_reject_duplicate_block() {
        let (mut chain, g) = chain();
        let child = empty_child(&g, 2);
        assert!(chain.add_block(child.clone()).unwrap());
        assert!(!chain.add_block(child).unwrap());
        assert_eq!(chain.blocks_at_height(2).len(), 1);
    }

    #[test]
    fn test_coinbase_minted() {
        let (mut chain, g) = chain();
        let child = empty_child(&g, 2);
        assert!(chain.add_block(child.clone()).unwrap());

        let pool = chain.utxo_pool_for(&child.hash).unwrap();
        let minted = pool.get_tx_output(&OutPoint::new(child.coinbase.hash, 0)).unwrap();
        assert_eq!(minted.value, COINBASE_REWARD);
        assert_eq!(minted.owner, owner_key(&secret(2)));
    }

    #[test]
    fn test_zero_coinbase_not_minted() {
        let (mut chain, g) = chain();
        let mut child = Block::new(Some(g.hash), owner_key(&secret(2)));
        child.coinbase = Transaction::coinbase(Some(g.hash), 0.0, owner_key(&secret(2)));
        child.finalize();
        assert!(chain.add_block(child.clone()).unwrap());

        let parent_len = chain.utxo_pool_for(&g.hash).unwrap().len();
        assert_eq!(chain.utxo_pool_for(&child.hash).unwrap().len(), parent_len);
    }

    #[test]
    fn test_fork_tie_keeps_first_recorded() {
        let (mut chain, g) = chain();
        let first = empty_child(&g, 2);
        let second = empty_child(&g, 3);
        assert!(chain.add_block(first.clone()).unwrap());
        assert!(chain.add_block(second.clone()).unwrap());

        assert_eq!(chain.get_max_height_block().unwrap().hash, first.hash);
        assert_eq!(chain.blocks_at_height(2), &[first.hash, second.hash]);
    }

    #[test]
    fn test_longer_fork_becomes_tip() {
        let (mut chain, g) = chain();
        let a = empty_child(&g, 2);
        let b = empty_child(&g, 3);
        assert!(chain.add_block(a).unwrap());
        assert!(chain.add_block(b.clone()).unwrap());

        let b2 = empty_child(&b, 4);
        assert!(chain.add_block(b2.clone()).unwrap());
        assert_eq!(chain.get_max_height_block().unwrap().hash, b2.hash);
        assert_eq!(chain.block_height(&b2.hash), Some(3));
    }

    #[test]
    fn test_invalid_transaction_rejects_block_atomically() {
        let (mut chain, g) = chain();
        let mut tx = Transaction::new();
        tx.add_input(g.transactions[0].hash, 0);
        tx.add_output(10.1, owner_key(&secret(2)));
        sign_input(&mut tx, 0, &secret(1)).unwrap();
        tx.finalize();
        chain.add_transaction(tx.clone());

        let mut block = Block::new(Some(g.hash), owner_key(&secret(2)));
        block.add_transaction(tx.clone());
        block.finalize();

        let pool_before = chain.get_max_height_utxo_pool().unwrap().clone();
        assert!(!chain.add_block(block.clone()).unwrap());
        assert!(!chain.add_block(block).unwrap());

        assert_eq!(chain.retained_block_count(), 1);
        assert_eq!(chain.max_height(), 1);
        assert_eq!(chain.get_max_height_utxo_pool().unwrap(), &pool_before);
        assert!(chain.get_transaction_pool().contains(&tx.hash));
    }

    #[test]
    fn test_accepted_block_drains_mempool() {
        let (mut chain, g) = chain();
        let mut tx = Transaction::new();
        tx.add_input(g.transactions[0].hash, 1);
        tx.add_output(15.0, owner_key(&secret(2)));
        sign_input(&mut tx, 0, &secret(1)).unwrap();
        tx.finalize();

        let mut unrelated = Transaction::new();
        unrelated.add_output(0.0, owner_key(&secret(5)));
        unrelated.finalize();

        chain.add_transaction(tx.clone());
        chain.add_transaction(unrelated.clone());

        let mut block = Block::new(Some(g.hash), owner_key(&secret(2)));
        block.add_transaction(tx.clone());
        block.finalize();
        assert!(chain.add_block(block).unwrap());

        assert!(!chain.get_transaction_pool().contains(&tx.hash));
        assert!(chain.get_transaction_pool().contains(&unrelated.hash));
    }

    #[test]
    fn test_pruning_window() {
        let config = LedgerConfig { cut_off_age: 2 };
        let g = genesis();
        let mut chain = BlockChain::with_config(g.clone(), Secp256k1Verifier::new(), config);

        // heights 2, 3: genesis still retained
        let mut tip = g.clone();
        for miner in 2..4 {
            let next = empty_child(&tip, miner);
            assert!(chain.add_block(next.clone()).unwrap());
            tip = next;
        }
        assert!(chain.contains_block(&g.hash));

        // height 4 prunes level 1
        let next = empty_child(&tip, 4);
        assert!(chain.add_block(next).unwrap());
        assert!(!chain.contains_block(&g.hash));
        assert!(chain.blocks_at_height(1).is_empty());
        assert!(!chain.add_block(empty_child(&g, 9)).unwrap());
        assert_eq!(chain.retained_block_count(), 3);
    }

    #[test]
    fn test_prune_missing_level_is_invariant_violation() {
        let (mut chain, _) = chain();
        chain.levels.clear();
        let err = chain.prune(12).unwrap_err();
        assert!(matches!(err, ConsensusError::InvariantViolation(_)));
        assert!(matches!(
            chain.get_max_height_block(),
            Err(ConsensusError::InvariantViolation(_))
        ));
    }
}
