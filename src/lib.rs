//! # UTXO Ledger
//!
//! Local ledger engine over an unspent-output accounting model.
//!
//! The crate validates value-transfer transactions against a UTXO pool,
//! settles unordered batches into a maximal mutually consistent set, and keeps
//! a bounded tree of competing block forks, each with its own UTXO snapshot.
//! The deepest fork is canonical; forks that fall more than the cut-off age
//! behind it are discarded.
//!
//! ## Architecture
//!
//! Leaf first:
//! - [`types`]: outpoints, transactions, blocks and the [`UtxoPool`]
//! - [`transaction`]: single-transaction validation against a pool
//! - [`settlement`]: fixed-point batch settlement
//! - [`mempool`]: transactions waiting for a block
//! - [`chain`]: the fork tree, tip selection and pruning
//! - [`mining`]: assembling a block from the mempool
//!
//! Hashing and signatures live in [`crypto`]. Proof of work, networking and
//! persistence are out of scope: blocks are admitted purely on transaction
//! validity and ancestry.
//!
//! ## Usage
//!
//! ```rust
//! use secp256k1::SecretKey;
//! use utxo_ledger::crypto::{owner_key, sign_input, Secp256k1Verifier};
//! use utxo_ledger::*;
//!
//! let alice = SecretKey::from_slice(&[1; 32]).unwrap();
//! let bob = SecretKey::from_slice(&[2; 32]).unwrap();
//!
//! let mut funding = Transaction::new();
//! funding.add_output(10.0, owner_key(&alice));
//! funding.finalize();
//!
//! let mut genesis = Block::new(None, owner_key(&alice));
//! genesis.add_transaction(funding.clone());
//! genesis.finalize();
//!
//! let mut chain = BlockChain::new(genesis.clone(), Secp256k1Verifier::new());
//!
//! let mut payment = Transaction::new();
//! payment.add_input(funding.hash, 0);
//! payment.add_output(10.0, owner_key(&bob));
//! sign_input(&mut payment, 0, &alice).unwrap();
//! payment.finalize();
//!
//! let mut block = Block::new(Some(genesis.hash), owner_key(&bob));
//! block.add_transaction(payment);
//! block.finalize();
//!
//! assert!(chain.add_block(block.clone()).unwrap());
//! assert_eq!(chain.get_max_height_block().unwrap().hash, block.hash);
//! ```

pub mod types;
pub mod constants;
pub mod config;
pub mod crypto;
pub mod transaction;
pub mod settlement;
pub mod mempool;
pub mod chain;
pub mod mining;
pub mod error;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use config::LedgerConfig;
pub use chain::BlockChain;
pub use mempool::TransactionPool;
pub use settlement::{handle_txs, settle, Settlement};
pub use transaction::{check_transaction, is_valid_tx};
pub use error::{ConsensusError, Result};
