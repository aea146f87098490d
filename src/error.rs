//! Error types for ledger operations

use thiserror::Error;

/// Errors raised by the ledger.
///
/// Ordinary validation failures are not errors: they surface as
/// `ValidationResult::Invalid` or a `false` admission result.
#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Transaction validation failed: {0}")]
    TransactionValidation(String),

    #[error("UTXO not found: {0}")]
    UtxoNotFound(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The ledger's own indices disagree with each other. The instance that
    /// produced this must be discarded.
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
