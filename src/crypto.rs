//! Hashing and signature capability
//!
//! Identities are double SHA-256 over the raw encodings in [`crate::types`].
//! Input signatures are ECDSA over secp256k1, signed against the SHA-256
//! digest of [`Transaction::raw_data_to_sign`](crate::types::Transaction::raw_data_to_sign).

use crate::error::{ConsensusError, Result};
use crate::types::{ByteString, Hash, Transaction};
use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};
use secp256k1::{ecdsa::Signature, All, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

/// Double SHA-256
pub fn double_sha256(data: &[u8]) -> Hash {
    let mut hasher = sha256d::Hash::engine();
    hasher.input(data);
    let result = sha256d::Hash::from_engine(hasher);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Single SHA-256, used as the signed message digest
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// First eight bytes of a hash as hex, for log fields
pub fn short_hash(hash: &Hash) -> String {
    hash[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Checks that `signature` over `payload` was produced by the holder of
/// `owner`.
pub trait SignatureVerifier {
    fn verify(&self, owner: &[u8], payload: &[u8], signature: &[u8]) -> bool;
}

/// ECDSA verification against SEC1-encoded secp256k1 public keys and
/// DER-encoded signatures.
pub struct Secp256k1Verifier {
    secp: Secp256k1<All>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self { secp: Secp256k1::new() }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, owner: &[u8], payload: &[u8], signature: &[u8]) -> bool {
        let pubkey = match PublicKey::from_slice(owner) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let signature = match Signature::from_der(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        let message = match Message::from_digest_slice(&sha256(payload)) {
            Ok(msg) => msg,
            Err(_) => return false,
        };

        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }
}

/// Serialized (compressed) public key for `secret`, as stored in
/// [`TransactionOutput::owner`](crate::types::TransactionOutput::owner).
pub fn owner_key(secret: &SecretKey) -> ByteString {
    let secp = Secp256k1::signing_only();
    PublicKey::from_secret_key(&secp, secret).serialize().to_vec()
}

/// DER signature by `secret` over `payload`
pub fn sign(secret: &SecretKey, payload: &[u8]) -> Result<ByteString> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest_slice(&sha256(payload))
        .map_err(|e| ConsensusError::InvalidSignature(e.to_string()))?;
    Ok(secp.sign_ecdsa(&message, secret).serialize_der().to_vec())
}

/// Sign input `index` of `tx` with `secret` and attach the signature.
///
/// The transaction must be finalized again afterwards.
pub fn sign_input(tx: &mut Transaction, index: usize, secret: &SecretKey) -> Result<()> {
    let payload = tx.raw_data_to_sign(index).ok_or_else(|| {
        ConsensusError::TransactionValidation(format!("No input at index {}", index))
    })?;
    let signature = sign(secret, &payload)?;
    tx.add_signature(signature, index)
}
