use std::fmt;
use std::sync::Arc;

use crate::error::CryptoError;
use crate::hasher::{Blake3, Blake3Keyed};
use crate::signer::{Ed25519, KeyPair};

/// Algorithm identifiers understood by [`LedgerCryptoProvider`].
pub mod algorithms {
    /// Plain BLAKE3, 32-byte output.
    pub const BLAKE3: &str = "blake3";
    /// BLAKE3 keyed with the ledger id, 32-byte output.
    pub const BLAKE3_LEDGER_KEYED: &str = "blake3(ledgerId)";
    /// Ed25519 signatures.
    pub const ED25519: &str = "ed25519";
}

/// A fixed-output hash function.
pub trait HashAlgorithm: Send + Sync {
    /// Identifier this algorithm was created for.
    fn name(&self) -> &str;

    /// Digest length in bytes.
    fn output_len(&self) -> usize;

    /// Hash `data`.
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Hash the concatenation of `parts` without materializing it.
    fn hash_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        self.hash(&parts.concat())
    }
}

/// A signature scheme with fixed key and signature sizes.
pub trait SignatureAlgorithm: Send + Sync {
    /// Identifier this algorithm was created for.
    fn name(&self) -> &str;

    fn public_key_len(&self) -> usize;
    fn secret_key_len(&self) -> usize;
    fn signature_len(&self) -> usize;

    /// Generate a fresh random key pair.
    fn generate_key_pair(&self) -> KeyPair;

    /// Sign `message` with a raw secret key.
    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Check `signature` over `message`. Malformed keys or signatures are
    /// simply invalid.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// Lookup of algorithms by identifier.
pub trait CryptoProvider: Send + Sync {
    fn create_hash(&self, algorithm: &str) -> Result<Arc<dyn HashAlgorithm>, CryptoError>;

    fn create_signature_algorithm(
        &self,
        algorithm: &str,
    ) -> Result<Arc<dyn SignatureAlgorithm>, CryptoError>;
}

/// Default provider bound to one ledger.
///
/// The ledger id keys the `blake3(ledgerId)` hash so that hashes computed for
/// one ledger are meaningless for any other.
#[derive(Clone)]
pub struct LedgerCryptoProvider {
    ledger_id: [u8; 32],
}

impl LedgerCryptoProvider {
    /// Provider for an already-derived ledger id.
    pub fn for_ledger(ledger_id: [u8; 32]) -> Self {
        Self { ledger_id }
    }

    /// Provider for the ledger identified by `ledger_public_key`.
    pub fn for_public_key(ledger_public_key: &[u8]) -> Self {
        Self::for_ledger(Self::ledger_id(ledger_public_key))
    }

    /// Derive the ledger id from the ledger's public key.
    pub fn ledger_id(ledger_public_key: &[u8]) -> [u8; 32] {
        blake3::derive_key("tel 2024 ledger-id v1", ledger_public_key)
    }

    /// The ledger id this provider is bound to.
    pub fn ledger_id_bytes(&self) -> &[u8; 32] {
        &self.ledger_id
    }
}

impl CryptoProvider for LedgerCryptoProvider {
    fn create_hash(&self, algorithm: &str) -> Result<Arc<dyn HashAlgorithm>, CryptoError> {
        match algorithm {
            algorithms::BLAKE3 => Ok(Arc::new(Blake3)),
            algorithms::BLAKE3_LEDGER_KEYED => Ok(Arc::new(Blake3Keyed::new(self.ledger_id))),
            other => Err(CryptoError::UnknownAlgorithm(other.to_string())),
        }
    }

    fn create_signature_algorithm(
        &self,
        algorithm: &str,
    ) -> Result<Arc<dyn SignatureAlgorithm>, CryptoError> {
        match algorithm {
            algorithms::ED25519 => Ok(Arc::new(Ed25519)),
            other => Err(CryptoError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Debug for LedgerCryptoProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LedgerCryptoProvider({}...)",
            hex::encode(&self.ledger_id[..8])
        )
    }
}
