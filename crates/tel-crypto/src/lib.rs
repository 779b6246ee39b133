//! Cryptographic provider for the tamper-evident ledger.
//!
//! Ledger components never name a primitive directly: they ask a
//! [`CryptoProvider`] for a hash or signature algorithm by the identifier a
//! policy declares. The provider is constructed once by the caller and
//! threaded through every component that needs it.
//!
//! The default [`LedgerCryptoProvider`] wraps established libraries (BLAKE3,
//! Ed25519), with no custom cryptography.

pub mod chain;
pub mod error;
pub mod hasher;
pub mod merkle;
pub mod provider;
pub mod signer;

pub use chain::{link_hash, ChainError, ChainLink, LinkChainVerifier};
pub use error::CryptoError;
pub use hasher::{Blake3, Blake3Keyed};
pub use merkle::{merkle_combine, merkle_leaf, MerkleHash};
pub use provider::{
    algorithms, CryptoProvider, HashAlgorithm, LedgerCryptoProvider, SignatureAlgorithm,
};
pub use signer::{Ed25519, KeyPair};
