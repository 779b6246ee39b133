use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tel_crypto::{link_hash, HashAlgorithm};
use tel_types::hex_bytes;

use crate::policy::Policy;

/// Immutable snapshot of a ledger after an accepted block.
///
/// A fresh instance is produced for every block; published snapshots can be
/// shared freely.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub policy: Arc<Policy>,
    pub block_count: u64,
    #[serde(with = "hex_bytes")]
    pub head_block_hash: Vec<u8>,
    /// `hash(head_block_hash ++ previous head_link_hash)`.
    #[serde(with = "hex_bytes")]
    pub head_link_hash: Vec<u8>,
    /// The link hash most recently published for InContext blocks.
    #[serde(with = "hex_bytes")]
    pub context_link_hash: Vec<u8>,
}

impl LedgerState {
    /// State after the genesis block. Its context is its own link hash.
    pub fn genesis(hasher: &dyn HashAlgorithm, policy: Arc<Policy>, raw: &[u8]) -> Self {
        let head_block_hash = hasher.hash(raw);
        let head_link_hash = link_hash(hasher, &head_block_hash, None);
        Self {
            policy,
            block_count: 1,
            head_block_hash,
            context_link_hash: head_link_hash.clone(),
            head_link_hash,
        }
    }

    /// State after appending `raw`.
    pub fn advance(&self, hasher: &dyn HashAlgorithm, raw: &[u8], update_context: bool) -> Self {
        let head_block_hash = hasher.hash(raw);
        let head_link_hash = link_hash(hasher, &head_block_hash, Some(&self.head_link_hash));
        let context_link_hash = if update_context {
            head_link_hash.clone()
        } else {
            self.context_link_hash.clone()
        };
        Self {
            policy: Arc::clone(&self.policy),
            block_count: self.block_count + 1,
            head_block_hash,
            head_link_hash,
            context_link_hash,
        }
    }

    /// Index of the head block.
    pub fn head_index(&self) -> u64 {
        self.block_count - 1
    }
}
