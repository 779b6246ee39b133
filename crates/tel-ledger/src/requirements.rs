use std::collections::BTreeSet;

use tel_block::{Block, BlockBody};

use crate::policy::Policy;

/// What a block depends on, collected without any ledger state.
///
/// Useful to decide whether a block can be evaluated yet: every acked index
/// must already exist and every signer must already be registered.
/// Evaluating several blocks accumulates into the same sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequirementsState {
    pub acked_indexes: BTreeSet<u64>,
    pub acked_link_hashes: BTreeSet<Vec<u8>>,
    /// Public keys introduced by policy or AddAuthors blocks.
    pub new_authors: BTreeSet<Vec<u8>>,
    /// Author ids of every signature layer.
    pub signers: BTreeSet<Vec<u8>>,
}

impl RequirementsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the requirements of `block` and every layer inside it.
    pub fn evaluate(&mut self, block: &Block) {
        for layer in block.layers() {
            match layer.body() {
                BlockBody::Policy { version, policy } => {
                    // An unreadable policy simply introduces nobody.
                    if let Ok(policy) = Policy::parse(*version, policy) {
                        self.new_authors.extend(policy.author_keys);
                    }
                }
                BlockBody::AddAuthors { author_keys } => {
                    self.new_authors
                        .extend(author_keys.iter().map(|key| key.to_vec()));
                }
                BlockBody::Ack {
                    target_index,
                    target_link_hash,
                } => {
                    self.acked_indexes.insert(*target_index);
                    self.acked_link_hashes.insert(target_link_hash.to_vec());
                }
                BlockBody::AuthorSignature { author_id, .. } => {
                    self.signers.insert(author_id.to_vec());
                }
                BlockBody::Data { .. }
                | BlockBody::Reference { .. }
                | BlockBody::PreviousBlock { .. }
                | BlockBody::InContext { .. }
                | BlockBody::UpdateContext { .. } => {}
            }
        }
    }
}
