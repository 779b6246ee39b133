use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tel_types::hex_bytes;

use crate::error::{LedgerError, LedgerResult};
use crate::policy::{Policy, POLICY_VERSION_1};
use crate::state::LedgerState;

/// Everything needed to resume evaluation of a ledger.
///
/// The policy is kept as its version 1 payload so the snapshot stays
/// encodable with self-describing and non-self-describing formats alike.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSnapshot {
    #[serde(with = "hex_bytes")]
    pub policy: Vec<u8>,
    pub block_count: u64,
    #[serde(with = "hex_bytes")]
    pub head_block_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub head_link_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub context_link_hash: Vec<u8>,
    pub known_links: Vec<KnownLink>,
    pub known_authors: Vec<KnownAuthor>,
}

/// Link hash recorded for a block index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownLink {
    pub index: u64,
    #[serde(with = "hex_bytes")]
    pub link_hash: Vec<u8>,
}

/// Registered author: id (hash of the key) and public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownAuthor {
    #[serde(with = "hex_bytes")]
    pub id: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
}

impl EvaluationSnapshot {
    pub fn new(
        state: &LedgerState,
        known_link_hashes: &BTreeMap<u64, Vec<u8>>,
        known_authors: &BTreeMap<Vec<u8>, Vec<u8>>,
    ) -> LedgerResult<Self> {
        Ok(Self {
            policy: state.policy.to_payload()?,
            block_count: state.block_count,
            head_block_hash: state.head_block_hash.clone(),
            head_link_hash: state.head_link_hash.clone(),
            context_link_hash: state.context_link_hash.clone(),
            known_links: known_link_hashes
                .iter()
                .map(|(index, link_hash)| KnownLink {
                    index: *index,
                    link_hash: link_hash.clone(),
                })
                .collect(),
            known_authors: known_authors
                .iter()
                .map(|(id, public_key)| KnownAuthor {
                    id: id.clone(),
                    public_key: public_key.clone(),
                })
                .collect(),
        })
    }

    /// Rebuild the ledger state, re-validating the stored policy.
    pub fn ledger_state(&self) -> LedgerResult<LedgerState> {
        Ok(LedgerState {
            policy: Arc::new(Policy::parse(POLICY_VERSION_1, &self.policy)?),
            block_count: self.block_count,
            head_block_hash: self.head_block_hash.clone(),
            head_link_hash: self.head_link_hash.clone(),
            context_link_hash: self.context_link_hash.clone(),
        })
    }

    pub fn link_table(&self) -> BTreeMap<u64, Vec<u8>> {
        self.known_links
            .iter()
            .map(|link| (link.index, link.link_hash.clone()))
            .collect()
    }

    pub fn author_table(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.known_authors
            .iter()
            .map(|author| (author.id.clone(), author.public_key.clone()))
            .collect()
    }

    /// Compact binary encoding.
    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LedgerError::Snapshot(e.to_string()))
    }

    /// Decode and check that the state and link table agree.
    pub fn from_bytes(bytes: &[u8]) -> LedgerResult<Self> {
        let snapshot: Self =
            bincode::deserialize(bytes).map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        check_resumable(
            snapshot.block_count,
            &snapshot.head_link_hash,
            &snapshot.link_table(),
        )?;
        Ok(snapshot)
    }
}

/// A resumable ledger holds at least its genesis block, whose link is always
/// known, and no link past the head. The head link is absent only when the
/// head block was malformed.
pub(crate) fn check_resumable(
    block_count: u64,
    head_link_hash: &[u8],
    known_link_hashes: &BTreeMap<u64, Vec<u8>>,
) -> LedgerResult<()> {
    let Some(head_index) = block_count.checked_sub(1) else {
        return Err(LedgerError::InconsistentState(
            "ledger state has no blocks".into(),
        ));
    };
    if !known_link_hashes.contains_key(&0) {
        return Err(LedgerError::InconsistentState(
            "link table has no genesis entry".into(),
        ));
    }
    if let Some((&last, link)) = known_link_hashes.last_key_value() {
        if last > head_index {
            return Err(LedgerError::InconsistentState(format!(
                "link table has index {last} past head {head_index}"
            )));
        }
        if last == head_index && link[..] != head_link_hash[..] {
            return Err(LedgerError::InconsistentState(format!(
                "recorded link of head {head_index} differs from the state"
            )));
        }
    }
    Ok(())
}
