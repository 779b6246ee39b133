use std::sync::Arc;

use bytes::Bytes;
use tel_block::Block;
use tel_crypto::{merkle_combine, merkle_leaf, CryptoProvider, MerkleHash};
use tel_merkle::{ConcreteStep, MemoryMerkleTree, Node, NodeValue, ProofChecker};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::diagnostics::EvaluationReport;
use crate::error::{LedgerError, LedgerResult};
use crate::evaluator::EvaluationState;

type Combine = fn(&MerkleHash, &MerkleHash) -> MerkleHash;
type Equals = fn(&MerkleHash, &MerkleHash) -> bool;

fn hash_eq(a: &MerkleHash, b: &MerkleHash) -> bool {
    a == b
}

/// Merkle tree over the link hashes of a ledger, one leaf per block.
pub type AuditTree = MemoryMerkleTree<MerkleHash, Combine>;

/// Result of evaluating one block in an [`AuditedLedger`].
#[derive(Clone, Debug)]
pub struct AuditedOutcome {
    pub report: EvaluationReport,
    /// Leaf appended for the block, `None` if no state was produced.
    pub leaf: Option<MerkleHash>,
    /// Nodes completed by the append.
    pub perfected: Vec<NodeValue<MerkleHash>>,
    pub frontier: Vec<MerkleHash>,
    pub root: Option<MerkleHash>,
}

/// Evaluation plus an append-only Merkle tree over every accepted link hash.
///
/// Leaf `i` is `merkle_leaf(link_hash(i))`, so the tree always holds exactly
/// one leaf per block in the ledger.
pub struct AuditedLedger {
    evaluation: EvaluationState,
    tree: AuditTree,
}

impl AuditedLedger {
    pub fn new(crypto: Arc<dyn CryptoProvider>, config: LedgerConfig) -> Self {
        Self {
            evaluation: EvaluationState::for_empty_ledger(crypto, config),
            tree: Self::empty_tree(),
        }
    }

    /// Resume from an evaluator and the tree built alongside it.
    pub fn with_history(evaluation: EvaluationState, tree: AuditTree) -> LedgerResult<Self> {
        let ledger = Self { evaluation, tree };
        ledger.check_sync()?;
        Ok(ledger)
    }

    pub fn empty_tree() -> AuditTree {
        MemoryMerkleTree::new(merkle_combine as Combine)
    }

    /// Verifier for proofs produced by any audited ledger.
    pub fn checker() -> ProofChecker<Combine, Equals> {
        ProofChecker::new(merkle_combine as Combine, hash_eq as Equals)
    }

    pub fn evaluation(&self) -> &EvaluationState {
        &self.evaluation
    }

    pub fn tree(&self) -> &AuditTree {
        &self.tree
    }

    pub fn evaluate_raw(&mut self, raw: impl Into<Bytes>) -> LedgerResult<AuditedOutcome> {
        self.check_sync()?;
        let report = self.evaluation.evaluate_raw(raw)?;
        self.append(report)
    }

    pub fn evaluate(&mut self, block: &Block) -> LedgerResult<AuditedOutcome> {
        self.check_sync()?;
        let report = self.evaluation.evaluate(block)?;
        self.append(report)
    }

    fn append(&mut self, report: EvaluationReport) -> LedgerResult<AuditedOutcome> {
        let Some(state) = report.state.clone() else {
            return Ok(AuditedOutcome {
                report,
                leaf: None,
                perfected: Vec::new(),
                frontier: self.tree.frontier().to_vec(),
                root: self.tree.root(),
            });
        };
        if state.head_index() != self.tree.len() {
            return Err(LedgerError::AuditOutOfSync {
                tree_leaves: self.tree.len(),
                block_count: state.block_count,
            });
        }

        let leaf = merkle_leaf(&state.head_link_hash);
        let perfected = self.tree.push(leaf)?;
        debug!(
            index = state.head_index(),
            perfected = perfected.len(),
            frontier = self.tree.frontier().len(),
            "merkle leaf appended"
        );
        Ok(AuditedOutcome {
            report,
            leaf: Some(leaf),
            perfected,
            frontier: self.tree.frontier().to_vec(),
            root: self.tree.root(),
        })
    }

    fn check_sync(&self) -> LedgerResult<()> {
        let block_count = self.evaluation.block_count();
        if self.tree.len() != block_count {
            return Err(LedgerError::AuditOutOfSync {
                tree_leaves: self.tree.len(),
                block_count,
            });
        }
        Ok(())
    }

    pub fn root(&self) -> Option<MerkleHash> {
        self.tree.root()
    }

    /// Root as it was after the first `leaves_count` blocks.
    pub fn root_at(&self, leaves_count: u64) -> LedgerResult<MerkleHash> {
        Ok(self.tree.root_at(leaves_count)?)
    }

    pub fn leaf(&self, index: u64) -> LedgerResult<MerkleHash> {
        Ok(self.tree.stored(Node::leaf(index))?)
    }

    pub fn inclusion_proof(
        &self,
        leaf_index: u64,
        leaves_count: u64,
    ) -> LedgerResult<Vec<ConcreteStep<MerkleHash>>> {
        Ok(self.tree.inclusion_proof(leaf_index, leaves_count)?)
    }

    pub fn consistency_proof(
        &self,
        old_count: u64,
        new_count: u64,
    ) -> LedgerResult<Vec<ConcreteStep<MerkleHash>>> {
        Ok(self.tree.consistency_proof(old_count, new_count)?)
    }
}
