//! Append-only Merkle authentication for the tamper-evident ledger.
//!
//! Leaves live in an infinite virtual perfect binary tree addressed by
//! [`Node`] coordinates. A tree of `n` leaves is summarized by its frontier:
//! the roots of the closed perfect subtrees not yet absorbed into a larger
//! one, smallest first. Appending a leaf only touches the frontier, so
//! producers need memory logarithmic in the number of leaves.
//!
//! Proofs are produced in two steps. [`tree`] computes the abstract shape of
//! a proof as coordinates, independent of storage; [`proof::concretize`]
//! resolves those coordinates through a caller-supplied lookup. The
//! [`ProofChecker`] verifies concrete proofs against a combiner only.
//!
//! - [`MerkleBuilder`]: frontier updates and root computation
//! - [`MemoryMerkleTree`]: keeps every perfected node, answers historical
//!   roots and proofs
//! - [`ProofChecker`]: inclusion and consistency verification

pub mod builder;
pub mod checker;
pub mod error;
pub mod memory;
pub mod proof;
pub mod tree;

pub use builder::{Combiner, MerkleBuilder, NodeValue};
pub use checker::ProofChecker;
pub use error::{MerkleError, MerkleResult};
pub use memory::MemoryMerkleTree;
pub use proof::{concretize, AbstractStep, ConcreteStep, StepTarget};
pub use tree::{consistency_proof, inclusion_proof, perfected_ancestors, Node, SubTree};
