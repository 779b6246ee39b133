use thiserror::Error;

/// Errors from building or querying a Merkle tree.
///
/// Proof *verification* never errors; a bad proof is simply invalid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("frontier has {actual} entries, expected {expected} for the leaf count")]
    FrontierSize { expected: usize, actual: usize },

    #[error("leaf {leaf_index} is outside a tree of {leaves_count} leaves")]
    LeafOutOfRange { leaf_index: u64, leaves_count: u64 },

    #[error("cannot prove consistency from {old_count} to {new_count} leaves")]
    InvalidRange { old_count: u64, new_count: u64 },

    #[error("tree holds {available} leaves, {requested} requested")]
    MissingLeaves { requested: u64, available: u64 },

    #[error("node (height {height}, index {index}) is not stored")]
    MissingNode { height: u32, index: u64 },

    #[error("node (height {height}, index {index}) lies outside a tree of {leaves_count} leaves")]
    NodeOutOfRange {
        height: u32,
        index: u64,
        leaves_count: u64,
    },

    #[error("empty sub-proof")]
    EmptySubProof,
}

pub type MerkleResult<T> = Result<T, MerkleError>;
