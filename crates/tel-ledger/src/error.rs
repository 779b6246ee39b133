use tel_block::BlockError;
use tel_crypto::CryptoError;
use tel_merkle::MerkleError;

use crate::diagnostics::Problem;

/// Conditions that abort an evaluation or a builder operation.
///
/// Ordinary policy violations are not errors; they are reported as
/// [`Problem`]s and the chain still advances.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("policy block at index {block_index}: policy amendment is not supported")]
    PolicyAmendmentUnsupported { block_index: u64 },

    #[error("genesis block rejected: {problems:?}")]
    GenesisRejected { problems: Vec<Problem> },

    #[error("block error: {0}")]
    Block(#[from] BlockError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("audit tree holds {tree_leaves} leaves but the ledger has {block_count} blocks")]
    AuditOutOfSync { tree_leaves: u64, block_count: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("cannot resume ledger: {0}")]
    InconsistentState(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Reasons a policy payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("unsupported policy version {0}")]
    UnsupportedVersion(u64),

    #[error("malformed policy document: {0}")]
    Json(String),

    #[error("max block size must be positive")]
    ZeroMaxBlockSize,

    #[error("allowed block entry {index} is malformed: {source}")]
    InvalidAllowedBlock { index: usize, source: BlockError },

    #[error("allowed block sequence {0} is listed more than once")]
    DuplicateAllowedBlock(String),

    #[error("application data is missing")]
    MissingApplicationData,
}
