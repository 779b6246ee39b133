use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tel_block::Block;

use crate::state::LedgerState;

/// A policy violation found while evaluating a block.
///
/// Problems are reported alongside the new state; none of them stops the
/// remaining checks or the hash chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Problem {
    MalformedBlock,
    BlockTooBig,
    BlockTypeNotAllowed,
    CannotParsePolicy,
    InvalidHashLength,
    BlockNotFound,
    BlockLinkHashMismatch,
    InvalidAuthorKey,
    AuthorAlreadyPresent,
    AuthorNotFound,
    InvalidSignature,
    PreviousBlockHashMismatch,
    ContextLinkHashMismatch,
}

impl Problem {
    pub const fn description(self) -> &'static str {
        match self {
            Problem::MalformedBlock => "block bytes cannot be parsed",
            Problem::BlockTooBig => "block exceeds the policy's max block size",
            Problem::BlockTypeNotAllowed => "block shape is not allowed by the policy",
            Problem::CannotParsePolicy => "policy cannot be parsed",
            Problem::InvalidHashLength => "referenced hash has the wrong length",
            Problem::BlockNotFound => "acknowledged block is unknown",
            Problem::BlockLinkHashMismatch => "acknowledged link hash does not match",
            Problem::InvalidAuthorKey => "author key has the wrong length",
            Problem::AuthorAlreadyPresent => "author is already registered",
            Problem::AuthorNotFound => "signing author is unknown",
            Problem::InvalidSignature => "author signature does not verify",
            Problem::PreviousBlockHashMismatch => "previous block hash does not match the head",
            Problem::ContextLinkHashMismatch => "context link hash does not match",
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of evaluating one block.
#[derive(Clone, Debug)]
pub struct EvaluationReport {
    /// Published state after the block, `None` while the ledger has no
    /// accepted genesis.
    pub state: Option<Arc<LedgerState>>,
    /// The parsed block, `None` for unparsable bytes.
    pub block: Option<Block>,
    /// Problems in the order they were found.
    pub problems: Vec<Problem>,
}

impl EvaluationReport {
    /// Returns `true` if no problem was reported.
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn has(&self, problem: Problem) -> bool {
        self.problems.contains(&problem)
    }

    pub fn block_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.block_count)
    }
}
