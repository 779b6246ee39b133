//! Policy-governed evaluation of the tamper-evident ledger.
//!
//! A ledger starts with a policy block. [`EvaluationState`] consumes blocks
//! one at a time: it checks each against the policy, reports every problem
//! it finds as a [`Problem`], and advances the hash chain. Problems never
//! stop the chain; only unparsable genesis input and policy amendments do.
//!
//! - [`Policy`]: the genesis ruleset (version 1 is a JSON document)
//! - [`LedgerState`]: immutable snapshot published after each block
//! - [`LedgerBuilder`]: producer-side block construction
//! - [`AuditedLedger`]: evaluation plus a Merkle tree over link hashes
//! - [`RequirementsState`]: what a block depends on, without ledger state

pub mod audited;
pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod policy;
pub mod requirements;
pub mod snapshot;
pub mod state;

pub use audited::{AuditTree, AuditedLedger, AuditedOutcome};
pub use builder::{AuthorSigner, BasicBlockBuilder, LedgerBuilder, WrapperBuilder};
pub use config::LedgerConfig;
pub use diagnostics::{EvaluationReport, Problem};
pub use error::{LedgerError, LedgerResult, PolicyError};
pub use evaluator::EvaluationState;
pub use policy::Policy;
pub use requirements::RequirementsState;
pub use snapshot::{EvaluationSnapshot, KnownAuthor, KnownLink};
pub use state::LedgerState;
