use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;
use tel_block::{BlockBody, BlockBuilder, BlockSigner, BlockType, BlockTypeSequence};
use tel_crypto::{CryptoProvider, KeyPair, SignatureAlgorithm};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::evaluator::EvaluationState;
use crate::policy::Policy;
use crate::state::LedgerState;

/// Signs with an author's secret key using a policy's signature algorithm.
#[derive(Clone)]
pub struct AuthorSigner {
    algorithm: Arc<dyn SignatureAlgorithm>,
    secret_key: Vec<u8>,
}

impl AuthorSigner {
    pub fn new(algorithm: Arc<dyn SignatureAlgorithm>, secret_key: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            secret_key: secret_key.into(),
        }
    }
}

impl BlockSigner for AuthorSigner {
    fn signature_len(&self) -> usize {
        self.algorithm.signature_len()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, String> {
        self.algorithm
            .sign(&self.secret_key, message)
            .map_err(|e| e.to_string())
    }
}

impl fmt::Debug for AuthorSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorSigner({}, <redacted>)", self.algorithm.name())
    }
}

const SIGNED_SHAPES: &[&[BlockType]] = &[
    &[
        BlockType::AuthorSignature,
        BlockType::InContext,
        BlockType::UpdateContext,
        BlockType::AddAuthors,
    ],
    &[
        BlockType::AuthorSignature,
        BlockType::PreviousBlock,
        BlockType::UpdateContext,
        BlockType::AddAuthors,
    ],
    &[
        BlockType::AuthorSignature,
        BlockType::InContext,
        BlockType::UpdateContext,
        BlockType::Data,
    ],
    &[
        BlockType::AuthorSignature,
        BlockType::PreviousBlock,
        BlockType::UpdateContext,
        BlockType::Data,
    ],
    &[BlockType::AuthorSignature, BlockType::Ack],
    &[BlockType::AuthorSignature, BlockType::Reference],
];

const UNSIGNED_SHAPES: &[&[BlockType]] = &[
    &[BlockType::InContext, BlockType::UpdateContext, BlockType::Data],
    &[BlockType::PreviousBlock, BlockType::UpdateContext, BlockType::Data],
    &[BlockType::Reference],
];

/// Entry point for producing blocks that evaluate cleanly.
pub struct LedgerBuilder;

impl LedgerBuilder {
    /// Shapes allowed by policies this builder writes.
    ///
    /// With authors every block is signed; without, only context-bound data
    /// and references are allowed.
    pub fn default_allowed_blocks(with_authors: bool) -> Vec<Vec<u8>> {
        let shapes = if with_authors {
            SIGNED_SHAPES
        } else {
            UNSIGNED_SHAPES
        };
        shapes
            .iter()
            .map(|shape| {
                BlockTypeSequence::from_types(shape.iter().copied())
                    .to_raw_bytes()
                    .to_vec()
            })
            .collect()
    }

    /// Version 1 policy for a new ledger, using the configured algorithms.
    pub fn genesis_policy(
        config: &LedgerConfig,
        ledger_public_key: &[u8],
        author_keys: &[Vec<u8>],
        max_block_size: u64,
    ) -> Policy {
        Policy {
            ledger_public_key: ledger_public_key.to_vec(),
            max_block_size,
            hashing_algorithm: config.hashing_algorithm.clone(),
            signing_algorithm: config.signing_algorithm.clone(),
            allowed_blocks: Self::default_allowed_blocks(!author_keys.is_empty()),
            author_keys: author_keys.to_vec(),
            application_data: json!({ "version": "1.0.0" }),
        }
    }

    /// Build and evaluate the genesis block of a new ledger.
    ///
    /// `crypto` must be the provider for `ledger_public_key`. Fails with
    /// [`LedgerError::GenesisRejected`] if the resulting policy is not
    /// accepted, e.g. for a zero `max_block_size`.
    pub fn genesis(
        crypto: Arc<dyn CryptoProvider>,
        config: LedgerConfig,
        ledger_public_key: &[u8],
        author_keys: &[Vec<u8>],
        max_block_size: u64,
    ) -> LedgerResult<(Bytes, BasicBlockBuilder)> {
        let policy = Self::genesis_policy(&config, ledger_public_key, author_keys, max_block_size);
        let raw = policy.to_block()?.to_bytes()?;

        let mut evaluation = EvaluationState::for_empty_ledger(Arc::clone(&crypto), config.clone());
        let report = evaluation.evaluate_raw(raw.clone())?;
        match report.state {
            Some(state) => Ok((raw, Self::from_state(crypto, config, state))),
            None => Err(LedgerError::GenesisRejected {
                problems: report.problems,
            }),
        }
    }

    /// Continue producing blocks on top of a published state.
    pub fn from_state(
        crypto: Arc<dyn CryptoProvider>,
        config: LedgerConfig,
        state: Arc<LedgerState>,
    ) -> BasicBlockBuilder {
        BasicBlockBuilder {
            crypto,
            config,
            state,
        }
    }
}

/// Makes terminal blocks against a known ledger state.
///
/// The builder is immutable; several blocks can be made "concurrently" from
/// the same state.
#[derive(Clone)]
pub struct BasicBlockBuilder {
    crypto: Arc<dyn CryptoProvider>,
    config: LedgerConfig,
    state: Arc<LedgerState>,
}

impl BasicBlockBuilder {
    pub fn state(&self) -> &Arc<LedgerState> {
        &self.state
    }

    /// Acknowledge the current head block.
    pub fn ack(&self) -> WrapperBuilder {
        self.ack_block(self.state.head_index(), self.state.head_link_hash.clone())
    }

    pub fn ack_block(&self, target_index: u64, target_link_hash: impl Into<Bytes>) -> WrapperBuilder {
        self.wrap(BlockBuilder::ack(target_index, target_link_hash))
    }

    pub fn add_authors<I, B>(&self, author_keys: I) -> WrapperBuilder
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.wrap(BlockBuilder::add_authors(author_keys))
    }

    pub fn data(&self, data: impl Into<Bytes>) -> WrapperBuilder {
        self.wrap(BlockBuilder::data(data))
    }

    pub fn reference<I, B>(&self, hashes: I) -> WrapperBuilder
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.wrap(BlockBuilder::reference(hashes))
    }

    fn wrap(&self, block: BlockBuilder) -> WrapperBuilder {
        WrapperBuilder {
            basic: self.clone(),
            block,
        }
    }
}

impl fmt::Debug for BasicBlockBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicBlockBuilder")
            .field("block_count", &self.state.block_count)
            .finish()
    }
}

/// Adds encapsulations to a block, each bound to the builder's state.
#[derive(Clone, Debug)]
pub struct WrapperBuilder {
    basic: BasicBlockBuilder,
    block: BlockBuilder,
}

impl WrapperBuilder {
    /// Sign with an author's key pair. The author id is the policy hash of
    /// the public key.
    pub fn author_signature(self, author: &KeyPair) -> LedgerResult<Self> {
        let policy = &self.basic.state.policy;
        let hasher = self.basic.crypto.create_hash(&policy.hashing_algorithm)?;
        let algorithm = self
            .basic
            .crypto
            .create_signature_algorithm(&policy.signing_algorithm)?;
        let author_id = hasher.hash(author.public_key());
        let signer = Arc::new(AuthorSigner::new(algorithm, author.secret_key()));
        Ok(Self {
            block: self.block.with_author_signature(author_id, signer),
            basic: self.basic,
        })
    }

    pub fn in_context(self) -> Self {
        let context = self.basic.state.context_link_hash.clone();
        Self {
            block: self.block.with_in_context(context),
            basic: self.basic,
        }
    }

    pub fn previous_block(self) -> Self {
        let head = self.basic.state.head_block_hash.clone();
        Self {
            block: self.block.with_previous_block(head),
            basic: self.basic,
        }
    }

    pub fn update_context(self) -> Self {
        Self {
            block: self.block.with_update_context(),
            basic: self.basic,
        }
    }

    /// Encode the block and compute the state that follows it.
    ///
    /// The block is re-read with the configured limits, so a wrapper nested
    /// deeper than evaluators accept fails here instead of on submission.
    pub fn build(self) -> LedgerResult<(Bytes, BasicBlockBuilder)> {
        let BasicBlockBuilder {
            crypto,
            config,
            state,
        } = self.basic;

        let block = self.block.build_with(config.read_options())?;
        let raw = block.raw().clone();
        let update_context = block
            .layers()
            .any(|layer| matches!(layer.body(), BlockBody::UpdateContext { .. }));
        let hasher = crypto.create_hash(&state.policy.hashing_algorithm)?;
        let next = Arc::new(state.advance(hasher.as_ref(), &raw, update_context));
        Ok((raw, LedgerBuilder::from_state(crypto, config, next)))
    }
}
