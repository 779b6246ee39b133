use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use tel_block::{Block, BlockBody, BlockTypeSequence};
use tel_crypto::{CryptoProvider, HashAlgorithm, SignatureAlgorithm};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::diagnostics::{EvaluationReport, Problem};
use crate::error::{LedgerError, LedgerResult};
use crate::policy::Policy;
use crate::snapshot::{check_resumable, EvaluationSnapshot};
use crate::state::LedgerState;

/// Incremental validator for one ledger.
///
/// Starts uninitialized; the first accepted policy block makes it active and
/// from then on every evaluated block advances the chain. Calls must not be
/// interleaved on one instance; the published [`LedgerState`]s can be shared.
pub struct EvaluationState {
    crypto: Arc<dyn CryptoProvider>,
    config: LedgerConfig,
    active: Option<ActiveLedger>,
    known_link_hashes: BTreeMap<u64, Vec<u8>>,
    known_authors: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// State plus everything derived from its policy.
struct ActiveLedger {
    state: Arc<LedgerState>,
    hasher: Arc<dyn HashAlgorithm>,
    signer: Arc<dyn SignatureAlgorithm>,
    allowed: HashSet<BlockTypeSequence>,
}

impl ActiveLedger {
    fn new(crypto: &dyn CryptoProvider, state: Arc<LedgerState>) -> LedgerResult<Self> {
        let algorithms = PolicyAlgorithms::resolve(crypto, &state.policy)?;
        let allowed = state.policy.allowed_sequences()?;
        Ok(Self {
            state,
            hasher: algorithms.hasher,
            signer: algorithms.signer,
            allowed,
        })
    }
}

struct PolicyAlgorithms {
    hasher: Arc<dyn HashAlgorithm>,
    signer: Arc<dyn SignatureAlgorithm>,
}

impl PolicyAlgorithms {
    fn resolve(crypto: &dyn CryptoProvider, policy: &Policy) -> LedgerResult<Self> {
        Ok(Self {
            hasher: crypto.create_hash(&policy.hashing_algorithm)?,
            signer: crypto.create_signature_algorithm(&policy.signing_algorithm)?,
        })
    }
}

/// Problems raised during one evaluation, logged as they are found.
#[derive(Default)]
struct Diagnostics {
    problems: Vec<Problem>,
}

impl Diagnostics {
    fn report(&mut self, problem: Problem) {
        warn!(?problem, "{problem}");
        self.problems.push(problem);
    }
}

impl EvaluationState {
    /// Evaluator for a ledger with no blocks yet.
    pub fn for_empty_ledger(crypto: Arc<dyn CryptoProvider>, config: LedgerConfig) -> Self {
        Self {
            crypto,
            config,
            active: None,
            known_link_hashes: BTreeMap::new(),
            known_authors: BTreeMap::new(),
        }
    }

    /// Resume from a published state and the tables built so far.
    ///
    /// Fails if the policy's algorithms cannot be resolved, or if the state
    /// and link table do not describe the same chain.
    pub fn for_ledger(
        crypto: Arc<dyn CryptoProvider>,
        config: LedgerConfig,
        ledger_state: Arc<LedgerState>,
        known_link_hashes: BTreeMap<u64, Vec<u8>>,
        known_authors: BTreeMap<Vec<u8>, Vec<u8>>,
    ) -> LedgerResult<Self> {
        check_resumable(
            ledger_state.block_count,
            &ledger_state.head_link_hash,
            &known_link_hashes,
        )?;
        let active = ActiveLedger::new(crypto.as_ref(), ledger_state)?;
        Ok(Self {
            crypto,
            config,
            active: Some(active),
            known_link_hashes,
            known_authors,
        })
    }

    pub fn from_snapshot(
        crypto: Arc<dyn CryptoProvider>,
        config: LedgerConfig,
        snapshot: &EvaluationSnapshot,
    ) -> LedgerResult<Self> {
        Self::for_ledger(
            crypto,
            config,
            Arc::new(snapshot.ledger_state()?),
            snapshot.link_table(),
            snapshot.author_table(),
        )
    }

    /// Capture the current state and tables; `None` before genesis.
    pub fn snapshot(&self) -> LedgerResult<Option<EvaluationSnapshot>> {
        self.active
            .as_ref()
            .map(|active| {
                EvaluationSnapshot::new(&active.state, &self.known_link_hashes, &self.known_authors)
            })
            .transpose()
    }

    pub fn ledger_state(&self) -> Option<&Arc<LedgerState>> {
        self.active.as_ref().map(|active| &active.state)
    }

    pub fn block_count(&self) -> u64 {
        self.ledger_state().map_or(0, |state| state.block_count)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn crypto(&self) -> &Arc<dyn CryptoProvider> {
        &self.crypto
    }

    pub fn known_link_hash(&self, index: u64) -> Option<&[u8]> {
        self.known_link_hashes.get(&index).map(Vec::as_slice)
    }

    pub fn known_author(&self, author_id: &[u8]) -> Option<&[u8]> {
        self.known_authors.get(author_id).map(Vec::as_slice)
    }

    pub fn known_link_hashes(&self) -> &BTreeMap<u64, Vec<u8>> {
        &self.known_link_hashes
    }

    pub fn known_authors(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.known_authors
    }

    /// Parse and evaluate raw block bytes.
    ///
    /// Unparsable bytes report [`Problem::MalformedBlock`]; once the ledger is
    /// active they still advance the chain, since the ledger commits to
    /// whatever was submitted. Their link hash is not recorded, so acks of
    /// that index report [`Problem::BlockNotFound`].
    pub fn evaluate_raw(&mut self, raw: impl Into<Bytes>) -> LedgerResult<EvaluationReport> {
        let raw = raw.into();
        match Block::parse_with(raw.clone(), self.config.read_options()) {
            Ok(block) => {
                let mut report = self.evaluate(&block)?;
                report.block = Some(block);
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, len = raw.len(), "unparsable block");
                let mut diagnostics = Diagnostics::default();
                diagnostics.report(Problem::MalformedBlock);
                let state = match &self.active {
                    Some(active) => {
                        let next = active.state.advance(active.hasher.as_ref(), &raw, false);
                        Some(self.install(next))
                    }
                    None => None,
                };
                Ok(EvaluationReport {
                    state,
                    block: None,
                    problems: diagnostics.problems,
                })
            }
        }
    }

    /// Evaluate a parsed block.
    ///
    /// Returns an error only for a policy block after genesis; everything
    /// else is reported as problems in the returned report.
    pub fn evaluate(&mut self, block: &Block) -> LedgerResult<EvaluationReport> {
        let mut diagnostics = Diagnostics::default();
        let state = match self.active.as_ref() {
            None => self.evaluate_genesis(block, &mut diagnostics),
            Some(active) => {
                let next = check_next(
                    active,
                    &self.known_link_hashes,
                    &mut self.known_authors,
                    block,
                    &mut diagnostics,
                )?;
                Some(self.publish(next))
            }
        };
        if let Some(state) = &state {
            debug!(
                index = state.head_index(),
                shape = %block.type_sequence(),
                problems = diagnostics.problems.len(),
                "block evaluated"
            );
        }
        Ok(EvaluationReport {
            state,
            block: None,
            problems: diagnostics.problems,
        })
    }

    fn evaluate_genesis(
        &mut self,
        block: &Block,
        diagnostics: &mut Diagnostics,
    ) -> Option<Arc<LedgerState>> {
        let BlockBody::Policy { version, policy } = block.body() else {
            diagnostics.report(Problem::BlockTypeNotAllowed);
            return None;
        };
        let policy = match Policy::parse(*version, policy) {
            Ok(policy) => Arc::new(policy),
            Err(err) => {
                warn!(error = %err, "genesis policy rejected");
                diagnostics.report(Problem::CannotParsePolicy);
                return None;
            }
        };
        let algorithms = match PolicyAlgorithms::resolve(self.crypto.as_ref(), &policy) {
            Ok(algorithms) => algorithms,
            Err(err) => {
                warn!(error = %err, "genesis policy names unavailable algorithms");
                diagnostics.report(Problem::CannotParsePolicy);
                return None;
            }
        };
        let allowed = match policy.allowed_sequences() {
            Ok(allowed) => allowed,
            Err(err) => {
                warn!(error = %err, "genesis policy rejected");
                diagnostics.report(Problem::CannotParsePolicy);
                return None;
            }
        };

        register_authors(
            algorithms.hasher.as_ref(),
            algorithms.signer.as_ref(),
            &mut self.known_authors,
            policy.author_keys.iter().map(Vec::as_slice),
            diagnostics,
        );
        let state = Arc::new(LedgerState::genesis(
            algorithms.hasher.as_ref(),
            Arc::clone(&policy),
            block.raw(),
        ));
        debug!(
            authors = policy.author_keys.len(),
            allowed = allowed.len(),
            "genesis policy installed"
        );
        self.active = Some(ActiveLedger {
            state: Arc::clone(&state),
            hasher: algorithms.hasher,
            signer: algorithms.signer,
            allowed,
        });
        self.record_link(&state);
        Some(state)
    }

    /// Install `next` as the head and record its link hash.
    fn publish(&mut self, next: LedgerState) -> Arc<LedgerState> {
        let next = self.install(next);
        self.record_link(&next);
        next
    }

    fn install(&mut self, next: LedgerState) -> Arc<LedgerState> {
        let next = Arc::new(next);
        if let Some(active) = self.active.as_mut() {
            active.state = Arc::clone(&next);
        }
        next
    }

    fn record_link(&mut self, state: &LedgerState) {
        self.known_link_hashes
            .insert(state.head_index(), state.head_link_hash.clone());
    }
}

/// Size, shape and per-layer checks of a block against the active ledger,
/// yielding the state that follows it.
fn check_next(
    active: &ActiveLedger,
    known_link_hashes: &BTreeMap<u64, Vec<u8>>,
    known_authors: &mut BTreeMap<Vec<u8>, Vec<u8>>,
    block: &Block,
    diagnostics: &mut Diagnostics,
) -> LedgerResult<LedgerState> {
    let current = active.state.as_ref();
    if block.raw_len() as u64 > current.policy.max_block_size {
        diagnostics.report(Problem::BlockTooBig);
    }
    if !active.allowed.contains(&block.type_sequence()) {
        diagnostics.report(Problem::BlockTypeNotAllowed);
    }

    let mut checks = BlockChecks {
        current,
        hasher: active.hasher.as_ref(),
        signer: active.signer.as_ref(),
        known_link_hashes,
        known_authors,
        diagnostics,
        update_context: false,
    };
    for layer in block.layers() {
        checks.check(layer)?;
    }
    let update_context = checks.update_context;
    Ok(current.advance(active.hasher.as_ref(), block.raw(), update_context))
}

/// Per-layer checks for a block evaluated against an active ledger.
struct BlockChecks<'a> {
    current: &'a LedgerState,
    hasher: &'a dyn HashAlgorithm,
    signer: &'a dyn SignatureAlgorithm,
    known_link_hashes: &'a BTreeMap<u64, Vec<u8>>,
    known_authors: &'a mut BTreeMap<Vec<u8>, Vec<u8>>,
    diagnostics: &'a mut Diagnostics,
    update_context: bool,
}

impl BlockChecks<'_> {
    fn check(&mut self, block: &Block) -> LedgerResult<()> {
        match block.body() {
            BlockBody::Policy { .. } => {
                return Err(LedgerError::PolicyAmendmentUnsupported {
                    block_index: self.current.block_count,
                });
            }
            BlockBody::Data { .. } => {}
            BlockBody::Reference { hashes } => {
                let expected = self.hasher.output_len();
                for hash in hashes {
                    if hash.len() != expected {
                        self.diagnostics.report(Problem::InvalidHashLength);
                    }
                }
            }
            BlockBody::AddAuthors { author_keys } => {
                register_authors(
                    self.hasher,
                    self.signer,
                    self.known_authors,
                    author_keys.iter().map(|key| &key[..]),
                    self.diagnostics,
                );
            }
            BlockBody::Ack {
                target_index,
                target_link_hash,
            } => match self.known_link_hashes.get(target_index) {
                None => self.diagnostics.report(Problem::BlockNotFound),
                Some(known) if known[..] != target_link_hash[..] => {
                    self.diagnostics.report(Problem::BlockLinkHashMismatch)
                }
                Some(_) => {}
            },
            BlockBody::AuthorSignature {
                author_id,
                inner,
                signature,
            } => match self.known_authors.get(&author_id[..]) {
                None => self.diagnostics.report(Problem::AuthorNotFound),
                Some(public_key) if !self.signer.verify(public_key, inner.raw(), signature) => {
                    self.diagnostics.report(Problem::InvalidSignature)
                }
                Some(_) => {}
            },
            BlockBody::PreviousBlock {
                previous_block_hash,
                ..
            } => {
                if previous_block_hash[..] != self.current.head_block_hash[..] {
                    self.diagnostics.report(Problem::PreviousBlockHashMismatch);
                }
            }
            BlockBody::InContext {
                context_link_hash, ..
            } => {
                if context_link_hash[..] != self.current.context_link_hash[..] {
                    self.diagnostics.report(Problem::ContextLinkHashMismatch);
                }
            }
            BlockBody::UpdateContext { .. } => self.update_context = true,
        }
        Ok(())
    }
}

/// Register author keys under their ids, reporting bad lengths and
/// duplicates. Keys of the wrong length are still registered.
fn register_authors<'k>(
    hasher: &dyn HashAlgorithm,
    signer: &dyn SignatureAlgorithm,
    known_authors: &mut BTreeMap<Vec<u8>, Vec<u8>>,
    keys: impl IntoIterator<Item = &'k [u8]>,
    diagnostics: &mut Diagnostics,
) {
    for public_key in keys {
        if public_key.len() != signer.public_key_len() {
            diagnostics.report(Problem::InvalidAuthorKey);
        }
        let author_id = hasher.hash(public_key);
        if known_authors.contains_key(&author_id) {
            diagnostics.report(Problem::AuthorAlreadyPresent);
        } else {
            known_authors.insert(author_id, public_key.to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{AuthorSigner, LedgerBuilder};
    use proptest::prelude::*;
    use serde_json::json;
    use tel_block::BlockBuilder;
    use tel_crypto::{Ed25519, KeyPair, LedgerCryptoProvider};

    const MAX_BLOCK_SIZE: u64 = 10 * 1024;

    /// A ledger holding only its genesis policy, with Alice as the author.
    struct Fixture {
        crypto: Arc<dyn CryptoProvider>,
        alice: KeyPair,
        bob: KeyPair,
        alice_id: Vec<u8>,
        genesis: Bytes,
        evaluation: EvaluationState,
    }

    impl Fixture {
        fn new() -> Self {
            let crypto: Arc<dyn CryptoProvider> =
                Arc::new(LedgerCryptoProvider::for_ledger([7; 32]));
            let alice = Ed25519::key_pair_from_seed([2; 32]);
            let bob = Ed25519::key_pair_from_seed([3; 32]);
            let alice_id = crypto
                .create_hash("blake3(ledgerId)")
                .unwrap()
                .hash(alice.public_key());
            let genesis = Self::policy(&alice, MAX_BLOCK_SIZE, single_layer_shapes())
                .to_block()
                .unwrap()
                .to_bytes()
                .unwrap();

            let mut evaluation =
                EvaluationState::for_empty_ledger(Arc::clone(&crypto), LedgerConfig::default());
            let report = evaluation.evaluate_raw(genesis.clone()).unwrap();
            assert!(report.is_clean());
            Self {
                crypto,
                alice,
                bob,
                alice_id,
                genesis,
                evaluation,
            }
        }

        fn policy(author: &KeyPair, max_block_size: u64, allowed_blocks: Vec<Vec<u8>>) -> Policy {
            Policy {
                ledger_public_key: b"ledger public key".to_vec(),
                max_block_size,
                hashing_algorithm: "blake3(ledgerId)".into(),
                signing_algorithm: "ed25519".into(),
                allowed_blocks,
                author_keys: vec![author.public_key().to_vec()],
                application_data: json!({ "version": "1.0.0" }),
            }
        }

        fn state(&self) -> &Arc<LedgerState> {
            self.evaluation.ledger_state().unwrap()
        }

        /// A second evaluator resumed at the genesis state.
        fn resume(&self) -> EvaluationState {
            EvaluationState::for_ledger(
                Arc::clone(&self.crypto),
                LedgerConfig::default(),
                Arc::clone(self.state()),
                self.evaluation.known_link_hashes().clone(),
                self.evaluation.known_authors().clone(),
            )
            .unwrap()
        }

        fn signer(&self, key: &KeyPair) -> Arc<dyn tel_block::BlockSigner> {
            Arc::new(AuthorSigner::new(Arc::new(Ed25519), key.secret_key()))
        }

        fn invalid_blocks(&self) -> Vec<(Problem, Bytes)> {
            let state = self.state();
            let build = |block: BlockBuilder| block.to_bytes().unwrap();
            vec![
                (Problem::MalformedBlock, Bytes::new()),
                (
                    Problem::BlockTypeNotAllowed,
                    build(
                        BlockBuilder::data(&b"encapsulations not allowed by policy"[..])
                            .with_previous_block(state.head_block_hash.clone())
                            .with_in_context(state.head_link_hash.clone()),
                    ),
                ),
                (
                    Problem::BlockTooBig,
                    build(BlockBuilder::data(vec![b' '; MAX_BLOCK_SIZE as usize + 1])),
                ),
                (
                    Problem::InvalidHashLength,
                    build(BlockBuilder::reference([&b"blake3 digests are 32 bytes, not 35"[..]])),
                ),
                (
                    Problem::BlockNotFound,
                    build(BlockBuilder::ack(12, &b"block #12 is not yet in the chain"[..])),
                ),
                (
                    Problem::BlockLinkHashMismatch,
                    build(BlockBuilder::ack(0, &b"this is not the link hash of #0"[..])),
                ),
                (
                    Problem::InvalidAuthorKey,
                    build(BlockBuilder::add_authors([
                        &b"public keys must be 32 bytes, this one is 44"[..],
                    ])),
                ),
                (
                    Problem::AuthorAlreadyPresent,
                    build(BlockBuilder::add_authors([
                        b"repeated keys must be reported!!".to_vec(),
                        self.alice.public_key().to_vec(),
                    ])),
                ),
                (
                    Problem::AuthorNotFound,
                    build(
                        BlockBuilder::data(&b"payload to be signed"[..])
                            .with_author_signature(&b"not alice's key id"[..], self.signer(&self.alice)),
                    ),
                ),
                (
                    Problem::InvalidSignature,
                    build(
                        BlockBuilder::data(&b"payload to be signed"[..])
                            .with_author_signature(self.alice_id.clone(), self.signer(&self.bob)),
                    ),
                ),
                (
                    Problem::PreviousBlockHashMismatch,
                    build(
                        BlockBuilder::data(&b"payload with previous block"[..])
                            .with_previous_block(&b"this is not the block hash of #0"[..]),
                    ),
                ),
                (
                    Problem::ContextLinkHashMismatch,
                    build(
                        BlockBuilder::data(&b"payload in context"[..])
                            .with_in_context(&b"this is not the link hash of #0"[..]),
                    ),
                ),
            ]
        }

        fn valid_blocks(&self) -> Vec<Bytes> {
            let state = self.state();
            let digest = [0xab; 32];
            let build = |block: BlockBuilder| block.to_bytes().unwrap();
            vec![
                Bytes::from_static(b"Dexample raw payload of any byte"),
                build(BlockBuilder::data(&b"another example payload"[..])),
                build(BlockBuilder::reference([digest.to_vec(), digest.to_vec()])),
                Bytes::from_static(b"A\x20public keys are 32 bytes long..."),
                build(BlockBuilder::add_authors([
                    &b"multiple keys cause no problems "[..],
                    &b"as long as they are different..."[..],
                ])),
                build(BlockBuilder::ack(0, state.head_link_hash.clone())),
                build(
                    BlockBuilder::data(&b"payload to be signed"[..])
                        .with_author_signature(self.alice_id.clone(), self.signer(&self.alice)),
                ),
                build(
                    BlockBuilder::data(&b"payload with previous block"[..])
                        .with_previous_block(state.head_block_hash.clone()),
                ),
                build(
                    BlockBuilder::data(&b"payload in context"[..])
                        .with_in_context(state.context_link_hash.clone()),
                ),
                build(BlockBuilder::data(&b"payload updating context"[..]).with_update_context()),
            ]
        }
    }

    fn single_layer_shapes() -> Vec<Vec<u8>> {
        ["G", "D", "R", "A", "K", "SD", "PD", "CD", "UD"]
            .iter()
            .map(|shape| shape.as_bytes().to_vec())
            .collect()
    }

    #[test]
    fn genesis_installs_policy() {
        let fixture = Fixture::new();
        let state = fixture.state();
        let hasher = fixture.crypto.create_hash("blake3(ledgerId)").unwrap();
        let block_hash = hasher.hash(&fixture.genesis);

        assert_eq!(state.block_count, 1);
        assert_eq!(state.head_block_hash, block_hash);
        assert_eq!(state.head_link_hash, hasher.hash(&block_hash));
        assert_eq!(state.context_link_hash, state.head_link_hash);
        assert_eq!(fixture.evaluation.known_link_hash(0), Some(&state.head_link_hash[..]));
        assert_eq!(
            fixture.evaluation.known_author(&fixture.alice_id),
            Some(fixture.alice.public_key())
        );
    }

    #[test]
    fn valid_blocks_are_clean() {
        let fixture = Fixture::new();
        for raw in fixture.valid_blocks() {
            let report = fixture.resume().evaluate_raw(raw.clone()).unwrap();
            assert!(report.is_clean(), "{raw:?}: {:?}", report.problems);
            assert_eq!(report.block_count(), 2);
            assert!(report.block.is_some());
        }
    }

    #[test]
    fn invalid_blocks_report_exactly_one_problem() {
        let fixture = Fixture::new();
        for (problem, raw) in fixture.invalid_blocks() {
            let report = fixture.resume().evaluate_raw(raw).unwrap();
            assert_eq!(report.problems, vec![problem]);
            assert_eq!(report.block_count(), 2, "{problem:?}");
        }
    }

    #[test]
    fn malformed_block_still_extends_chain() {
        let fixture = Fixture::new();
        let mut evaluation = fixture.resume();
        let report = evaluation.evaluate_raw(&b"K\x00"[..]).unwrap();
        assert_eq!(report.problems, vec![Problem::MalformedBlock]);
        assert!(report.block.is_none());

        let state = report.state.unwrap();
        let expected = fixture.state().advance(&tel_crypto::Blake3Keyed::new([7; 32]), b"K\x00", false);
        assert_eq!(*state, expected);
        assert_eq!(evaluation.known_link_hash(1), None);
    }

    #[test]
    fn ack_of_malformed_block_is_not_found() {
        let fixture = Fixture::new();
        let mut evaluation = fixture.resume();
        let malformed = evaluation.evaluate_raw(&b"K\x00"[..]).unwrap();
        let link = malformed.state.unwrap().head_link_hash.clone();

        let ack = BlockBuilder::ack(1, link).to_bytes().unwrap();
        let report = evaluation.evaluate_raw(ack).unwrap();
        assert_eq!(report.problems, vec![Problem::BlockNotFound]);
        assert_eq!(report.block_count(), 3);
        assert_eq!(evaluation.known_link_hash(2), Some(&report.state.unwrap().head_link_hash[..]));
    }

    #[test]
    fn update_context_publishes_link() {
        let fixture = Fixture::new();
        let mut evaluation = fixture.resume();
        let report = evaluation
            .evaluate_raw(&b"UDpayload updating context"[..])
            .unwrap();
        let state = report.state.unwrap();
        assert_eq!(state.context_link_hash, state.head_link_hash);

        let in_context = BlockBuilder::data(&b"bound to the new context"[..])
            .with_in_context(state.context_link_hash.clone())
            .to_bytes()
            .unwrap();
        assert!(evaluation.evaluate_raw(in_context).unwrap().is_clean());
    }

    #[test]
    fn added_author_can_sign() {
        let fixture = Fixture::new();
        let mut evaluation = fixture.resume();
        let add = BlockBuilder::add_authors([fixture.bob.public_key().to_vec()])
            .to_bytes()
            .unwrap();
        assert!(evaluation.evaluate_raw(add).unwrap().is_clean());

        let bob_id = fixture
            .crypto
            .create_hash("blake3(ledgerId)")
            .unwrap()
            .hash(fixture.bob.public_key());
        let signed = BlockBuilder::data(&b"from bob"[..])
            .with_author_signature(bob_id, fixture.signer(&fixture.bob))
            .to_bytes()
            .unwrap();
        let report = evaluation.evaluate_raw(signed).unwrap();
        assert!(report.is_clean(), "{:?}", report.problems);
        assert_eq!(report.block_count(), 3);
    }

    #[test]
    fn shape_and_size_problems_do_not_stop_other_checks() {
        let fixture = Fixture::new();
        let raw = BlockBuilder::ack(9, vec![0; MAX_BLOCK_SIZE as usize])
            .with_update_context()
            .to_bytes()
            .unwrap();
        let report = fixture.resume().evaluate_raw(raw).unwrap();
        assert_eq!(
            report.problems,
            vec![
                Problem::BlockTooBig,
                Problem::BlockTypeNotAllowed,
                Problem::BlockNotFound
            ]
        );
        let state = report.state.unwrap();
        assert_eq!(state.context_link_hash, state.head_link_hash);
    }

    #[test]
    fn second_policy_is_rejected() {
        let fixture = Fixture::new();
        let mut evaluation = fixture.resume();
        let err = evaluation.evaluate_raw(fixture.genesis.clone()).unwrap_err();
        assert_eq!(err, LedgerError::PolicyAmendmentUnsupported { block_index: 1 });
        assert_eq!(evaluation.block_count(), 1);
    }

    #[test]
    fn unparsable_policies_are_rejected() {
        let cases: Vec<Vec<u8>> = vec![
            b"G\x00reserved version".to_vec(),
            b"G\x01null".to_vec(),
            [&b"G\x01"[..], &br#"{"ledger_public_key":"00","signing_algorithm":"ed25519","hashing_algorithm":"blake3","allowed_blocks":[],"author_keys":[],"application_data":{}}"#[..]].concat(),
            [&b"G\x01"[..], &br#"{"ledger_public_key":"00","max_block_size":true,"signing_algorithm":"ed25519","hashing_algorithm":"blake3","allowed_blocks":[],"author_keys":[],"application_data":{}}"#[..]].concat(),
            [&b"G\x01"[..], &br#"{"ledger_public_key":"00","max_block_size":123,"signing_algorithm":"ed25519","hashing_algorithm":"blake3","allowed_blocks":["2d"],"author_keys":[],"application_data":{}}"#[..]].concat(),
            [&b"G\x01"[..], &br#"{"ledger_public_key":"00","max_block_size":123,"signing_algorithm":"ed25519","hashing_algorithm":"blake3","allowed_blocks":["80"],"author_keys":[],"application_data":{}}"#[..]].concat(),
            [&b"G\x01"[..], &br#"{"unexpected":true,"ledger_public_key":"00","max_block_size":123,"signing_algorithm":"ed25519","hashing_algorithm":"blake3","allowed_blocks":[],"author_keys":[],"application_data":{}}"#[..]].concat(),
            [&b"G\x01"[..], &br#"{"ledger_public_key":"00","max_block_size":123,"signing_algorithm":"ed25519","hashing_algorithm":"sha1","allowed_blocks":[],"author_keys":[],"application_data":{}}"#[..]].concat(),
        ];
        let fixture = Fixture::new();
        let alice = fixture.alice.clone();
        let policies = [
            Fixture::policy(&alice, 0, single_layer_shapes()),
            Fixture::policy(&alice, MAX_BLOCK_SIZE, vec![b"D".to_vec(), b"D".to_vec()]),
        ]
        .map(|policy| policy.to_block().unwrap().to_bytes().unwrap().to_vec());

        for raw in cases.into_iter().chain(policies) {
            let mut evaluation =
                EvaluationState::for_empty_ledger(Arc::clone(&fixture.crypto), LedgerConfig::default());
            let report = evaluation.evaluate_raw(raw.clone()).unwrap();
            assert_eq!(
                report.problems,
                vec![Problem::CannotParsePolicy],
                "{}",
                String::from_utf8_lossy(&raw)
            );
            assert!(report.state.is_none());
            assert!(evaluation.ledger_state().is_none());
        }
    }

    #[test]
    fn non_policy_genesis_is_rejected() {
        let fixture = Fixture::new();
        for raw in fixture.valid_blocks() {
            let mut evaluation =
                EvaluationState::for_empty_ledger(Arc::clone(&fixture.crypto), LedgerConfig::default());
            let report = evaluation.evaluate_raw(raw).unwrap();
            assert_eq!(report.problems, vec![Problem::BlockTypeNotAllowed]);
            assert!(report.state.is_none());
        }

        let mut evaluation =
            EvaluationState::for_empty_ledger(Arc::clone(&fixture.crypto), LedgerConfig::default());
        let report = evaluation.evaluate_raw(Bytes::new()).unwrap();
        assert_eq!(report.problems, vec![Problem::MalformedBlock]);
        assert!(report.state.is_none());
        assert!(evaluation.known_link_hashes().is_empty());
    }

    #[test]
    fn nesting_limit_comes_from_config() {
        let fixture = Fixture::new();
        let config = LedgerConfig {
            max_block_depth: 2,
            ..LedgerConfig::default()
        };
        let mut evaluation = EvaluationState::for_ledger(
            Arc::clone(&fixture.crypto),
            config,
            Arc::clone(fixture.state()),
            fixture.evaluation.known_link_hashes().clone(),
            fixture.evaluation.known_authors().clone(),
        )
        .unwrap();
        let report = evaluation.evaluate_raw(&b"UUDtoo deep"[..]).unwrap();
        assert_eq!(report.problems, vec![Problem::MalformedBlock]);
        assert_eq!(report.block_count(), 2);
    }

    #[test]
    fn snapshot_resumes_evaluation() {
        let fixture = Fixture::new();
        let mut evaluation = fixture.resume();
        let blocks = fixture.valid_blocks();
        for raw in &blocks[..3] {
            evaluation.evaluate_raw(raw.clone()).unwrap();
        }

        let snapshot = evaluation.snapshot().unwrap().unwrap();
        let decoded = EvaluationSnapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
        let mut resumed =
            EvaluationState::from_snapshot(Arc::clone(&fixture.crypto), LedgerConfig::default(), &decoded)
                .unwrap();

        for raw in &blocks[3..] {
            let expected = evaluation.evaluate_raw(raw.clone()).unwrap();
            let actual = resumed.evaluate_raw(raw.clone()).unwrap();
            assert_eq!(actual.problems, expected.problems);
            assert_eq!(actual.state, expected.state);
        }
        assert_eq!(resumed.known_link_hashes(), evaluation.known_link_hashes());
        assert_eq!(resumed.known_authors(), evaluation.known_authors());
    }

    #[test]
    fn resume_checks_link_table() {
        let fixture = Fixture::new();
        let resume = |links: BTreeMap<u64, Vec<u8>>| {
            EvaluationState::for_ledger(
                Arc::clone(&fixture.crypto),
                LedgerConfig::default(),
                Arc::clone(fixture.state()),
                links,
                BTreeMap::new(),
            )
        };
        let err = resume(BTreeMap::new()).err().unwrap();
        assert!(matches!(err, LedgerError::InconsistentState(_)), "{err:?}");
        let stale = BTreeMap::from([(0, b"not the genesis link".to_vec())]);
        assert!(matches!(resume(stale), Err(LedgerError::InconsistentState(_))));
    }

    #[test]
    fn snapshot_after_malformed_head_resumes() {
        let fixture = Fixture::new();
        let mut evaluation = fixture.resume();
        evaluation.evaluate_raw(&b"K\x00"[..]).unwrap();
        let snapshot = evaluation.snapshot().unwrap().unwrap();
        let decoded = EvaluationSnapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
        let resumed =
            EvaluationState::from_snapshot(Arc::clone(&fixture.crypto), LedgerConfig::default(), &decoded)
                .unwrap();
        assert_eq!(resumed.block_count(), 2);
        assert_eq!(resumed.known_link_hash(1), None);
    }

    #[test]
    fn empty_ledger_has_no_snapshot() {
        let evaluation = EvaluationState::for_empty_ledger(
            Arc::new(LedgerCryptoProvider::for_ledger([0; 32])),
            LedgerConfig::default(),
        );
        assert!(evaluation.snapshot().unwrap().is_none());
        assert_eq!(evaluation.block_count(), 0);
    }

    /// Genesis with Alice, 5MB blocks, and the shapes the scenarios need.
    fn scenario_ledger() -> (Fixture, Bytes, EvaluationState) {
        let fixture = Fixture::new();
        let genesis = Fixture::policy(
            &fixture.alice,
            5 * 1024 * 1024,
            vec![b"SUD".to_vec(), b"SK".to_vec(), b"K".to_vec(), b"D".to_vec()],
        )
        .to_block()
        .unwrap()
        .to_bytes()
        .unwrap();
        let mut evaluation =
            EvaluationState::for_empty_ledger(Arc::clone(&fixture.crypto), LedgerConfig::default());
        assert!(evaluation.evaluate_raw(genesis.clone()).unwrap().is_clean());
        (fixture, genesis, evaluation)
    }

    #[test]
    fn signed_update_context_data_is_clean() {
        let (fixture, _, mut evaluation) = scenario_ledger();
        let raw = BlockBuilder::data(&b"signed payload"[..])
            .with_update_context()
            .with_author_signature(fixture.alice_id.clone(), fixture.signer(&fixture.alice))
            .to_bytes()
            .unwrap();
        let report = evaluation.evaluate_raw(raw).unwrap();
        assert!(report.is_clean(), "{:?}", report.problems);
        assert_eq!(report.block_count(), 2);
    }

    #[test]
    fn ack_of_unknown_index() {
        let (_, _, mut evaluation) = scenario_ledger();
        let raw = BlockBuilder::ack(41, vec![0; 32]).to_bytes().unwrap();
        let report = evaluation.evaluate_raw(raw).unwrap();
        assert_eq!(report.problems, vec![Problem::BlockNotFound]);
        assert_eq!(report.block_count(), 2);
    }

    #[test]
    fn concurrent_acks_in_either_order() {
        let (fixture, genesis, evaluation) = scenario_ledger();
        let builder = LedgerBuilder::from_state(
            Arc::clone(&fixture.crypto),
            LedgerConfig::default(),
            Arc::clone(evaluation.ledger_state().unwrap()),
        );
        let (first, _) = builder
            .ack()
            .author_signature(&fixture.alice)
            .unwrap()
            .build()
            .unwrap();
        let (second, _) = builder.ack().build().unwrap();

        for order in [[&first, &second], [&second, &first]] {
            let mut evaluation =
                EvaluationState::for_empty_ledger(Arc::clone(&fixture.crypto), LedgerConfig::default());
            evaluation.evaluate_raw(genesis.clone()).unwrap();
            for raw in order {
                let report = evaluation.evaluate_raw(raw.clone()).unwrap();
                assert!(report.is_clean(), "{:?}", report.problems);
            }
            assert_eq!(evaluation.block_count(), 3);
        }
    }

    #[test]
    fn oversized_data_block() {
        let (_, _, mut evaluation) = scenario_ledger();
        let raw = BlockBuilder::data(vec![0x5a; 5 * 1024 * 1024])
            .to_bytes()
            .unwrap();
        let report = evaluation.evaluate_raw(raw).unwrap();
        assert_eq!(report.problems, vec![Problem::BlockTooBig]);
        assert_eq!(report.block_count(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn replay_is_deterministic(
            payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..12)
        ) {
            let fixture = Fixture::new();
            let blocks: Vec<Bytes> = payloads
                .into_iter()
                .map(|payload| BlockBuilder::data(payload).to_bytes().unwrap())
                .collect();

            let run = || {
                let mut evaluation = EvaluationState::for_empty_ledger(
                    Arc::clone(&fixture.crypto),
                    LedgerConfig::default(),
                );
                evaluation.evaluate_raw(fixture.genesis.clone()).unwrap();
                for raw in &blocks {
                    let report = evaluation.evaluate_raw(raw.clone()).unwrap();
                    assert!(report.is_clean());
                }
                evaluation
            };
            let first = run();
            let second = run();

            prop_assert_eq!(first.block_count(), blocks.len() as u64 + 1);
            prop_assert_eq!(first.ledger_state(), second.ledger_state());
            prop_assert_eq!(first.known_link_hashes(), second.known_link_hashes());
        }
    }
}
