use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tel_types::{varint, BlockType};

use crate::block::{Block, BlockBody};
use crate::error::{BlockError, BlockResult};
use crate::reader::ReadOptions;

/// Produces an author signature over the bytes of an inner block.
///
/// The builder calls [`BlockSigner::sign`] only after the inner block has
/// been fully written, so the signature length must be known up front.
pub trait BlockSigner: Send + Sync {
    /// Exact length of every signature this signer produces.
    fn signature_len(&self) -> usize;

    /// Sign `message`.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, String>;
}

/// Where an AuthorSignature builder gets its signature from.
#[derive(Clone)]
pub enum SignatureSource {
    /// Computed over the inner block bytes while encoding.
    Deferred(Arc<dyn BlockSigner>),
    /// Already known, e.g. when re-encoding a parsed block.
    Precomputed(Bytes),
}

impl SignatureSource {
    fn len(&self) -> usize {
        match self {
            Self::Deferred(signer) => signer.signature_len(),
            Self::Precomputed(signature) => signature.len(),
        }
    }
}

impl fmt::Debug for SignatureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deferred(signer) => f
                .debug_struct("Deferred")
                .field("signature_len", &signer.signature_len())
                .finish(),
            Self::Precomputed(signature) => f
                .debug_tuple("Precomputed")
                .field(&hex::encode(signature))
                .finish(),
        }
    }
}

/// Deterministic block encoder.
///
/// Identical field values always encode to identical bytes: fields are
/// written in wire order with minimal varints and no padding.
#[derive(Clone, Debug)]
pub enum BlockBuilder {
    Policy {
        version: u64,
        policy: Bytes,
    },
    Data {
        data: Bytes,
    },
    Reference {
        hashes: Vec<Bytes>,
    },
    AddAuthors {
        author_keys: Vec<Bytes>,
    },
    Ack {
        target_index: u64,
        target_link_hash: Bytes,
    },
    AuthorSignature {
        author_id: Bytes,
        inner: Box<BlockBuilder>,
        signature: SignatureSource,
    },
    PreviousBlock {
        previous_block_hash: Bytes,
        inner: Box<BlockBuilder>,
    },
    InContext {
        context_link_hash: Bytes,
        inner: Box<BlockBuilder>,
    },
    UpdateContext {
        inner: Box<BlockBuilder>,
    },
}

impl BlockBuilder {
    pub fn policy(version: u64, policy: impl Into<Bytes>) -> Self {
        Self::Policy {
            version,
            policy: policy.into(),
        }
    }

    pub fn data(data: impl Into<Bytes>) -> Self {
        Self::Data { data: data.into() }
    }

    pub fn reference<I, B>(hashes: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::Reference {
            hashes: hashes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_authors<I, B>(author_keys: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self::AddAuthors {
            author_keys: author_keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ack(target_index: u64, target_link_hash: impl Into<Bytes>) -> Self {
        Self::Ack {
            target_index,
            target_link_hash: target_link_hash.into(),
        }
    }

    /// Wrap in an AuthorSignature whose signature is computed while encoding.
    pub fn with_author_signature(
        self,
        author_id: impl Into<Bytes>,
        signer: Arc<dyn BlockSigner>,
    ) -> Self {
        Self::AuthorSignature {
            author_id: author_id.into(),
            inner: Box::new(self),
            signature: SignatureSource::Deferred(signer),
        }
    }

    /// Wrap in an AuthorSignature carrying an already computed signature.
    pub fn with_signature(self, author_id: impl Into<Bytes>, signature: impl Into<Bytes>) -> Self {
        Self::AuthorSignature {
            author_id: author_id.into(),
            inner: Box::new(self),
            signature: SignatureSource::Precomputed(signature.into()),
        }
    }

    pub fn with_previous_block(self, previous_block_hash: impl Into<Bytes>) -> Self {
        Self::PreviousBlock {
            previous_block_hash: previous_block_hash.into(),
            inner: Box::new(self),
        }
    }

    pub fn with_in_context(self, context_link_hash: impl Into<Bytes>) -> Self {
        Self::InContext {
            context_link_hash: context_link_hash.into(),
            inner: Box::new(self),
        }
    }

    pub fn with_update_context(self) -> Self {
        Self::UpdateContext {
            inner: Box::new(self),
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Policy { .. } => BlockType::Policy,
            Self::Data { .. } => BlockType::Data,
            Self::Reference { .. } => BlockType::Reference,
            Self::AddAuthors { .. } => BlockType::AddAuthors,
            Self::Ack { .. } => BlockType::Ack,
            Self::AuthorSignature { .. } => BlockType::AuthorSignature,
            Self::PreviousBlock { .. } => BlockType::PreviousBlock,
            Self::InContext { .. } => BlockType::InContext,
            Self::UpdateContext { .. } => BlockType::UpdateContext,
        }
    }

    /// Append this block's encoding to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) -> BlockResult<()> {
        varint::encode_u64(out, self.block_type().tag());
        match self {
            Self::Policy { version, policy } => {
                varint::encode_u64(out, *version);
                out.extend_from_slice(policy);
            }
            Self::Data { data } => out.extend_from_slice(data),
            Self::Reference { hashes } => write_sized_buffers(out, hashes),
            Self::AddAuthors { author_keys } => write_sized_buffers(out, author_keys),
            Self::Ack {
                target_index,
                target_link_hash,
            } => {
                varint::encode_u64(out, *target_index);
                write_sized_buffer(out, target_link_hash);
            }
            Self::AuthorSignature {
                author_id,
                inner,
                signature,
            } => {
                write_sized_buffer(out, author_id);
                let expected_len = signature.len();
                varint::encode_u64(out, expected_len as u64);
                let mark = out.len();
                inner.write_to(out)?;
                match signature {
                    SignatureSource::Precomputed(sig) => out.extend_from_slice(sig),
                    SignatureSource::Deferred(signer) => {
                        let sig = signer.sign(&out[mark..]).map_err(BlockError::Signing)?;
                        if sig.len() != expected_len {
                            return Err(BlockError::Signing(format!(
                                "signer produced {} bytes, announced {expected_len}",
                                sig.len()
                            )));
                        }
                        out.extend_from_slice(&sig);
                    }
                }
            }
            Self::PreviousBlock {
                previous_block_hash,
                inner,
            } => {
                write_sized_buffer(out, previous_block_hash);
                inner.write_to(out)?;
            }
            Self::InContext {
                context_link_hash,
                inner,
            } => {
                write_sized_buffer(out, context_link_hash);
                inner.write_to(out)?;
            }
            Self::UpdateContext { inner } => inner.write_to(out)?,
        }
        Ok(())
    }

    /// Encode to a fresh buffer.
    pub fn to_bytes(&self) -> BlockResult<Bytes> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(Bytes::from(out))
    }

    /// Encode and parse back into an immutable [`Block`].
    pub fn build(&self) -> BlockResult<Block> {
        self.build_with(ReadOptions::default())
    }

    pub fn build_with(&self, options: ReadOptions) -> BlockResult<Block> {
        Block::parse_with(self.to_bytes()?, options)
    }
}

impl From<&Block> for BlockBuilder {
    fn from(block: &Block) -> Self {
        match block.body() {
            BlockBody::Policy { version, policy } => Self::policy(*version, policy.clone()),
            BlockBody::Data { data } => Self::data(data.clone()),
            BlockBody::Reference { hashes } => Self::Reference {
                hashes: hashes.clone(),
            },
            BlockBody::AddAuthors { author_keys } => Self::AddAuthors {
                author_keys: author_keys.clone(),
            },
            BlockBody::Ack {
                target_index,
                target_link_hash,
            } => Self::ack(*target_index, target_link_hash.clone()),
            BlockBody::AuthorSignature {
                author_id,
                inner,
                signature,
            } => Self::from(inner.as_ref()).with_signature(author_id.clone(), signature.clone()),
            BlockBody::PreviousBlock {
                previous_block_hash,
                inner,
            } => Self::from(inner.as_ref()).with_previous_block(previous_block_hash.clone()),
            BlockBody::InContext {
                context_link_hash,
                inner,
            } => Self::from(inner.as_ref()).with_in_context(context_link_hash.clone()),
            BlockBody::UpdateContext { inner } => Self::from(inner.as_ref()).with_update_context(),
        }
    }
}

fn write_sized_buffer(out: &mut Vec<u8>, buf: &[u8]) {
    varint::encode_u64(out, buf.len() as u64);
    out.extend_from_slice(buf);
}

fn write_sized_buffers(out: &mut Vec<u8>, bufs: &[Bytes]) {
    for buf in bufs {
        write_sized_buffer(out, buf);
    }
}
