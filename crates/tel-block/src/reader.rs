use bytes::Bytes;
use tel_types::{varint, BlockType};

use crate::block::{Block, BlockBody};
use crate::error::{BlockError, BlockResult};

/// Maximum number of nested blocks, counting the outermost one.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Parser limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadOptions {
    pub max_depth: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parse a complete block out of `raw`.
pub(crate) fn read_block(raw: Bytes, options: ReadOptions) -> BlockResult<Block> {
    let end = raw.len();
    BlockReader {
        buf: raw,
        pos: 0,
        end,
        depth_left: options.max_depth,
        max_depth: options.max_depth,
    }
    .read()
}

/// Cursor over one block's window `[pos, end)` of a shared buffer.
///
/// Signatures are taken from the end of the window, so `end` shrinks as well
/// as `pos` growing. Whatever is left between them when an encapsulation is
/// reached becomes the inner block's window.
struct BlockReader {
    buf: Bytes,
    pos: usize,
    end: usize,
    depth_left: usize,
    max_depth: usize,
}

impl BlockReader {
    fn remaining(&self) -> usize {
        self.end - self.pos
    }

    fn read_varint(&mut self) -> BlockResult<u64> {
        let (value, used) = varint::decode_u64(&self.buf[self.pos..self.end]).map_err(|source| {
            BlockError::Varint {
                offset: self.pos,
                source,
            }
        })?;
        self.pos += used;
        Ok(value)
    }

    fn checked_len(&self, len: u64) -> BlockResult<usize> {
        match usize::try_from(len) {
            Ok(n) if n <= self.remaining() => Ok(n),
            _ => Err(BlockError::Overrun {
                needed: len,
                available: self.remaining(),
            }),
        }
    }

    fn read_buffer(&mut self, len: u64) -> BlockResult<Bytes> {
        let n = self.checked_len(len)?;
        let out = self.buf.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(out)
    }

    fn read_from_end(&mut self, len: u64) -> BlockResult<Bytes> {
        let n = self.checked_len(len)?;
        let out = self.buf.slice(self.end - n..self.end);
        self.end -= n;
        Ok(out)
    }

    fn read_sized_buffer(&mut self) -> BlockResult<Bytes> {
        let len = self.read_varint()?;
        self.read_buffer(len)
    }

    fn read_sized_buffers(&mut self) -> BlockResult<Vec<Bytes>> {
        let mut out = Vec::new();
        while self.pos < self.end {
            out.push(self.read_sized_buffer()?);
        }
        Ok(out)
    }

    fn read_rest(&mut self) -> Bytes {
        let out = self.buf.slice(self.pos..self.end);
        self.pos = self.end;
        out
    }

    fn read_inner_block(&mut self) -> BlockResult<Box<Block>> {
        let inner = BlockReader {
            buf: self.buf.clone(),
            pos: self.pos,
            end: self.end,
            depth_left: self.depth_left - 1,
            max_depth: self.max_depth,
        }
        .read()?;
        self.pos = self.end;
        Ok(Box::new(inner))
    }

    fn read(mut self) -> BlockResult<Block> {
        if self.depth_left == 0 {
            return Err(BlockError::TooDeep {
                max_depth: self.max_depth,
            });
        }
        let raw = self.buf.slice(self.pos..self.end);
        let tag = self.read_varint()?;
        let block_type = BlockType::from_tag(tag).map_err(|_| BlockError::UnknownType(tag))?;

        let body = match block_type {
            BlockType::Policy => {
                let version = self.read_varint()?;
                BlockBody::Policy {
                    version,
                    policy: self.read_rest(),
                }
            }
            BlockType::Data => BlockBody::Data {
                data: self.read_rest(),
            },
            BlockType::Reference => BlockBody::Reference {
                hashes: self.read_sized_buffers()?,
            },
            BlockType::AddAuthors => BlockBody::AddAuthors {
                author_keys: self.read_sized_buffers()?,
            },
            BlockType::Ack => {
                let target_index = self.read_varint()?;
                let target_link_hash = self.read_sized_buffer()?;
                if self.remaining() != 0 {
                    return Err(BlockError::TrailingBytes(self.remaining()));
                }
                BlockBody::Ack {
                    target_index,
                    target_link_hash,
                }
            }
            BlockType::AuthorSignature => {
                let author_id = self.read_sized_buffer()?;
                let signature_len = self.read_varint()?;
                let signature = self.read_from_end(signature_len)?;
                BlockBody::AuthorSignature {
                    author_id,
                    inner: self.read_inner_block()?,
                    signature,
                }
            }
            BlockType::PreviousBlock => {
                let previous_block_hash = self.read_sized_buffer()?;
                BlockBody::PreviousBlock {
                    previous_block_hash,
                    inner: self.read_inner_block()?,
                }
            }
            BlockType::InContext => {
                let context_link_hash = self.read_sized_buffer()?;
                BlockBody::InContext {
                    context_link_hash,
                    inner: self.read_inner_block()?,
                }
            }
            BlockType::UpdateContext => BlockBody::UpdateContext {
                inner: self.read_inner_block()?,
            },
        };
        Ok(Block::from_parts(raw, body))
    }
}
