use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Tag identifying a block or encapsulation on the wire.
///
/// Tags are written as varints; the numeric values are the ASCII codes of
/// mnemonic letters so that simple blocks stay human-readable in hex dumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    Policy = b'G',
    Data = b'D',
    Reference = b'R',
    AddAuthors = b'A',
    Ack = b'K',
    AuthorSignature = b'S',
    PreviousBlock = b'P',
    InContext = b'C',
    UpdateContext = b'U',
}

impl BlockType {
    /// Every block type, terminal blocks first.
    pub const ALL: [BlockType; 9] = [
        BlockType::Policy,
        BlockType::Data,
        BlockType::Reference,
        BlockType::AddAuthors,
        BlockType::Ack,
        BlockType::AuthorSignature,
        BlockType::PreviousBlock,
        BlockType::InContext,
        BlockType::UpdateContext,
    ];

    /// Numeric wire tag.
    pub const fn tag(self) -> u64 {
        self as u64
    }

    /// Look up a wire tag.
    pub fn from_tag(tag: u64) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(TypeError::UnknownBlockType(tag))
    }

    /// Whether this type wraps exactly one inner block.
    pub const fn is_encapsulation(self) -> bool {
        matches!(
            self,
            BlockType::AuthorSignature
                | BlockType::PreviousBlock
                | BlockType::InContext
                | BlockType::UpdateContext
        )
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            BlockType::Policy => "Policy",
            BlockType::Data => "Data",
            BlockType::Reference => "Reference",
            BlockType::AddAuthors => "AddAuthors",
            BlockType::Ack => "Ack",
            BlockType::AuthorSignature => "AuthorSignature",
            BlockType::PreviousBlock => "PreviousBlock",
            BlockType::InContext => "InContext",
            BlockType::UpdateContext => "UpdateContext",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u64> for BlockType {
    type Error = TypeError;

    fn try_from(tag: u64) -> Result<Self, Self::Error> {
        Self::from_tag(tag)
    }
}
