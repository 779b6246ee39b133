//! Node hashing for the audit Merkle tree.
//!
//! Leaves and interior nodes are hashed under different one-byte prefixes so
//! that an interior node can never be passed off as a leaf (or vice versa).

/// Digest stored in audit tree nodes.
pub type MerkleHash = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hash a leaf value.
pub fn merkle_leaf(value: &[u8]) -> MerkleHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(value);
    *hasher.finalize().as_bytes()
}

/// Combine two child nodes into their parent.
pub fn merkle_combine(left: &MerkleHash, right: &MerkleHash) -> MerkleHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}
