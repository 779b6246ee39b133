use serde::{Deserialize, Serialize};

use crate::error::{MerkleError, MerkleResult};
use crate::proof::{AbstractStep, StepTarget};

/// Coordinate in an infinite perfect binary tree.
///
/// `height` is the distance from the leaf level; `index` is the position
/// within that level, starting from 0. Leaf `i` is `(0, i)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Node {
    pub height: u32,
    pub index: u64,
}

impl Node {
    pub const fn new(height: u32, index: u64) -> Self {
        Self { height, index }
    }

    pub const fn leaf(index: u64) -> Self {
        Self::new(0, index)
    }

    pub const fn is_left_child(self) -> bool {
        self.index & 1 == 0
    }

    pub const fn is_right_child(self) -> bool {
        self.index & 1 == 1
    }

    pub const fn parent(self) -> Self {
        Self::new(self.height + 1, self.index >> 1)
    }

    pub const fn sibling(self) -> Self {
        Self::new(self.height, self.index ^ 1)
    }

    /// The node at the same height immediately to the left, if any.
    pub fn left_neighbour(self) -> Option<Self> {
        self.index.checked_sub(1).map(|index| Self::new(self.height, index))
    }

    pub const fn subtree(self) -> SubTree {
        SubTree { root: self }
    }

    /// Ancestors up to the root of a tree with `leaves_count` leaves.
    pub fn ancestors(self, leaves_count: u64) -> Ancestors {
        Ancestors {
            node: self,
            leaves_count,
        }
    }
}

/// Iterator returned by [`Node::ancestors`].
#[derive(Clone, Debug)]
pub struct Ancestors {
    node: Node,
    leaves_count: u64,
}

impl Iterator for Ancestors {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        if self.leaves_count <= 1 {
            return None;
        }
        self.node = self.node.parent();
        self.leaves_count = self.leaves_count / 2 + self.leaves_count % 2;
        Some(self.node)
    }
}

/// The leaves covered by a node.
///
/// Leaf arithmetic saturates, so subtrees taller than the `u64` leaf space
/// compare as covering every representable leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubTree {
    pub root: Node,
}

impl SubTree {
    pub fn leaves_count(self) -> u64 {
        1u64.checked_shl(self.root.height).unwrap_or(u64::MAX)
    }

    pub fn min_leaf_index(self) -> u64 {
        self.root.index.saturating_mul(self.leaves_count())
    }

    pub fn max_leaf_index(self) -> u64 {
        self.min_leaf_index().saturating_add(self.leaves_count() - 1)
    }

    pub fn contains(self, node: Node) -> bool {
        let other = node.subtree();
        other.min_leaf_index() >= self.min_leaf_index()
            && self.max_leaf_index() >= other.max_leaf_index()
    }

    /// Whether every leaf of this subtree is among the first `leaves_count`.
    pub fn is_within(self, leaves_count: u64) -> bool {
        self.max_leaf_index() < leaves_count
    }
}

/// Ancestors of a leaf that become complete when that leaf is appended.
///
/// Climbing stops at the first left child: its sibling is still empty.
pub fn perfected_ancestors(leaf_index: u64) -> impl Iterator<Item = Node> {
    let mut node = Node::leaf(leaf_index);
    std::iter::from_fn(move || {
        if node.is_right_child() {
            node = node.parent();
            Some(node)
        } else {
            None
        }
    })
}

/// Abstract proof that leaf `leaf_index` belongs to a tree of
/// `leaves_count` leaves.
pub fn inclusion_proof(leaf_index: u64, leaves_count: u64) -> MerkleResult<Vec<AbstractStep>> {
    if leaf_index >= leaves_count {
        return Err(MerkleError::LeafOutOfRange {
            leaf_index,
            leaves_count,
        });
    }
    Ok(steps_to_root(Node::leaf(leaf_index), leaves_count))
}

/// Abstract proof that a tree of `old_count` leaves is a prefix of a tree of
/// `new_count` leaves.
///
/// A zero-leaf old tree has no root to reproduce, so it is rejected.
pub fn consistency_proof(old_count: u64, new_count: u64) -> MerkleResult<Vec<AbstractStep>> {
    if old_count == 0 || new_count < old_count {
        return Err(MerkleError::InvalidRange {
            old_count,
            new_count,
        });
    }
    let mut start = Node::leaf(old_count - 1);
    while start.is_right_child() {
        start = start.parent();
    }
    Ok(steps_to_root(start, new_count))
}

fn steps_to_root(start: Node, leaves_count: u64) -> Vec<AbstractStep> {
    // The root's sibling is always dropped by the range filter, so there is
    // no need to know the root height up front.
    let siblings = std::iter::once(start)
        .chain(start.ancestors(leaves_count))
        .map(Node::sibling);

    std::iter::once(start)
        .chain(siblings)
        .map(Node::subtree)
        .filter(|subtree| subtree.min_leaf_index() < leaves_count)
        .map(|subtree| {
            let target = if subtree.is_within(leaves_count) {
                StepTarget::Node(subtree.root)
            } else {
                StepTarget::SubProof(partial_cover(subtree, leaves_count))
            };
            AbstractStep {
                append_to_left: subtree.root.is_left_child(),
                target,
            }
        })
        .collect()
}

/// Nodes whose combination stands in for a subtree only partially covered
/// by the first `leaves_count` leaves, rightmost first.
///
/// Each entry is the highest complete node containing the current position;
/// the next position is the node to its left at the same height.
pub(crate) fn partial_cover(subtree: SubTree, leaves_count: u64) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut cursor = leaves_count.checked_sub(1).map(Node::leaf);
    while let Some(mut node) = cursor.filter(|n| subtree.contains(*n)) {
        while node.parent().subtree().is_within(leaves_count) {
            node = node.parent();
        }
        nodes.push(node);
        cursor = node.left_neighbour();
    }
    nodes
}
