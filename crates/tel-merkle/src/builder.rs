use serde::{Deserialize, Serialize};

use crate::error::{MerkleError, MerkleResult};
use crate::tree::{perfected_ancestors, Node};

/// Two-argument combiner for interior nodes.
///
/// Implementations must be domain separated from leaf hashing so a leaf
/// value can never be confused with an interior one.
pub trait Combiner<T> {
    fn combine(&self, left: &T, right: &T) -> T;
}

impl<T, F> Combiner<T> for F
where
    F: Fn(&T, &T) -> T,
{
    fn combine(&self, left: &T, right: &T) -> T {
        self(left, right)
    }
}

/// A node coordinate together with its value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeValue<T> {
    pub node: Node,
    pub value: T,
}

/// Frontier operations over an append-only leaf sequence.
#[derive(Clone, Debug)]
pub struct MerkleBuilder<C> {
    combiner: C,
}

impl<C> MerkleBuilder<C> {
    pub fn new(combiner: C) -> Self {
        Self { combiner }
    }

    pub fn combiner(&self) -> &C {
        &self.combiner
    }

    /// Root of the tree summarized by `frontier` (smallest subtree first).
    ///
    /// Returns `None` for an empty frontier.
    pub fn make_root<T: Clone>(&self, frontier: &[T]) -> Option<T>
    where
        C: Combiner<T>,
    {
        let (first, rest) = frontier.split_first()?;
        Some(
            rest.iter()
                .fold(first.clone(), |acc, curr| self.combiner.combine(curr, &acc)),
        )
    }

    /// Append `leaf` as leaf number `old_leaves_count`.
    ///
    /// Returns every node completed by the append, the leaf first, and the
    /// new frontier.
    pub fn add_leaf<T: Clone>(
        &self,
        frontier: &[T],
        old_leaves_count: u64,
        leaf: T,
    ) -> MerkleResult<(Vec<NodeValue<T>>, Vec<T>)>
    where
        C: Combiner<T>,
    {
        let expected = old_leaves_count.count_ones() as usize;
        if frontier.len() != expected {
            return Err(MerkleError::FrontierSize {
                expected,
                actual: frontier.len(),
            });
        }

        let mut perfected = vec![NodeValue {
            node: Node::leaf(old_leaves_count),
            value: leaf.clone(),
        }];
        let mut last = leaf;
        for (node, left) in perfected_ancestors(old_leaves_count).zip(frontier) {
            last = self.combiner.combine(left, &last);
            perfected.push(NodeValue {
                node,
                value: last.clone(),
            });
        }

        let absorbed = perfected.len() - 1;
        let mut new_frontier = Vec::with_capacity(frontier.len() - absorbed + 1);
        new_frontier.push(last);
        new_frontier.extend_from_slice(&frontier[absorbed..]);
        Ok((perfected, new_frontier))
    }
}
