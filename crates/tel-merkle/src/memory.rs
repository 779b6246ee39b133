use crate::builder::{Combiner, MerkleBuilder, NodeValue};
use crate::error::{MerkleError, MerkleResult};
use crate::proof::{concretize, ConcreteStep};
use crate::tree::{self, partial_cover, Node};

/// In-memory Merkle tree that keeps every perfected node.
///
/// Storage is one vector per height; a node is stored once it is complete,
/// so roots and proofs for any earlier leaf count can be answered.
#[derive(Clone, Debug)]
pub struct MemoryMerkleTree<T, C> {
    builder: MerkleBuilder<C>,
    levels: Vec<Vec<T>>,
    frontier: Vec<T>,
}

impl<T, C> MemoryMerkleTree<T, C>
where
    T: Clone,
    C: Combiner<T>,
{
    pub fn new(combiner: C) -> Self {
        Self {
            builder: MerkleBuilder::new(combiner),
            levels: vec![Vec::new()],
            frontier: Vec::new(),
        }
    }

    /// Number of leaves.
    pub fn len(&self) -> u64 {
        self.levels[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    pub fn frontier(&self) -> &[T] {
        &self.frontier
    }

    /// Append a leaf and return the nodes it completed.
    pub fn push(&mut self, leaf: T) -> MerkleResult<Vec<NodeValue<T>>> {
        let (perfected, frontier) = self.builder.add_leaf(&self.frontier, self.len(), leaf)?;
        self.insert_perfected(&perfected)?;
        self.frontier = frontier;
        Ok(perfected)
    }

    /// Store nodes completed by an append computed elsewhere.
    ///
    /// Nodes must arrive in append order: each one lands at the end of its
    /// level. The whole batch is checked before anything is stored.
    pub fn insert_perfected(&mut self, nodes: &[NodeValue<T>]) -> MerkleResult<()> {
        let mut lengths: Vec<u64> = self.levels.iter().map(|level| level.len() as u64).collect();
        for NodeValue { node, .. } in nodes {
            let height = node.height as usize;
            if lengths.len() == height {
                lengths.push(0);
            }
            match lengths.get_mut(height) {
                Some(len) if *len == node.index => *len += 1,
                _ => {
                    return Err(MerkleError::MissingNode {
                        height: node.height,
                        index: node.index,
                    })
                }
            }
        }

        for NodeValue { node, value } in nodes {
            let height = node.height as usize;
            if self.levels.len() == height {
                self.levels.push(Vec::new());
            }
            self.levels[height].push(value.clone());
        }
        Ok(())
    }

    /// Root over every leaf, from the frontier.
    pub fn root(&self) -> Option<T> {
        self.builder.make_root(&self.frontier)
    }

    /// Root of the tree formed by the first `leaves_count` leaves.
    pub fn root_at(&self, leaves_count: u64) -> MerkleResult<T> {
        if leaves_count == 0 {
            return Err(MerkleError::MissingLeaves {
                requested: 0,
                available: self.len(),
            });
        }
        let height = match leaves_count - 1 {
            0 => 0,
            n => u64::BITS - n.leading_zeros(),
        };
        self.node_value(Node::new(height, 0), leaves_count)
    }

    /// Value of `node` in the tree formed by the first `leaves_count`
    /// leaves, resolving partially covered nodes.
    pub fn node_value(&self, node: Node, leaves_count: u64) -> MerkleResult<T> {
        if leaves_count > self.len() {
            return Err(MerkleError::MissingLeaves {
                requested: leaves_count,
                available: self.len(),
            });
        }
        let subtree = node.subtree();
        if subtree.is_within(leaves_count) {
            return self.stored(node);
        }
        if subtree.min_leaf_index() >= leaves_count {
            return Err(MerkleError::NodeOutOfRange {
                height: node.height,
                index: node.index,
                leaves_count,
            });
        }
        let cover = partial_cover(subtree, leaves_count);
        let (first, rest) = cover.split_first().ok_or(MerkleError::EmptySubProof)?;
        let mut value = self.stored(*first)?;
        for node in rest {
            value = self.builder.combiner().combine(&self.stored(*node)?, &value);
        }
        Ok(value)
    }

    /// Stored value of a complete node.
    pub fn stored(&self, node: Node) -> MerkleResult<T> {
        self.levels
            .get(node.height as usize)
            .and_then(|level| level.get(usize::try_from(node.index).ok()?))
            .cloned()
            .ok_or(MerkleError::MissingNode {
                height: node.height,
                index: node.index,
            })
    }

    pub fn inclusion_proof(
        &self,
        leaf_index: u64,
        leaves_count: u64,
    ) -> MerkleResult<Vec<ConcreteStep<T>>> {
        self.check_available(leaves_count)?;
        let steps = tree::inclusion_proof(leaf_index, leaves_count)?;
        concretize(&steps, self.builder.combiner(), |node| self.stored(node))
    }

    pub fn consistency_proof(
        &self,
        old_count: u64,
        new_count: u64,
    ) -> MerkleResult<Vec<ConcreteStep<T>>> {
        self.check_available(new_count)?;
        let steps = tree::consistency_proof(old_count, new_count)?;
        concretize(&steps, self.builder.combiner(), |node| self.stored(node))
    }

    fn check_available(&self, leaves_count: u64) -> MerkleResult<()> {
        if leaves_count > self.len() {
            return Err(MerkleError::MissingLeaves {
                requested: leaves_count,
                available: self.len(),
            });
        }
        Ok(())
    }
}
