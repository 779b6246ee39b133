use serde::{Deserialize, Serialize};

use crate::builder::Combiner;
use crate::error::{MerkleError, MerkleResult};
use crate::tree::Node;

/// What an abstract proof step refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepTarget {
    /// A node fully contained in the proven tree.
    Node(Node),
    /// A partially covered node, replaced by the nodes that cover its
    /// in-range leaves, rightmost first. Each later node is combined to the
    /// left of the running value.
    SubProof(Vec<Node>),
}

/// A proof step expressed as tree coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractStep {
    pub append_to_left: bool,
    pub target: StepTarget,
}

/// A proof step carrying a resolved value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcreteStep<T> {
    pub append_to_left: bool,
    pub value: T,
}

/// Resolve abstract steps through `lookup`, which returns the stored value
/// of a complete node.
pub fn concretize<T, C, L>(
    steps: &[AbstractStep],
    combiner: &C,
    mut lookup: L,
) -> MerkleResult<Vec<ConcreteStep<T>>>
where
    C: Combiner<T>,
    L: FnMut(Node) -> MerkleResult<T>,
{
    steps
        .iter()
        .map(|step| {
            let value = match &step.target {
                StepTarget::Node(node) => lookup(*node)?,
                StepTarget::SubProof(nodes) => {
                    let (first, rest) = nodes.split_first().ok_or(MerkleError::EmptySubProof)?;
                    let mut value = lookup(*first)?;
                    for node in rest {
                        value = combiner.combine(&lookup(*node)?, &value);
                    }
                    value
                }
            };
            Ok(ConcreteStep {
                append_to_left: step.append_to_left,
                value,
            })
        })
        .collect()
}
