use crate::builder::Combiner;
use crate::proof::ConcreteStep;

/// Verifies concrete proofs with only a combiner and an equality test.
///
/// Needs no access to tree storage, so any party holding two roots can
/// check a proof handed to them.
#[derive(Clone, Debug)]
pub struct ProofChecker<C, E> {
    combiner: C,
    equals: E,
}

impl<C, E> ProofChecker<C, E> {
    pub fn new(combiner: C, equals: E) -> Self {
        Self { combiner, equals }
    }

    /// Check that `leaf` is included in the tree whose root is `root`.
    pub fn is_inclusion_proof_valid<T>(&self, leaf: &T, root: &T, steps: &[ConcreteStep<T>]) -> bool
    where
        C: Combiner<T>,
        E: Fn(&T, &T) -> bool,
        T: Clone,
    {
        let Some((first, rest)) = steps.split_first() else {
            return false;
        };
        if !(self.equals)(&first.value, leaf) {
            return false;
        }
        let value = rest.iter().fold(first.value.clone(), |value, step| {
            if step.append_to_left {
                self.combiner.combine(&step.value, &value)
            } else {
                self.combiner.combine(&value, &step.value)
            }
        });
        (self.equals)(&value, root)
    }

    /// Check that the tree with root `old_root` is a prefix of the tree with
    /// root `new_root`.
    ///
    /// Steps appended to the left rebuild the old root on their own; all
    /// steps together rebuild the new one.
    pub fn is_consistency_proof_valid<T>(
        &self,
        old_root: &T,
        new_root: &T,
        steps: &[ConcreteStep<T>],
    ) -> bool
    where
        C: Combiner<T>,
        E: Fn(&T, &T) -> bool,
        T: Clone,
    {
        let Some((first, rest)) = steps.split_first() else {
            return false;
        };
        let mut old_value = first.value.clone();
        let mut new_value = first.value.clone();
        for step in rest {
            if step.append_to_left {
                old_value = self.combiner.combine(&step.value, &old_value);
                new_value = self.combiner.combine(&step.value, &new_value);
            } else {
                new_value = self.combiner.combine(&new_value, &step.value);
            }
        }
        (self.equals)(&old_value, old_root) && (self.equals)(&new_value, new_root)
    }
}
