use std::fmt;

use smallvec::SmallVec;

use crate::{Function, NodeId, Payload, Tape};

/// A handle to a node in the computational graph.
///
/// Vars are created with `Tape::var` (leaves) or `Tape::apply` (computed
/// values). The payload never changes once the node is recorded; cloning a
/// var yields a second handle to the same node.
pub struct Var<'t, T, F: Function<T>> {
  id: NodeId,
  value: T,
  tape: &'t Tape<T, F>,
}

impl<'t, T, F> Var<'t, T, F>
where
  T: Payload,
  F: Function<T>,
{
  #[inline(always)]
  pub(crate) fn new(id: NodeId, value: T, tape: &'t Tape<T, F>) -> Self {
    Self { id, value, tape }
  }

  #[inline(always)]
  pub fn id(&self) -> NodeId {
    self.id
  }

  /// Get a readonly reference to the value stored in this variable
  #[inline(always)]
  pub fn value(&self) -> &T {
    &self.value
  }

  #[inline(always)]
  pub fn tape(&self) -> &'t Tape<T, F> {
    self.tape
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.tape.is_leaf(self.id)
  }

  /// Accumulated gradient, `None` unless this is a leaf
  #[inline]
  pub fn grad(&self) -> Option<T> {
    self.tape.grad(self.id)
  }

  /// Ids of the nodes this one was computed from
  #[inline]
  pub fn operands(&self) -> SmallVec<[NodeId; 2]> {
    self.tape.operands(self.id)
  }

  /// Apply `op` with `self` as the first operand and `rest` after it
  #[inline]
  pub fn apply(&self, op: F, rest: &[&Self]) -> Result<Self, F::Error> {
    let mut operands: SmallVec<[&Self; 2]> = SmallVec::with_capacity(rest.len() + 1);
    operands.push(self);
    operands.extend_from_slice(rest);
    self.tape.apply(op, &operands)
  }

  /// Backpropagate from this node, seeded with ones shaped like its value
  #[inline]
  pub fn backward(&self) {
    self.backward_with(self.value.ones_like());
  }

  /// Backpropagate from this node with an explicit seed gradient
  #[inline]
  pub fn backward_with(&self, seed: T) {
    self.tape.backward(self.id, seed);
  }
}

impl<T: Clone, F: Function<T>> Clone for Var<'_, T, F> {
  fn clone(&self) -> Self {
    Self {
      id: self.id,
      value: self.value.clone(),
      tape: self.tape,
    }
  }
}

impl<T: fmt::Debug, F: Function<T>> fmt::Debug for Var<'_, T, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Var")
      .field("id", &self.id)
      .field("value", &self.value)
      .finish()
  }
}
