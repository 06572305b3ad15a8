use std::fmt;

use smallvec::SmallVec;

use crate::Context;

/// Gradients produced by a backward pass, one per operand and in operand order
pub type Partials<T> = SmallVec<[T; 2]>;

/// Anything that can flow through the graph: forward as a value, backward as a
/// gradient...
pub trait Payload: Clone {
  /// Additive identity shaped like `self`, the starting point of a leaf gradient
  fn zeros_like(&self) -> Self;

  /// Multiplicative identity shaped like `self`, the usual seed of a backward pass
  fn ones_like(&self) -> Self;

  /// `self += other`
  fn accumulate(&mut self, other: &Self);
}

impl Payload for f64 {
  #[inline(always)]
  fn zeros_like(&self) -> Self {
    0.0
  }

  #[inline(always)]
  fn ones_like(&self) -> Self {
    1.0
  }

  #[inline(always)]
  fn accumulate(&mut self, other: &Self) {
    *self += *other;
  }
}

/// A closed catalog of differentiable operations over payloads of type `T`.
///
/// Implementors are usually an enum with one variant per operation, dispatched
/// through a single `match`. An operation never touches the graph itself; the
/// tape calls `forward` while recording a node and `backward` while
/// backpropagating through it.
///
/// Every variant takes one or two operands, and `forward`, `backward` and
/// `arity` must agree on that number.
pub trait Function<T>: fmt::Debug {
  /// Captures a forward pass keeps for its backward pass; `Default` is "nothing"
  type Saved: Default;

  /// Failure raised by a forward pass (shape errors and the like)
  type Error;

  /// Number of operands this operation consumes
  fn arity(&self) -> usize;

  /// Compute the result payload from the operand payloads
  fn forward(&self, ctx: &mut Context<Self::Saved>, inputs: &[&T]) -> Result<T, Self::Error>;

  /// Chain rule: turn the gradient of the output into one gradient per operand
  fn backward(&self, ctx: &Context<Self::Saved>, upstream: &T) -> Partials<T>;
}
