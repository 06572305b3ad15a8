use thiserror::Error;

use crate::Shape;

/// Everything that can go wrong while building tensors or applying tensor
/// operations. A failed operation records nothing on the tape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("cannot broadcast shapes {lhs:?} and {rhs:?}")]
  Broadcast { lhs: Shape, rhs: Shape },

  #[error("index {index} is out of range for dimension {dim} of size {size}")]
  IndexOutOfRange { index: usize, dim: usize, size: usize },

  #[error("wrong number of indices: expected {expected}, got {actual}")]
  WrongNumberOfIndices { expected: usize, actual: usize },

  /// Storage length (or view size) does not match the requested shape
  #[error("shape mismatch: expected {expected} elements, got {actual}")]
  ShapeMismatch { expected: usize, actual: usize },

  #[error("backward seed of shape {actual:?} does not match the root shape {expected:?}")]
  SeedShape { expected: Vec<usize>, actual: Vec<usize> },

  #[error("invalid permutation {order:?} for a tensor with {dims} dimensions")]
  InvalidPermutation { order: Vec<usize>, dims: usize },

  #[error("a view needs contiguous storage")]
  NotContiguous,

  #[error("dimension {dim} is out of range for a tensor with {dims} dimensions")]
  InvalidDimension { dim: usize, dims: usize },

  #[error("expected tensor of rank {expected}, got rank {actual}")]
  RankMismatch { expected: usize, actual: usize },

  #[error("cannot multiply matrices of shapes {lhs:?} and {rhs:?}")]
  MatMulShape { lhs: Shape, rhs: Shape },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
