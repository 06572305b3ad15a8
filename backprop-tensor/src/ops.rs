//! Higher-order kernels over `TensorData`. These are the only places that walk
//! elements; the catalog is written entirely in terms of them.

use nalgebra::DMatrix;
use tracing::instrument;

use crate::data::{broadcast_index, index_to_position, shape_broadcast, strides_from_shape, Shape};
use crate::{Error, Result, TensorData};

/// Apply `f` to every element
#[instrument(level = "trace", skip(f, a), fields(shape = ?a.shape()))]
pub fn map(f: impl Fn(f64) -> f64, a: &TensorData) -> TensorData {
  let storage = a.indices().map(|index| f(a.at(&index))).collect();
  TensorData::from_parts(storage, a.shape().to_vec())
}

/// Combine `a` and `b` elementwise after broadcasting them to a common shape
#[instrument(level = "trace", skip(f, a, b), fields(lhs = ?a.shape(), rhs = ?b.shape()))]
pub fn zip(f: impl Fn(f64, f64) -> f64, a: &TensorData, b: &TensorData) -> Result<TensorData> {
  let shape = shape_broadcast(a.shape(), b.shape())?;
  Ok(zip_to(f, a, b, shape))
}

/// `zip` into a shape both operands are known to broadcast to
pub(crate) fn zip_to(f: impl Fn(f64, f64) -> f64, a: &TensorData, b: &TensorData, shape: Shape) -> TensorData {
  let out = TensorData::zeros(shape);
  let storage = out
    .indices()
    .map(|index| {
      let lhs = broadcast_index(&index, out.shape(), a.shape());
      let rhs = broadcast_index(&index, out.shape(), b.shape());
      f(a.at(&lhs), b.at(&rhs))
    })
    .collect();
  TensorData::from_parts(storage, out.shape().to_vec())
}

/// Fold dimension `dim` of `a` with `f`, starting from `start`. The reduced
/// dimension stays in the result with size 1.
#[instrument(level = "trace", skip(f, a), fields(shape = ?a.shape()))]
pub fn reduce(f: impl Fn(f64, f64) -> f64, start: f64, a: &TensorData, dim: usize) -> Result<TensorData> {
  if dim >= a.dims() {
    return Err(Error::InvalidDimension { dim, dims: a.dims() });
  }

  let mut shape = a.shape().to_vec();
  let extent = std::mem::replace(&mut shape[dim], 1);
  let out = TensorData::zeros(shape);
  let storage = out
    .indices()
    .map(|mut index| {
      (0..extent).fold(start, |acc, k| {
        index[dim] = k;
        f(acc, a.at(&index))
      })
    })
    .collect();
  Ok(TensorData::from_parts(storage, out.shape().to_vec()))
}

/// Undo broadcasting: sum `grad` down to `shape`, a shape that broadcasts to
/// the shape of `grad`
pub fn sum_to_shape(grad: &TensorData, shape: &[usize]) -> TensorData {
  if grad.shape() == shape {
    return grad.clone();
  }
  let strides = strides_from_shape(shape);
  let mut storage = vec![0.0; shape.iter().product()];
  for index in grad.indices() {
    let small = broadcast_index(&index, grad.shape(), shape);
    storage[index_to_position(&small, &strides)] += grad.at(&index);
  }
  TensorData::from_parts(storage, shape.to_vec())
}

/// Inverse of `sum_to_shape`: repeat `a` along its broadcast dimensions
pub(crate) fn broadcast_to(a: &TensorData, shape: Shape) -> TensorData {
  let out = TensorData::zeros(shape);
  let storage = out
    .indices()
    .map(|index| a.at(&broadcast_index(&index, out.shape(), a.shape())))
    .collect();
  TensorData::from_parts(storage, out.shape().to_vec())
}

/// Matrix product of two 2-D tensors
#[instrument(level = "trace", skip(a, b), fields(lhs = ?a.shape(), rhs = ?b.shape()))]
pub fn matmul(a: &TensorData, b: &TensorData) -> Result<TensorData> {
  for t in [a, b] {
    if t.dims() != 2 {
      return Err(Error::RankMismatch {
        expected: 2,
        actual: t.dims(),
      });
    }
  }
  if a.shape()[1] != b.shape()[0] {
    return Err(Error::MatMulShape {
      lhs: a.shape().to_vec(),
      rhs: b.shape().to_vec(),
    });
  }
  Ok(from_matrix(&(to_matrix(a) * to_matrix(b))))
}

/// Copy a 2-D tensor into a dense matrix
pub(crate) fn to_matrix(a: &TensorData) -> DMatrix<f64> {
  let (rows, cols) = (a.shape()[0], a.shape()[1]);
  DMatrix::from_fn(rows, cols, |r, c| a.at(&[r, c]))
}

pub(crate) fn from_matrix(m: &DMatrix<f64>) -> TensorData {
  let (rows, cols) = m.shape();
  // nalgebra is column-major
  let storage = (0..rows)
    .flat_map(|r| (0..cols).map(move |c| m[(r, c)]))
    .collect();
  TensorData::from_parts(storage, vec![rows, cols])
}
