use std::fmt;
use std::rc::Rc;

use rand::distributions::Uniform;
use rand::prelude::Distribution;
use tracing::instrument;

use lib_backprop_core::Payload;

use crate::{Error, Result};

pub type Shape = Vec<usize>;
pub type Strides = Vec<usize>;
pub type Index = Vec<usize>;

/// Row-major strides: the last dimension is contiguous
pub fn strides_from_shape(shape: &[usize]) -> Strides {
  let mut strides = vec![1; shape.len()];
  for dim in (1..shape.len()).rev() {
    strides[dim - 1] = strides[dim] * shape[dim];
  }
  strides
}

/// Storage offset of a multi-index under `strides`
#[inline]
pub fn index_to_position(index: &[usize], strides: &[usize]) -> usize {
  index.iter().zip(strides).map(|(i, stride)| i * stride).sum()
}

/// Multi-index of the `ordinal`-th element when walking `shape` in row-major
/// order. `ordinal` must be below the product of `shape`.
pub fn to_index(mut ordinal: usize, shape: &[usize]) -> Index {
  let mut index = vec![0; shape.len()];
  for (slot, size) in index.iter_mut().zip(shape).rev() {
    *slot = ordinal % size;
    ordinal /= size;
  }
  index
}

/// Map an index into `big_shape` to the index it reads in `shape`, a shape
/// that broadcasts to `big_shape`.
///
/// Dimensions are right-aligned: the extra leading dimensions of `big_shape`
/// are dropped, and a dimension of size 1 in `shape` always reads position 0.
pub fn broadcast_index(big_index: &[usize], big_shape: &[usize], shape: &[usize]) -> Index {
  debug_assert!(shape.len() <= big_shape.len());
  let offset = big_shape.len() - shape.len();
  shape
    .iter()
    .enumerate()
    .map(|(dim, size)| if *size == 1 { 0 } else { big_index[dim + offset] })
    .collect()
}

/// Shape both `lhs` and `rhs` broadcast to.
///
/// Shapes are right-aligned and the shorter one is padded with 1s; each pair
/// of dimensions must then be equal, or one of them must be 1.
pub fn shape_broadcast(lhs: &[usize], rhs: &[usize]) -> Result<Shape> {
  let dims = lhs.len().max(rhs.len());
  let padded = |shape: &[usize], dim: usize| {
    let offset = dims - shape.len();
    if dim < offset {
      1
    } else {
      shape[dim - offset]
    }
  };

  (0..dims)
    .map(|dim| match (padded(lhs, dim), padded(rhs, dim)) {
      (a, b) if a == b => Ok(a),
      (1, b) => Ok(b),
      (a, 1) => Ok(a),
      _ => Err(Error::Broadcast {
        lhs: lhs.to_vec(),
        rhs: rhs.to_vec(),
      }),
    })
    .collect()
}

/// An n-dimensional array of `f64` described by a shape and strides over
/// shared storage.
///
/// Clones and permutations share storage; writing through `set` copies it
/// first if anything else still refers to it.
#[derive(Clone)]
pub struct TensorData {
  storage: Rc<Vec<f64>>,
  shape: Shape,
  strides: Strides,
}

impl TensorData {
  /// Row-major tensor over `storage`, which must hold exactly as many
  /// elements as `shape` describes
  #[instrument(level = "trace", skip(storage), fields(len = storage.len()))]
  pub fn new(storage: Vec<f64>, shape: Shape) -> Result<Self> {
    let expected: usize = shape.iter().product();
    if expected != storage.len() {
      return Err(Error::ShapeMismatch {
        expected,
        actual: storage.len(),
      });
    }
    Ok(Self::from_parts(storage, shape))
  }

  /// Tensor with an explicit layout; every reachable position must be in
  /// bounds of `storage`
  pub fn with_strides(storage: Vec<f64>, shape: Shape, strides: Strides) -> Result<Self> {
    if strides.len() != shape.len() {
      return Err(Error::RankMismatch {
        expected: shape.len(),
        actual: strides.len(),
      });
    }
    if shape.iter().all(|size| *size > 0) {
      let last: Index = shape.iter().map(|size| size - 1).collect();
      let needed = index_to_position(&last, &strides) + 1;
      if needed > storage.len() {
        return Err(Error::ShapeMismatch {
          expected: needed,
          actual: storage.len(),
        });
      }
    }
    Ok(Self {
      storage: Rc::new(storage),
      shape,
      strides,
    })
  }

  pub fn zeros(shape: Shape) -> Self {
    Self::filled(shape, 0.0)
  }

  pub fn ones(shape: Shape) -> Self {
    Self::filled(shape, 1.0)
  }

  pub fn filled(shape: Shape, value: f64) -> Self {
    let size = shape.iter().product();
    Self::from_parts(vec![value; size], shape)
  }

  /// A one-element tensor of shape `[1]`
  pub fn scalar(value: f64) -> Self {
    Self::from_parts(vec![value], vec![1])
  }

  /// Create a tensor with random values between -1 and 1
  pub fn rand(shape: Shape) -> Self {
    let size = shape.iter().product();
    let mut rng = rand::thread_rng();
    let uniform = Uniform::new(-1.0, 1.0);
    let storage = (0..size).map(|_| uniform.sample(&mut rng)).collect();
    Self::from_parts(storage, shape)
  }

  #[inline(always)]
  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  #[inline(always)]
  pub fn strides(&self) -> &[usize] {
    &self.strides
  }

  /// Number of elements
  #[inline]
  pub fn size(&self) -> usize {
    self.shape.iter().product()
  }

  #[inline]
  pub fn dims(&self) -> usize {
    self.shape.len()
  }

  /// Whether the layout is plain row-major over the storage
  pub fn is_contiguous(&self) -> bool {
    self.strides == strides_from_shape(&self.shape)
  }

  /// Storage position of `index`, bounds-checked
  pub fn index(&self, index: &[usize]) -> Result<usize> {
    if index.len() != self.dims() {
      return Err(Error::WrongNumberOfIndices {
        expected: self.dims(),
        actual: index.len(),
      });
    }
    for (dim, (i, size)) in index.iter().zip(&self.shape).enumerate() {
      if i >= size {
        return Err(Error::IndexOutOfRange {
          index: *i,
          dim,
          size: *size,
        });
      }
    }
    Ok(index_to_position(index, &self.strides))
  }

  pub fn get(&self, index: &[usize]) -> Result<f64> {
    Ok(self.storage[self.index(index)?])
  }

  /// Overwrite one element; storage shared with other tensors is copied first
  pub fn set(&mut self, index: &[usize], value: f64) -> Result<()> {
    let position = self.index(index)?;
    Rc::make_mut(&mut self.storage)[position] = value;
    Ok(())
  }

  /// Reorder dimensions without touching storage: dimension `i` of the result
  /// is dimension `order[i]` of `self`
  pub fn permute(&self, order: &[usize]) -> Result<Self> {
    let mut seen = vec![false; self.dims()];
    let valid = order.len() == self.dims()
      && order
        .iter()
        .all(|dim| *dim < seen.len() && !std::mem::replace(&mut seen[*dim], true));
    if !valid {
      return Err(Error::InvalidPermutation {
        order: order.to_vec(),
        dims: self.dims(),
      });
    }
    Ok(self.permuted(order))
  }

  /// Same values, row-major storage. Shares storage when already contiguous.
  pub fn contiguous(&self) -> Self {
    if self.is_contiguous() {
      return self.clone();
    }
    Self::from_parts(self.to_vec(), self.shape.clone())
  }

  /// Reinterpret contiguous storage under another shape of the same size
  pub fn view(&self, shape: Shape) -> Result<Self> {
    if !self.is_contiguous() {
      return Err(Error::NotContiguous);
    }
    let expected: usize = shape.iter().product();
    if expected != self.size() {
      return Err(Error::ShapeMismatch {
        expected,
        actual: self.size(),
      });
    }
    Ok(self.reshaped(shape))
  }

  /// Every valid index, in row-major order
  pub fn indices(&self) -> impl Iterator<Item = Index> + '_ {
    (0..self.size()).map(|ordinal| to_index(ordinal, &self.shape))
  }

  /// Elements in row-major order, whatever the layout
  pub fn to_vec(&self) -> Vec<f64> {
    if self.is_contiguous() {
      return self.storage[..self.size()].to_vec();
    }
    self.indices().map(|index| self.at(&index)).collect()
  }

  /// Unchecked read for kernels that iterate valid indices
  #[inline]
  pub(crate) fn at(&self, index: &[usize]) -> f64 {
    self.storage[index_to_position(index, &self.strides)]
  }

  #[inline]
  pub(crate) fn from_parts(storage: Vec<f64>, shape: Shape) -> Self {
    debug_assert_eq!(storage.len(), shape.iter().product::<usize>());
    let strides = strides_from_shape(&shape);
    Self {
      storage: Rc::new(storage),
      shape,
      strides,
    }
  }

  /// `permute` for an order already known to be valid
  pub(crate) fn permuted(&self, order: &[usize]) -> Self {
    Self {
      storage: Rc::clone(&self.storage),
      shape: order.iter().map(|dim| self.shape[*dim]).collect(),
      strides: order.iter().map(|dim| self.strides[*dim]).collect(),
    }
  }

  /// `view` for a shape already known to have the same size
  pub(crate) fn reshaped(&self, shape: Shape) -> Self {
    let data = self.contiguous();
    let strides = strides_from_shape(&shape);
    Self {
      storage: data.storage,
      shape,
      strides,
    }
  }
}

/// Tensors are equal when their shapes and elements are, regardless of layout
impl PartialEq for TensorData {
  fn eq(&self, other: &Self) -> bool {
    self.shape == other.shape && self.indices().all(|index| self.at(&index) == other.at(&index))
  }
}

impl fmt::Debug for TensorData {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TensorData")
      .field("shape", &self.shape)
      .field("strides", &self.strides)
      .field("data", &self.to_vec())
      .finish()
  }
}

impl Payload for TensorData {
  fn zeros_like(&self) -> Self {
    Self::zeros(self.shape.clone())
  }

  fn ones_like(&self) -> Self {
    Self::ones(self.shape.clone())
  }

  fn accumulate(&mut self, other: &Self) {
    assert_eq!(self.shape, other.shape, "gradient shape drifted");
    if self.is_contiguous() && other.is_contiguous() {
      let storage = Rc::make_mut(&mut self.storage);
      for (slot, value) in storage.iter_mut().zip(other.storage.iter()) {
        *slot += value;
      }
      return;
    }
    let sum = self
      .indices()
      .map(|index| self.at(&index) + other.at(&index))
      .collect();
    *self = Self::from_parts(sum, self.shape.clone());
  }
}
