//!
//! # backprop-tensor
//!
//! This crate provides n-dimensional tensors for the library: strided storage
//! with broadcasting (`TensorData`), the kernels that walk it (`ops`), and the
//! differentiable operation catalog built on top of them (`TensorFn`).
//!
//! Shape problems are reported as [`Error`] when an operation is applied; a
//! failed operation records nothing on the tape.
//!

use std::ops::Neg;

use smallvec::SmallVec;

use lib_backprop_core::{self as core, NodeId};

mod data;
mod error;
mod function;
pub mod ops;

pub use data::{broadcast_index, index_to_position, shape_broadcast, strides_from_shape, to_index};
pub use data::{Index, Shape, Strides, TensorData};
pub use error::{Error, Result};
pub use function::{Saved, TensorFn};

pub type Tape = core::Tape<TensorData, TensorFn>;

pub type Var<'t> = core::Var<'t, TensorData, TensorFn>;

/// Create tensor leaves directly on a tape
pub trait TapeExt {
  fn tensor(&self, data: TensorData) -> Tensor<'_>;
}

impl TapeExt for Tape {
  #[inline]
  fn tensor(&self, data: TensorData) -> Tensor<'_> {
    Tensor(self.var(data))
  }
}

/// A tensor value node on a tape
#[derive(Clone, Debug)]
pub struct Tensor<'t>(Var<'t>);

impl<'t> Tensor<'t> {
  #[inline(always)]
  pub fn data(&self) -> &TensorData {
    self.0.value()
  }

  #[inline]
  pub fn shape(&self) -> &[usize] {
    self.0.value().shape()
  }

  /// Accumulated gradient, `None` unless this is a leaf
  #[inline]
  pub fn grad(&self) -> Option<TensorData> {
    self.0.grad()
  }

  #[inline(always)]
  pub fn id(&self) -> NodeId {
    self.0.id()
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.0.is_leaf()
  }

  #[inline]
  pub fn parents(&self) -> SmallVec<[NodeId; 2]> {
    self.0.operands()
  }

  #[inline(always)]
  pub fn var(&self) -> &Var<'t> {
    &self.0
  }

  pub fn into_var(self) -> Var<'t> {
    self.0
  }

  /// Backpropagate from this node, seeded with ones shaped like its value
  #[inline]
  pub fn backward(&self) {
    self.0.backward();
  }

  /// Backpropagate from this node with an explicit seed of the same shape
  pub fn backward_with(&self, seed: TensorData) -> Result<()> {
    if seed.shape() != self.shape() {
      return Err(Error::SeedShape {
        expected: self.shape().to_vec(),
        actual: seed.shape().to_vec(),
      });
    }
    self.0.backward_with(seed);
    Ok(())
  }

  pub fn log(&self) -> Self {
    self.unary(TensorFn::Log)
  }

  pub fn exp(&self) -> Self {
    self.unary(TensorFn::Exp)
  }

  pub fn sigmoid(&self) -> Self {
    self.unary(TensorFn::Sigmoid)
  }

  pub fn relu(&self) -> Self {
    self.unary(TensorFn::Relu)
  }

  pub fn inv(&self) -> Self {
    self.unary(TensorFn::Inv)
  }

  /// Same values in row-major storage, recorded as an identity
  pub fn contiguous(&self) -> Self {
    self.unary(TensorFn::Id)
  }

  pub fn add(&self, other: &Self) -> Result<Self> {
    self.apply(TensorFn::Add, &[other])
  }

  /// `self + neg(other)`
  pub fn sub(&self, other: &Self) -> Result<Self> {
    self.add(&-other)
  }

  pub fn mul(&self, other: &Self) -> Result<Self> {
    self.apply(TensorFn::Mul, &[other])
  }

  /// `self * inv(other)`
  pub fn div(&self, other: &Self) -> Result<Self> {
    self.mul(&other.inv())
  }

  /// Multiply by a constant, recorded as a one-element leaf
  pub fn scale(&self, factor: f64) -> Result<Self> {
    self.mul(&self.constant(TensorData::scalar(factor)))
  }

  pub fn lt(&self, other: &Self) -> Result<Self> {
    self.apply(TensorFn::Lt, &[other])
  }

  /// `self > other`, recorded as `other < self`
  pub fn gt(&self, other: &Self) -> Result<Self> {
    other.lt(self)
  }

  #[allow(clippy::should_implement_trait)]
  pub fn eq(&self, other: &Self) -> Result<Self> {
    self.apply(TensorFn::Eq, &[other])
  }

  pub fn is_close(&self, other: &Self) -> Result<Self> {
    self.apply(TensorFn::IsClose, &[other])
  }

  pub fn matmul(&self, other: &Self) -> Result<Self> {
    self.apply(TensorFn::MatMul, &[other])
  }

  pub fn permute(&self, order: &[usize]) -> Result<Self> {
    self.apply(TensorFn::Permute(order.to_vec()), &[])
  }

  pub fn view(&self, shape: Shape) -> Result<Self> {
    self.apply(TensorFn::View(shape), &[])
  }

  /// Sum along `dim`, which stays with size 1
  pub fn sum(&self, dim: usize) -> Result<Self> {
    self.apply(TensorFn::Sum(dim), &[])
  }

  /// Sum of every element, as a tensor of shape `[1]`
  pub fn sum_all(&self) -> Result<Self> {
    let mut total = self.clone();
    for dim in 0..self.data().dims() {
      total = total.sum(dim)?;
    }
    total.view(vec![1])
  }

  /// Mean along `dim`, which stays with size 1
  pub fn mean(&self, dim: usize) -> Result<Self> {
    let extent = self.shape().get(dim).copied().ok_or(Error::InvalidDimension {
      dim,
      dims: self.data().dims(),
    })?;
    self.sum(dim)?.scale(1.0 / extent as f64)
  }

  fn constant(&self, data: TensorData) -> Self {
    Tensor(self.0.tape().var(data))
  }

  fn unary(&self, op: TensorFn) -> Self {
    // elementwise maps cannot fail
    match self.apply(op, &[]) {
      Ok(tensor) => tensor,
      Err(error) => unreachable!("elementwise operation failed: {error}"),
    }
  }

  fn apply(&self, op: TensorFn, rest: &[&Self]) -> Result<Self> {
    let rest: SmallVec<[&Var<'t>; 1]> = rest.iter().map(|tensor| &tensor.0).collect();
    self.0.apply(op, &rest).map(Tensor)
  }
}

impl<'t> From<Var<'t>> for Tensor<'t> {
  fn from(var: Var<'t>) -> Self {
    Tensor(var)
  }
}

impl<'t> Neg for &Tensor<'t> {
  type Output = Tensor<'t>;

  fn neg(self) -> Tensor<'t> {
    self.unary(TensorFn::Neg)
  }
}

impl<'t> Neg for Tensor<'t> {
  type Output = Tensor<'t>;

  fn neg(self) -> Tensor<'t> {
    -&self
  }
}
