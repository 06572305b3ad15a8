//!
//! # backprop-scalar
//!
//! This crate provides the f64 (scalar) operation catalog for the library,
//! along with a `Scalar` handle that makes graphs read like arithmetic:
//!
//! ```
//! use lib_backprop_scalar::{Tape, TapeExt};
//!
//! let tape = Tape::new();
//! let x = tape.scalar(2.0);
//! let y = tape.scalar(3.0);
//! let z = &x * &y + 1.0;
//! z.backward();
//! assert_eq!(x.grad(), Some(3.0));
//! ```
//!

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use smallvec::SmallVec;

use lib_backprop_core::{self as core, NodeId};

mod function;
pub mod operators;

pub use function::{Saved, ScalarFn};

pub type Tape = core::Tape<f64, ScalarFn>;

pub type Var<'t> = core::Var<'t, f64, ScalarFn>;

/// Create scalar leaves directly on a tape
pub trait TapeExt {
  fn scalar(&self, value: f64) -> Scalar<'_>;
}

impl TapeExt for Tape {
  #[inline]
  fn scalar(&self, value: f64) -> Scalar<'_> {
    Scalar(self.var(value))
  }
}

/// A scalar value node on a tape.
///
/// Every arithmetic operation records a new node; mixing in a bare `f64`
/// records it as a constant leaf on the same tape first.
#[derive(Clone, Debug)]
pub struct Scalar<'t>(Var<'t>);

impl<'t> Scalar<'t> {
  #[inline(always)]
  pub fn data(&self) -> f64 {
    *self.0.value()
  }

  /// Accumulated gradient, `None` unless this is a leaf
  #[inline]
  pub fn grad(&self) -> Option<f64> {
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

  /// Ids of the nodes this one was computed from
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

  /// Backpropagate from this node with seed 1.0
  #[inline]
  pub fn backward(&self) {
    self.0.backward();
  }

  pub fn log(&self) -> Self {
    self.apply(ScalarFn::Log, &[])
  }

  pub fn exp(&self) -> Self {
    self.apply(ScalarFn::Exp, &[])
  }

  pub fn sigmoid(&self) -> Self {
    self.apply(ScalarFn::Sigmoid, &[])
  }

  pub fn relu(&self) -> Self {
    self.apply(ScalarFn::Relu, &[])
  }

  /// `1 / self`, biased away from zero
  pub fn inv(&self) -> Self {
    self.apply(ScalarFn::Inv, &[])
  }

  pub fn id_op(&self) -> Self {
    self.apply(ScalarFn::Id, &[])
  }

  /// `1.0` where `self < other`, never propagates a gradient
  pub fn lt(&self, other: &Self) -> Self {
    self.apply(ScalarFn::Lt, &[other])
  }

  /// `self > other`, recorded as `other < self`
  pub fn gt(&self, other: &Self) -> Self {
    other.lt(self)
  }

  #[allow(clippy::should_implement_trait)]
  pub fn eq(&self, other: &Self) -> Self {
    self.apply(ScalarFn::Eq, &[other])
  }

  pub fn max(&self, other: &Self) -> Self {
    self.apply(ScalarFn::Max, &[other])
  }

  pub fn is_close(&self, other: &Self) -> Self {
    self.apply(ScalarFn::IsClose, &[other])
  }

  fn plus(&self, other: &Self) -> Self {
    self.apply(ScalarFn::Add, &[other])
  }

  fn minus(&self, other: &Self) -> Self {
    let negated = other.apply(ScalarFn::Neg, &[]);
    self.plus(&negated)
  }

  fn times(&self, other: &Self) -> Self {
    self.apply(ScalarFn::Mul, &[other])
  }

  fn over(&self, other: &Self) -> Self {
    self.times(&other.inv())
  }

  /// A constant leaf on the same tape
  fn constant(&self, value: f64) -> Self {
    Scalar(self.0.tape().var(value))
  }

  fn apply(&self, op: ScalarFn, rest: &[&Self]) -> Self {
    let rest: SmallVec<[&Var<'t>; 1]> = rest.iter().map(|scalar| &scalar.0).collect();
    match self.0.apply(op, &rest) {
      Ok(var) => Scalar(var),
      Err(never) => match never {},
    }
  }
}

impl<'t> From<Var<'t>> for Scalar<'t> {
  fn from(var: Var<'t>) -> Self {
    Scalar(var)
  }
}

impl fmt::Display for Scalar<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Scalar(data={}, grad={})",
      self.data(),
      self.grad().unwrap_or(0.0)
    )
  }
}

// Every combination of owned, borrowed and bare f64 operands
macro_rules! binary_op {
  ($trait:ident, $method:ident, $record:ident) => {
    impl<'t> $trait<&Scalar<'t>> for &Scalar<'t> {
      type Output = Scalar<'t>;

      fn $method(self, rhs: &Scalar<'t>) -> Scalar<'t> {
        self.$record(rhs)
      }
    }

    impl<'t> $trait<Scalar<'t>> for Scalar<'t> {
      type Output = Scalar<'t>;

      fn $method(self, rhs: Scalar<'t>) -> Scalar<'t> {
        self.$record(&rhs)
      }
    }

    impl<'t> $trait<&Scalar<'t>> for Scalar<'t> {
      type Output = Scalar<'t>;

      fn $method(self, rhs: &Scalar<'t>) -> Scalar<'t> {
        self.$record(rhs)
      }
    }

    impl<'t> $trait<Scalar<'t>> for &Scalar<'t> {
      type Output = Scalar<'t>;

      fn $method(self, rhs: Scalar<'t>) -> Scalar<'t> {
        self.$record(&rhs)
      }
    }

    impl<'t> $trait<f64> for &Scalar<'t> {
      type Output = Scalar<'t>;

      fn $method(self, rhs: f64) -> Scalar<'t> {
        self.$record(&self.constant(rhs))
      }
    }

    impl<'t> $trait<f64> for Scalar<'t> {
      type Output = Scalar<'t>;

      fn $method(self, rhs: f64) -> Scalar<'t> {
        self.$record(&self.constant(rhs))
      }
    }

    impl<'t> $trait<&Scalar<'t>> for f64 {
      type Output = Scalar<'t>;

      fn $method(self, rhs: &Scalar<'t>) -> Scalar<'t> {
        rhs.constant(self).$record(rhs)
      }
    }

    impl<'t> $trait<Scalar<'t>> for f64 {
      type Output = Scalar<'t>;

      fn $method(self, rhs: Scalar<'t>) -> Scalar<'t> {
        rhs.constant(self).$record(&rhs)
      }
    }
  };
}

binary_op!(Add, add, plus);
binary_op!(Sub, sub, minus);
binary_op!(Mul, mul, times);
binary_op!(Div, div, over);

impl<'t> Neg for &Scalar<'t> {
  type Output = Scalar<'t>;

  fn neg(self) -> Scalar<'t> {
    self.apply(ScalarFn::Neg, &[])
  }
}

impl<'t> Neg for Scalar<'t> {
  type Output = Scalar<'t>;

  fn neg(self) -> Scalar<'t> {
    -&self
  }
}
