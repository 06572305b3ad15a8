use std::convert::Infallible;

use smallvec::smallvec;

use lib_backprop_core::{Context, Function, Partials};

use crate::operators;

/// Scalar operation types for f64 automatic differentiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFn {
  Id,
  Neg,
  Inv,
  Relu,
  Sigmoid,
  Log,
  Exp,
  Add,
  Mul,
  Lt,
  Eq,
  Max,
  IsClose,
}

/// What a scalar forward pass keeps for its backward pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Saved {
  #[default]
  Nothing,
  /// The single input, for derivatives expressed in terms of `x`
  Input { x: f64 },
  /// The result, for derivatives expressed in terms of `f(x)`
  Output { out: f64 },
  Operands { lhs: f64, rhs: f64 },
}

impl Function<f64> for ScalarFn {
  type Saved = Saved;
  type Error = Infallible;

  fn arity(&self) -> usize {
    match self {
      ScalarFn::Id
      | ScalarFn::Neg
      | ScalarFn::Inv
      | ScalarFn::Relu
      | ScalarFn::Sigmoid
      | ScalarFn::Log
      | ScalarFn::Exp => 1,
      ScalarFn::Add
      | ScalarFn::Mul
      | ScalarFn::Lt
      | ScalarFn::Eq
      | ScalarFn::Max
      | ScalarFn::IsClose => 2,
    }
  }

  fn forward(&self, ctx: &mut Context<Saved>, inputs: &[&f64]) -> Result<f64, Infallible> {
    let x = *inputs[0];
    let value = match self {
      ScalarFn::Id => operators::id(x),
      ScalarFn::Neg => operators::neg(x),
      ScalarFn::Inv => {
        ctx.save_for_backward(Saved::Input { x });
        operators::inv(x)
      }
      ScalarFn::Relu => {
        ctx.save_for_backward(Saved::Input { x });
        operators::relu(x)
      }
      ScalarFn::Log => {
        ctx.save_for_backward(Saved::Input { x });
        operators::log(x)
      }
      ScalarFn::Sigmoid => {
        let out = operators::sigmoid(x);
        ctx.save_for_backward(Saved::Output { out });
        out
      }
      ScalarFn::Exp => {
        let out = operators::exp(x);
        ctx.save_for_backward(Saved::Output { out });
        out
      }
      ScalarFn::Add => operators::add(x, *inputs[1]),
      ScalarFn::Mul => {
        let (lhs, rhs) = (x, *inputs[1]);
        ctx.save_for_backward(Saved::Operands { lhs, rhs });
        operators::mul(lhs, rhs)
      }
      ScalarFn::Max => {
        let (lhs, rhs) = (x, *inputs[1]);
        ctx.save_for_backward(Saved::Operands { lhs, rhs });
        operators::max(lhs, rhs)
      }
      // piecewise constant, nothing to save
      ScalarFn::Lt => operators::lt(x, *inputs[1]),
      ScalarFn::Eq => operators::eq(x, *inputs[1]),
      ScalarFn::IsClose => operators::is_close(x, *inputs[1]),
    };
    Ok(value)
  }

  fn backward(&self, ctx: &Context<Saved>, upstream: &f64) -> Partials<f64> {
    let d = *upstream;
    match (self, *ctx.saved()) {
      (ScalarFn::Id, _) => smallvec![d],
      (ScalarFn::Neg, _) => smallvec![-d],
      (ScalarFn::Inv, Saved::Input { x }) => smallvec![operators::inv_back(x, d)],
      (ScalarFn::Relu, Saved::Input { x }) => smallvec![operators::relu_back(x, d)],
      (ScalarFn::Log, Saved::Input { x }) => smallvec![operators::log_back(x, d)],
      (ScalarFn::Sigmoid, Saved::Output { out }) => smallvec![operators::sigmoid_back(out, d)],
      (ScalarFn::Exp, Saved::Output { out }) => smallvec![operators::exp_back(out, d)],
      (ScalarFn::Add, _) => smallvec![d, d],
      (ScalarFn::Mul, Saved::Operands { lhs, rhs }) => smallvec![rhs * d, lhs * d],
      // the larger operand takes the whole gradient, ties go left
      (ScalarFn::Max, Saved::Operands { lhs, rhs }) => {
        if lhs >= rhs {
          smallvec![d, 0.0]
        } else {
          smallvec![0.0, d]
        }
      }
      (ScalarFn::Lt | ScalarFn::Eq | ScalarFn::IsClose, _) => smallvec![0.0, 0.0],
      (op, saved) => unreachable!("{op:?} cannot run backward from {saved:?}"),
    }
  }
}
