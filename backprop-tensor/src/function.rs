use smallvec::smallvec;

use lib_backprop_core::{Context, Function, Partials};
use lib_backprop_scalar::operators;

use crate::data::Shape;
use crate::ops::{self, broadcast_to, from_matrix, sum_to_shape, to_matrix, zip_to};
use crate::{Error, TensorData};

/// Tensor operation types; elementwise math reuses the scalar operators
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TensorFn {
  /// Identity, materialized as a contiguous copy
  Id,
  Neg,
  Inv,
  Relu,
  Sigmoid,
  Log,
  Exp,
  Permute(Vec<usize>),
  View(Shape),
  Add,
  Mul,
  Lt,
  Eq,
  IsClose,
  MatMul,
  /// Sum along one dimension, keeping it with size 1
  Sum(usize),
}

/// What a tensor forward pass keeps for its backward pass
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Saved {
  #[default]
  Nothing,
  Input { x: TensorData },
  Output { out: TensorData },
  Operands { lhs: TensorData, rhs: TensorData },
  /// Operand shapes, for binaries whose partials only need to be unbroadcast
  Shapes { lhs: Shape, rhs: Shape },
  /// Shape of the single input
  InputShape { shape: Shape },
}

impl Function<TensorData> for TensorFn {
  type Saved = Saved;
  type Error = Error;

  fn arity(&self) -> usize {
    match self {
      TensorFn::Id
      | TensorFn::Neg
      | TensorFn::Inv
      | TensorFn::Relu
      | TensorFn::Sigmoid
      | TensorFn::Log
      | TensorFn::Exp
      | TensorFn::Permute(_)
      | TensorFn::View(_)
      | TensorFn::Sum(_) => 1,
      TensorFn::Add | TensorFn::Mul | TensorFn::Lt | TensorFn::Eq | TensorFn::IsClose | TensorFn::MatMul => 2,
    }
  }

  fn forward(&self, ctx: &mut Context<Saved>, inputs: &[&TensorData]) -> Result<TensorData, Error> {
    let x = inputs[0];
    let shapes = || Saved::Shapes {
      lhs: x.shape().to_vec(),
      rhs: inputs[1].shape().to_vec(),
    };

    match self {
      TensorFn::Id => Ok(x.contiguous()),
      TensorFn::Neg => Ok(ops::map(operators::neg, x)),
      TensorFn::Inv => {
        ctx.save_for_backward(Saved::Input { x: x.clone() });
        Ok(ops::map(operators::inv, x))
      }
      TensorFn::Relu => {
        ctx.save_for_backward(Saved::Input { x: x.clone() });
        Ok(ops::map(operators::relu, x))
      }
      TensorFn::Log => {
        ctx.save_for_backward(Saved::Input { x: x.clone() });
        Ok(ops::map(operators::log, x))
      }
      TensorFn::Sigmoid => {
        let out = ops::map(operators::sigmoid, x);
        ctx.save_for_backward(Saved::Output { out: out.clone() });
        Ok(out)
      }
      TensorFn::Exp => {
        let out = ops::map(operators::exp, x);
        ctx.save_for_backward(Saved::Output { out: out.clone() });
        Ok(out)
      }
      TensorFn::Permute(order) => x.permute(order),
      TensorFn::View(shape) => {
        let out = x.view(shape.clone())?;
        ctx.save_for_backward(Saved::InputShape {
          shape: x.shape().to_vec(),
        });
        Ok(out)
      }
      TensorFn::Sum(dim) => {
        let out = ops::reduce(operators::add, 0.0, x, *dim)?;
        ctx.save_for_backward(Saved::InputShape {
          shape: x.shape().to_vec(),
        });
        Ok(out)
      }
      TensorFn::Add => {
        let out = ops::zip(operators::add, x, inputs[1])?;
        ctx.save_for_backward(shapes());
        Ok(out)
      }
      TensorFn::Mul => {
        let out = ops::zip(operators::mul, x, inputs[1])?;
        ctx.save_for_backward(Saved::Operands {
          lhs: x.clone(),
          rhs: inputs[1].clone(),
        });
        Ok(out)
      }
      TensorFn::Lt => {
        let out = ops::zip(operators::lt, x, inputs[1])?;
        ctx.save_for_backward(shapes());
        Ok(out)
      }
      TensorFn::Eq => {
        let out = ops::zip(operators::eq, x, inputs[1])?;
        ctx.save_for_backward(shapes());
        Ok(out)
      }
      TensorFn::IsClose => {
        let out = ops::zip(operators::is_close, x, inputs[1])?;
        ctx.save_for_backward(shapes());
        Ok(out)
      }
      TensorFn::MatMul => {
        let out = ops::matmul(x, inputs[1])?;
        ctx.save_for_backward(Saved::Operands {
          lhs: x.clone(),
          rhs: inputs[1].clone(),
        });
        Ok(out)
      }
    }
  }

  fn backward(&self, ctx: &Context<Saved>, upstream: &TensorData) -> Partials<TensorData> {
    let g = upstream;
    let out_shape = || g.shape().to_vec();

    match (self, ctx.saved()) {
      (TensorFn::Id, _) => smallvec![g.clone()],
      (TensorFn::Neg, _) => smallvec![ops::map(operators::neg, g)],
      (TensorFn::Inv, Saved::Input { x }) => smallvec![zip_to(operators::inv_back, x, g, out_shape())],
      (TensorFn::Relu, Saved::Input { x }) => smallvec![zip_to(operators::relu_back, x, g, out_shape())],
      (TensorFn::Log, Saved::Input { x }) => smallvec![zip_to(operators::log_back, x, g, out_shape())],
      (TensorFn::Sigmoid, Saved::Output { out }) => {
        smallvec![zip_to(operators::sigmoid_back, out, g, out_shape())]
      }
      (TensorFn::Exp, Saved::Output { out }) => smallvec![zip_to(operators::exp_back, out, g, out_shape())],
      (TensorFn::Permute(order), _) => {
        let mut inverse = vec![0; order.len()];
        for (position, dim) in order.iter().enumerate() {
          inverse[*dim] = position;
        }
        smallvec![g.permuted(&inverse)]
      }
      (TensorFn::View(_), Saved::InputShape { shape }) => smallvec![g.reshaped(shape.clone())],
      (TensorFn::Sum(_), Saved::InputShape { shape }) => smallvec![broadcast_to(g, shape.clone())],
      (TensorFn::Add, Saved::Shapes { lhs, rhs }) => smallvec![sum_to_shape(g, lhs), sum_to_shape(g, rhs)],
      (TensorFn::Mul, Saved::Operands { lhs, rhs }) => smallvec![
        sum_to_shape(&zip_to(operators::mul, g, rhs, out_shape()), lhs.shape()),
        sum_to_shape(&zip_to(operators::mul, g, lhs, out_shape()), rhs.shape()),
      ],
      (TensorFn::Lt | TensorFn::Eq | TensorFn::IsClose, Saved::Shapes { lhs, rhs }) => {
        smallvec![TensorData::zeros(lhs.clone()), TensorData::zeros(rhs.clone())]
      }
      // d(AB) = dA B + A dB
      (TensorFn::MatMul, Saved::Operands { lhs, rhs }) => {
        let g = to_matrix(g);
        smallvec![
          from_matrix(&(&g * to_matrix(rhs).transpose())),
          from_matrix(&(to_matrix(lhs).transpose() * &g)),
        ]
      }
      (op, saved) => unreachable!("{op:?} cannot run backward from {saved:?}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run(op: &TensorFn, inputs: &[&TensorData], upstream: &TensorData) -> (TensorData, Partials<TensorData>) {
    let mut ctx = Context::new();
    let out = op.forward(&mut ctx, inputs).unwrap();
    let partials = op.backward(&ctx, upstream);
    (out, partials)
  }

  fn counting(shape: Shape) -> TensorData {
    let size = shape.iter().product::<usize>();
    TensorData::new((0..size).map(|i| i as f64).collect(), shape).unwrap()
  }

  #[test]
  fn failed_forward_saves_nothing() {
    let mut ctx = Context::new();
    let a = counting(vec![5, 2]);
    let b = counting(vec![5]);
    assert!(TensorFn::Add.forward(&mut ctx, &[&a, &b]).is_err());
    assert_eq!(*ctx.saved(), Saved::Nothing);
  }

  #[test]
  fn permute_backward_inverts() {
    let x = counting(vec![2, 3, 4]);
    let op = TensorFn::Permute(vec![2, 0, 1]);
    let g = counting(vec![4, 2, 3]);
    let (out, partials) = run(&op, &[&x], &g);
    assert_eq!(out.shape(), &[4, 2, 3]);
    assert_eq!(partials[0].shape(), &[2, 3, 4]);
    assert_eq!(partials[0].get(&[1, 2, 3]), g.get(&[3, 1, 2]));
  }

  #[test]
  fn view_backward_restores_shape() {
    let x = counting(vec![2, 3]);
    let (out, partials) = run(&TensorFn::View(vec![6]), &[&x], &TensorData::ones(vec![6]));
    assert_eq!(out.shape(), &[6]);
    assert_eq!(partials[0], TensorData::ones(vec![2, 3]));
  }

  #[test]
  fn sum_backward_spreads() {
    let x = counting(vec![2, 3]);
    let g = TensorData::new(vec![1.0, 2.0], vec![2, 1]).unwrap();
    let (out, partials) = run(&TensorFn::Sum(1), &[&x], &g);
    assert_eq!(out.to_vec(), vec![3.0, 12.0]);
    assert_eq!(partials[0].to_vec(), vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
  }

  #[test]
  fn add_unbroadcasts() {
    let a = counting(vec![3, 1, 5]);
    let b = counting(vec![3, 3, 5]);
    let (out, partials) = run(&TensorFn::Add, &[&a, &b], &TensorData::ones(vec![3, 3, 5]));
    assert_eq!(out.shape(), &[3, 3, 5]);
    assert_eq!(partials[0], TensorData::filled(vec![3, 1, 5], 3.0));
    assert_eq!(partials[1], TensorData::ones(vec![3, 3, 5]));
  }

  #[test]
  fn mul_unbroadcasts() {
    let a = counting(vec![2, 3]);
    let b = TensorData::new(vec![2.0], vec![1]).unwrap();
    let (out, partials) = run(&TensorFn::Mul, &[&a, &b], &TensorData::ones(vec![2, 3]));
    assert_eq!(out.to_vec(), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    assert_eq!(partials[0], TensorData::filled(vec![2, 3], 2.0));
    assert_eq!(partials[1].to_vec(), vec![15.0]);
  }

  #[test]
  fn comparisons_have_zero_partials() {
    let a = counting(vec![2, 3]);
    let b = TensorData::scalar(2.0);
    for op in [TensorFn::Lt, TensorFn::Eq, TensorFn::IsClose] {
      let (_, partials) = run(&op, &[&a, &b], &TensorData::ones(vec![2, 3]));
      assert_eq!(partials[0], TensorData::zeros(vec![2, 3]));
      assert_eq!(partials[1], TensorData::zeros(vec![1]));
    }
  }

  #[test]
  fn matmul_backward() {
    let a = counting(vec![2, 3]);
    let b = counting(vec![3, 2]);
    let (_, partials) = run(&TensorFn::MatMul, &[&a, &b], &TensorData::ones(vec![2, 2]));
    // dA = G Bᵀ: every row holds the row sums of B
    assert_eq!(partials[0].to_vec(), vec![1.0, 5.0, 9.0, 1.0, 5.0, 9.0]);
    // dB = Aᵀ G: every column holds the column sums of A
    assert_eq!(partials[1].to_vec(), vec![3.0, 3.0, 5.0, 5.0, 7.0, 7.0]);
  }
}
