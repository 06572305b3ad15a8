//! Plain `f64` building blocks shared by the scalar catalog and the tensor
//! kernels. Nothing here knows about graphs.

/// Bias keeping `log` and `inv` finite at zero
pub const EPS: f64 = 1e-8;

/// Tolerance of `is_close`
pub const CLOSE_TOLERANCE: f64 = 1e-2;

#[inline(always)]
pub fn id(x: f64) -> f64 {
  x
}

#[inline(always)]
pub fn neg(x: f64) -> f64 {
  -x
}

#[inline(always)]
pub fn add(x: f64, y: f64) -> f64 {
  x + y
}

#[inline(always)]
pub fn mul(x: f64, y: f64) -> f64 {
  x * y
}

/// `1.0` when `x < y`, `0.0` otherwise
#[inline]
pub fn lt(x: f64, y: f64) -> f64 {
  if x < y {
    1.0
  } else {
    0.0
  }
}

/// `1.0` when `x == y`, `0.0` otherwise
#[inline]
pub fn eq(x: f64, y: f64) -> f64 {
  if x == y {
    1.0
  } else {
    0.0
  }
}

#[inline]
pub fn max(x: f64, y: f64) -> f64 {
  if x > y {
    x
  } else {
    y
  }
}

/// `1.0` when `x` and `y` are within `CLOSE_TOLERANCE` of each other
#[inline]
pub fn is_close(x: f64, y: f64) -> f64 {
  if (x - y).abs() < CLOSE_TOLERANCE {
    1.0
  } else {
    0.0
  }
}

/// Logistic function, evaluated so neither branch overflows
#[inline]
pub fn sigmoid(x: f64) -> f64 {
  if x >= 0.0 {
    1.0 / (1.0 + (-x).exp())
  } else {
    x.exp() / (1.0 + x.exp())
  }
}

#[inline]
pub fn relu(x: f64) -> f64 {
  if x > 0.0 {
    x
  } else {
    0.0
  }
}

#[inline]
pub fn log(x: f64) -> f64 {
  (x + EPS).ln()
}

#[inline]
pub fn exp(x: f64) -> f64 {
  x.exp()
}

#[inline]
pub fn inv(x: f64) -> f64 {
  1.0 / (x + EPS)
}

/// `d * log'(x)`
#[inline]
pub fn log_back(x: f64, d: f64) -> f64 {
  d / (x + EPS)
}

/// `d * inv'(x)`
#[inline]
pub fn inv_back(x: f64, d: f64) -> f64 {
  -d / (x * x + EPS)
}

/// Passes `d` through where the input was positive
#[inline]
pub fn relu_back(x: f64, d: f64) -> f64 {
  if x > 0.0 {
    d
  } else {
    0.0
  }
}

/// Takes the *output* of `sigmoid`, not its input
#[inline]
pub fn sigmoid_back(out: f64, d: f64) -> f64 {
  out * (1.0 - out) * d
}

/// Takes the *output* of `exp`, which is its own derivative
#[inline]
pub fn exp_back(out: f64, d: f64) -> f64 {
  out * d
}

pub fn map(f: impl Fn(f64) -> f64, xs: &[f64]) -> Vec<f64> {
  xs.iter().map(|x| f(*x)).collect()
}

/// Combine two lists pairwise, stopping at the end of the shorter one
pub fn zip_with(f: impl Fn(f64, f64) -> f64, xs: &[f64], ys: &[f64]) -> Vec<f64> {
  xs.iter().zip(ys).map(|(x, y)| f(*x, *y)).collect()
}

/// Left fold of `xs` starting from `start`
pub fn reduce(f: impl Fn(f64, f64) -> f64, start: f64, xs: &[f64]) -> f64 {
  xs.iter().fold(start, |acc, x| f(acc, *x))
}

pub fn sum(xs: &[f64]) -> f64 {
  reduce(add, 0.0, xs)
}

pub fn prod(xs: &[f64]) -> f64 {
  reduce(mul, 1.0, xs)
}

pub fn add_lists(xs: &[f64], ys: &[f64]) -> Vec<f64> {
  zip_with(add, xs, ys)
}

pub fn neg_list(xs: &[f64]) -> Vec<f64> {
  map(neg, xs)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use proptest::prelude::*;

  use super::*;

  mod basic {
    use super::*;

    #[test]
    fn comparisons() {
      assert_eq!(lt(1.0, 2.0), 1.0);
      assert_eq!(lt(2.0, 1.0), 0.0);
      assert_eq!(lt(2.0, 2.0), 0.0);
      assert_eq!(eq(2.0, 2.0), 1.0);
      assert_eq!(eq(2.0, 2.5), 0.0);
      assert_eq!(max(1.0, 3.0), 3.0);
      assert_eq!(max(3.0, 1.0), 3.0);
    }

    #[test]
    fn is_close_tolerance() {
      assert_eq!(is_close(1.0, 1.005), 1.0);
      assert_eq!(is_close(1.0, 1.02), 0.0);
    }

    #[test]
    fn sigmoid_is_stable() {
      assert_eq!(sigmoid(0.0), 0.5);
      assert_relative_eq!(sigmoid(800.0), 1.0);
      assert_relative_eq!(sigmoid(-800.0), 0.0);
      assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn log_and_inv_are_biased() {
      assert!(log(0.0).is_finite());
      assert!(inv(0.0).is_finite());
      assert_relative_eq!(inv(5.0), 0.2, max_relative = 1e-8);
      assert_relative_eq!(log(1.0), 0.0, epsilon = 1e-7);
    }

    #[test]
    fn relu_and_back() {
      assert_eq!(relu(-3.0), 0.0);
      assert_eq!(relu(3.0), 3.0);
      assert_eq!(relu_back(-3.0, 7.0), 0.0);
      assert_eq!(relu_back(3.0, 7.0), 7.0);
    }

    #[test]
    fn back_helpers() {
      assert_relative_eq!(inv_back(2.0, 1.0), -0.25, max_relative = 1e-7);
      assert_relative_eq!(log_back(4.0, 2.0), 0.5, max_relative = 1e-7);
      assert_eq!(sigmoid_back(0.5, 1.0), 0.25);
      assert_eq!(exp_back(3.0, 2.0), 6.0);
    }
  }

  mod higher_order {
    use super::*;

    #[test]
    fn lists() {
      assert_eq!(map(neg, &[1.0, -2.0]), vec![-1.0, 2.0]);
      assert_eq!(neg_list(&[1.0, -2.0]), vec![-1.0, 2.0]);
      assert_eq!(add_lists(&[1.0, 2.0], &[3.0, 4.0]), vec![4.0, 6.0]);
    }

    #[test]
    fn zip_stops_at_shorter() {
      assert_eq!(zip_with(mul, &[1.0, 2.0, 3.0], &[4.0, 5.0]), vec![4.0, 10.0]);
    }

    #[test]
    fn folds() {
      assert_eq!(sum(&[]), 0.0);
      assert_eq!(sum(&[0.5, 1.5, 2.0]), 4.0);
      assert_eq!(prod(&[]), 1.0);
      assert_eq!(prod(&[0.5, 4.0, 3.0]), 6.0);
      assert_eq!(reduce(max, f64::NEG_INFINITY, &[1.0, 7.0, 3.0]), 7.0);
    }

    proptest! {
      #[test]
      fn sum_distributes(
        xs in prop::collection::vec(-100.0f64..100.0, 0..16),
        ys in prop::collection::vec(-100.0f64..100.0, 0..16),
      ) {
        let n = xs.len().min(ys.len());
        let lhs = sum(&add_lists(&xs[..n], &ys[..n]));
        let rhs = sum(&xs[..n]) + sum(&ys[..n]);
        prop_assert!((lhs - rhs).abs() < 1e-9);
      }

      #[test]
      fn neg_list_cancels(xs in prop::collection::vec(-100.0f64..100.0, 0..16)) {
        let zeros = add_lists(&xs, &neg_list(&xs));
        prop_assert!(zeros.iter().all(|z| *z == 0.0));
      }
    }
  }
}
