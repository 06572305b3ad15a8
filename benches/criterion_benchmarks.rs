use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use lib_backprop::scalar::{Scalar, Tape as ScalarTape, TapeExt as _};
use lib_backprop::tensor::{Result, Tape as TensorTape, TapeExt as _, Tensor, TensorData};

// =============================================================================
// SCALAR BENCHMARKS
// =============================================================================

fn scalar_forward_chain(c: &mut Criterion) {
  let mut group = c.benchmark_group("scalar/forward_chain");

  for chain_len in [10, 50, 100, 500, 1000] {
    group.throughput(Throughput::Elements(chain_len as u64));
    group.bench_with_input(
      BenchmarkId::from_parameter(chain_len),
      &chain_len,
      |b, &len| {
        b.iter(|| {
          let tape = ScalarTape::with_capacity(4 * len + 1);
          let mut x = tape.scalar(black_box(0.5));
          for _ in 0..len {
            x = (&x * &x + 1.0).sigmoid();
          }
          black_box(x.data())
        });
      },
    );
  }
  group.finish();
}

fn scalar_backward_chain(c: &mut Criterion) {
  let mut group = c.benchmark_group("scalar/backward_chain");

  for chain_len in [10, 50, 100, 500, 1000] {
    group.throughput(Throughput::Elements(chain_len as u64));
    group.bench_with_input(
      BenchmarkId::from_parameter(chain_len),
      &chain_len,
      |b, &len| {
        b.iter(|| {
          let tape = ScalarTape::with_capacity(4 * len + 1);
          let x = tape.scalar(black_box(0.5));
          let mut result = x.clone();
          for _ in 0..len {
            result = (&result * &result + 1.0).sigmoid();
          }
          result.backward();
          black_box(x.grad())
        });
      },
    );
  }
  group.finish();
}

fn sigmoid_layer<'t>(weights: [&Scalar<'t>; 2], bias: &Scalar<'t>, x1: f64, x2: f64) -> Scalar<'t> {
  (weights[0] * x1 + weights[1] * x2 + bias).sigmoid()
}

fn scalar_xor_backward(c: &mut Criterion) {
  let mut group = c.benchmark_group("scalar/xor_backward");

  group.bench_function("single_pass", |b| {
    b.iter(|| {
      let tape = ScalarTape::new();
      let w11 = tape.scalar(1.2);
      let w12 = tape.scalar(0.5);
      let b1 = tape.scalar(0.6);
      let w21 = tape.scalar(1.5);
      let w22 = tape.scalar(-0.4);
      let b2 = tape.scalar(0.4);
      let v1 = tape.scalar(-2.3);
      let v2 = tape.scalar(-0.3);
      let b_out = tape.scalar(0.63);

      let x1 = black_box(1.0);
      let x2 = black_box(0.0);
      let y = black_box(1.0); // target

      // Forward
      let a1 = sigmoid_layer([&w11, &w12], &b1, x1, x2);
      let a2 = sigmoid_layer([&w21, &w22], &b2, x1, x2);
      let output = (&v1 * &a1 + &v2 * &a2 + &b_out).sigmoid();

      // BCE loss
      let loss = -(output.log() * y + (1.0 - &output).log() * (1.0 - y));

      // Backward
      loss.backward();
      black_box(w11.grad())
    });
  });

  group.finish();
}

// =============================================================================
// TENSOR BENCHMARKS
// =============================================================================

fn tensor_broadcast_backward(c: &mut Criterion) {
  let mut group = c.benchmark_group("tensor/broadcast_backward");

  for size in [4, 16, 64] {
    group.throughput(Throughput::Elements((size * size * size) as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &sz| {
      let big = TensorData::rand(vec![sz, sz, sz]);
      let small = TensorData::rand(vec![sz, 1, sz]);
      b.iter(|| {
        let tape = TensorTape::new();
        let a = tape.tensor(black_box(small.clone()));
        let b_var = tape.tensor(black_box(big.clone()));
        let Ok(loss) = a.mul(&b_var).and_then(|t| t.sum_all()) else {
          return None;
        };
        loss.backward();
        black_box(a.grad())
      });
    });
  }
  group.finish();
}

fn tensor_matmul(c: &mut Criterion) {
  let mut group = c.benchmark_group("tensor/matmul");

  for size in [2, 4, 8, 16, 32, 64, 128] {
    group.throughput(Throughput::Elements((size * size) as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &sz| {
      let mat_a = TensorData::rand(vec![sz, sz]);
      let mat_b = TensorData::rand(vec![sz, sz]);
      b.iter(|| {
        let tape = TensorTape::new();
        let a = tape.tensor(black_box(mat_a.clone()));
        let b_var = tape.tensor(black_box(mat_b.clone()));
        let Ok(result) = a.matmul(&b_var) else {
          return None;
        };
        result.backward();
        black_box(Some((a.grad(), b_var.grad())))
      });
    });
  }
  group.finish();
}

// =============================================================================
// ALLOCATION HOTSPOT BENCHMARKS
// =============================================================================

fn bench_topological_sort(c: &mut Criterion) {
  let mut group = c.benchmark_group("internals/topo_sort");

  for graph_size in [50, 100, 500, 1000] {
    group.bench_with_input(
      BenchmarkId::from_parameter(graph_size),
      &graph_size,
      |b, &size| {
        let tape = ScalarTape::new();
        let x = tape.scalar(1.0);
        let mut result = x.clone();
        for _ in 0..size {
          result = &result * &result + 0.001;
        }
        b.iter(|| black_box(tape.topological_sort(black_box(result.id()))));
      },
    );
  }
  group.finish();
}

fn tensor_diamond<'t>(x: &Tensor<'t>) -> Result<Tensor<'t>> {
  let mut result = x.scale(2.0)?;
  for factor in [3.0, 4.0, 5.0] {
    result = result.add(&x.scale(factor)?)?;
  }
  Ok(result)
}

fn bench_gradient_accumulation(c: &mut Criterion) {
  let mut group = c.benchmark_group("internals/grad_accumulation");

  // Diamond pattern: many paths converge to same variable
  group.bench_function("diamond_scalar", |b| {
    b.iter(|| {
      let tape = ScalarTape::new();
      let x = tape.scalar(black_box(1.0));
      let result = &x * 2.0 + &x * 3.0 + &x * 4.0 + &x * 5.0;
      result.backward();
      black_box(x.grad())
    });
  });

  group.bench_function("diamond_tensor_4x4", |b| {
    let init = TensorData::ones(vec![4, 4]);
    b.iter(|| {
      let tape = TensorTape::new();
      let x = tape.tensor(black_box(init.clone()));
      let Ok(result) = tensor_diamond(&x) else {
        return None;
      };
      result.backward();
      black_box(x.grad())
    });
  });

  group.finish();
}

criterion_group!(
  scalar_benches,
  scalar_forward_chain,
  scalar_backward_chain,
  scalar_xor_backward,
);

criterion_group!(tensor_benches, tensor_broadcast_backward, tensor_matmul);

criterion_group!(
  internal_benches,
  bench_topological_sort,
  bench_gradient_accumulation,
);

criterion_main!(scalar_benches, tensor_benches, internal_benches);
