use std::fs::File;
use std::io::{self, BufWriter, Write};

use lib_backprop::scalar::{Scalar, Tape, TapeExt};

fn binary_cross_entropy<'t>(a: &Scalar<'t>, y: f64) -> Scalar<'t> {
  let term1 = a.log() * y;
  let term2 = (1.0 - a).log() * (1.0 - y);
  -(term1 + term2)
}

/// Feedforward Neural Network for an XOR gate
///
/// Architecture:
/// - 2 inputs
/// - 1 hidden layer with 2 neurons
/// - 1 output neuron
///
/// Parameters live outside any tape; every step records them as fresh leaves
struct XorNet {
  // w11, w12, b1, w21, w22, b2, v1, v2, b_out
  params: [f64; 9],
  learning_rate: f64,
}

impl XorNet {
  fn new() -> Self {
    // fake random initial weights
    XorNet {
      params: [1.2, 0.5, 0.6, 1.5, -0.4, 0.4, -2.3, -0.3, 0.63],
      learning_rate: 0.2,
    }
  }

  fn leaves<'t>(&self, tape: &'t Tape) -> Vec<Scalar<'t>> {
    self.params.iter().map(|p| tape.scalar(*p)).collect()
  }

  #[inline]
  fn forward<'t>(leaves: &[Scalar<'t>], x1: f64, x2: f64) -> Scalar<'t> {
    let [w11, w12, b1, w21, w22, b2, v1, v2, b_out] = leaves else {
      unreachable!("the network has nine parameters")
    };
    let a1 = (w11 * x1 + w12 * x2 + b1).sigmoid();
    let a2 = (w21 * x1 + w22 * x2 + b2).sigmoid();
    (v1 * &a1 + v2 * &a2 + b_out).sigmoid()
  }

  fn predict(&self, x1: f64, x2: f64) -> f64 {
    let tape = Tape::new();
    Self::forward(&self.leaves(&tape), x1, x2).data()
  }

  /// One full-batch gradient descent step, returns the loss before the update
  fn step(&mut self, x1: &[f64], x2: &[f64], y: &[f64]) -> f64 {
    let tape = Tape::new();
    let leaves = self.leaves(&tape);

    let mut loss_sum = tape.scalar(0.0);
    for i in 0..x1.len() {
      let a_out = Self::forward(&leaves, x1[i], x2[i]);
      loss_sum = loss_sum + binary_cross_entropy(&a_out, y[i]);
    }
    let loss_avg = loss_sum / x1.len() as f64;
    loss_avg.backward();

    for (param, leaf) in self.params.iter_mut().zip(&leaves) {
      *param -= self.learning_rate * leaf.grad().unwrap_or_default();
    }
    loss_avg.data()
  }
}

fn main() -> io::Result<()> {
  let x1_data = [0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0];
  let x2_data = [0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0];
  let y_data = [0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
  let epochs = 20_000;

  let file = File::create("training_loss.csv")?;
  let mut buf = BufWriter::new(file);
  writeln!(buf, "epoch,loss")?;

  let mut net = XorNet::new();
  let mut final_loss = 0.0;
  for epoch in 0..epochs {
    final_loss = net.step(&x1_data, &x2_data, &y_data);
    if epoch % 1000 == 0 {
      println!("Epoch {} | Loss = {:.6}", epoch, final_loss);
    }
    writeln!(buf, "{},{}", epoch, final_loss)?;
  }
  buf.flush()?;

  println!("trained parameters: {:?}", net.params);
  println!("final loss = {:.6}%\n", final_loss * 100.0);

  println!("testing network predictions:");
  for (x1, x2) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
    println!("input: ({}, {}), output: {:.6}", x1, x2, net.predict(x1, x2));
  }
  Ok(())
}
