use std::error::Error;

use tracing::info;
use tracing_subscriber::EnvFilter;

use lib_backprop::tensor::{Tape, TapeExt, TensorData};

// y = 5.4*x1 - 2.3*x2 - 1.4, fitted with full-batch gradient descent on the MSE
fn main() -> Result<(), Box<dyn Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let rows = [[1.0, 2.0], [2.0, 1.0], [3.0, 0.0], [4.0, -1.0], [5.0, 2.0]];
  let inputs = TensorData::new(rows.iter().flatten().copied().collect(), vec![5, 2])?;
  let targets = TensorData::new(
    rows.iter().map(|[x1, x2]| 5.4 * x1 - 2.3 * x2 - 1.4).collect(),
    vec![5, 1],
  )?;

  let learning_rate = 0.02;
  let epochs = 20_000;

  let mut weights = TensorData::rand(vec![2, 1]);
  let mut bias = TensorData::zeros(vec![1]);

  for epoch in 0..epochs {
    let tape = Tape::with_capacity(16);
    let x = tape.tensor(inputs.clone());
    let y = tape.tensor(targets.clone());
    let w = tape.tensor(weights.clone());
    let b = tape.tensor(bias.clone());

    // y_pred = x w + b, broadcast over the rows
    let err = x.matmul(&w)?.add(&b)?.sub(&y)?;
    let mse = err.mul(&err)?.mean(0)?;
    mse.backward();

    let step = |param: &TensorData, grad: Option<TensorData>| -> Result<TensorData, Box<dyn Error>> {
      let grad = grad.ok_or("parameter is not a leaf")?;
      let values = param
        .to_vec()
        .iter()
        .zip(grad.to_vec())
        .map(|(p, g)| p - learning_rate * g)
        .collect();
      Ok(TensorData::new(values, param.shape().to_vec())?)
    };
    weights = step(&weights, w.grad())?;
    bias = step(&bias, b.grad())?;

    if epoch % 1000 == 0 {
      info!(epoch, mse = mse.data().to_vec()[0], "training");
    }
  }

  println!("trained parameters:");
  println!("w1 = {:.4}", weights.get(&[0, 0])?);
  println!("w2 = {:.4}", weights.get(&[1, 0])?);
  println!("b  = {:.4}", bias.get(&[0])?);
  Ok(())
}
