use tracing::info;
use tracing_subscriber::EnvFilter;

use lib_backprop::scalar::{Tape, TapeExt};

// RUST_LOG=lib_backprop_core=trace shows every recorded node and the
// backpropagation span
fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let tape = Tape::new();
  let x = tape.scalar(1.0);
  let y = tape.scalar(2.0);
  let z = tape.scalar(3.0);
  let k = tape.scalar(4.0);
  let j = tape.scalar(5.0);

  let result = &x * &y + &z - &k / &j;
  info!(nodes = tape.len(), "graph recorded");

  result.backward();

  println!("result = {result}");
  for (name, leaf) in [("x", &x), ("y", &y), ("z", &z), ("k", &k), ("j", &j)] {
    println!("{name} = {leaf}");
  }
}
