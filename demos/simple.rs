use lib_backprop::scalar::{Tape, TapeExt};

fn main() {
  // Create a new tape (Wengert List) to store the nodes of our computation
  let tape = Tape::new();
  let x = tape.scalar(1.0);
  let y = &x * &x;
  // Leaves keep their gradient once the backward pass is done
  y.backward();
  println!("Value: {}, dy/dx: {}", y.data(), x.grad().unwrap_or_default());
}
