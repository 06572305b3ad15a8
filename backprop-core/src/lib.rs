//!
//! # backprop-core
//!
//! Graph construction and reverse-mode backpropagation, independent of what the
//! values flowing through the graph are.
//!
//! ## Graph model
//!
//! 1. A [`Tape`] is an arena of nodes addressed by [`NodeId`]; ids are dense and
//!    handed out in creation order, so operands always precede their consumers
//! 2. A leaf is a node without a creation record, created with [`Tape::var`]
//! 3. Every other node comes out of [`Tape::apply`], which runs an operation's
//!    forward pass and records its operands, the operation and the [`Context`]
//!    the forward pass filled
//! 4. [`Tape::backward`] orders the computed ancestors of a root (consumers
//!    first), pushes the gradient through each node's backward pass, and
//!    accumulates the result into the leaves
//!
//! Operation catalogs live in the value-specific crates, they plug in through
//! [`Function`] and [`Payload`].
//!

mod backward;
mod context;
mod function;
mod tape;
mod topo;
mod var;

pub use context::Context;
pub use function::{Function, Partials, Payload};
pub use tape::{NodeId, Tape};
pub use var::Var;
