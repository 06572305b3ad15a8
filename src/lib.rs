//!
//! # backprop
//!
//! ## Core API
//!
//! This library provides a small reverse-mode automatic differentiation engine.
//! Values are recorded on a [`Tape`] as they are computed, each result
//! remembering the operation and operands that produced it; calling
//! `backward` on any result walks that record in reverse and accumulates
//! gradients into the leaves.
//!
//! The engine itself is generic over the payload and the operation catalog.
//! Two catalogs ship with it, each behind a feature of the same name:
//!
//! - `scalar`: `f64` values with operator overloading
//! - `tensor`: strided n-dimensional arrays with broadcasting
//!

pub use lib_backprop_core::*;

#[cfg(feature = "scalar")]
pub use lib_backprop_scalar as scalar;

#[cfg(feature = "tensor")]
pub use lib_backprop_tensor as tensor;
