/// Scratch space an operation's forward pass fills for its own backward pass.
///
/// A fresh context is created for every application of an operation, moved
/// into the creation record of the node it produced, and read back when that
/// node is reached during backpropagation. `S` is the saved-value type of the
/// operation's catalog, so what a forward pass stores and what the matching
/// backward pass reads are tied together by type instead of by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context<S> {
  saved: S,
}

impl<S: Default> Context<S> {
  /// An empty context, holding the catalog's "nothing saved" value
  pub fn new() -> Self {
    Self { saved: S::default() }
  }
}

impl<S> Context<S> {
  /// Keep `saved` for the backward pass; a later call replaces an earlier one
  #[inline]
  pub fn save_for_backward(&mut self, saved: S) {
    self.saved = saved;
  }

  #[inline]
  pub fn saved(&self) -> &S {
    &self.saved
  }

  pub fn into_saved(self) -> S {
    self.saved
  }
}
