use std::cell::RefCell;
use std::fmt;
use std::ptr;

use smallvec::SmallVec;
use tracing::trace;

use crate::backward::backpropagate;
use crate::topo::topological_sort;
use crate::{Context, Function, Payload, Var};

/// Identity of a node on its tape.
///
/// Ids are handed out in creation order, so an operand always has a smaller
/// id than any node built from it, and two nodes holding equal payloads still
/// have distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
  #[inline(always)]
  pub fn index(self) -> usize {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

pub(crate) enum Node<T, F: Function<T>> {
  /// Input value, the only kind of node whose gradient is stored in place
  Leaf { grad: T },
  /// Result of an operation along with its creation record
  Computed {
    op: F,
    operands: SmallVec<[NodeId; 2]>,
    ctx: Context<F::Saved>,
  },
}

/// An arena holding every node of a computation graph.
///
/// Nodes only ever point back at operands that were recorded before them, so
/// the graph is acyclic by construction. Handles to nodes (`Var`) borrow the
/// tape, which keeps every node alive for as long as any handle to it exists.
pub struct Tape<T, F: Function<T>> {
  nodes: RefCell<Vec<Node<T, F>>>,
}

impl<T, F> Tape<T, F>
where
  T: Payload,
  F: Function<T>,
{
  pub fn new() -> Self {
    Self {
      nodes: RefCell::new(Vec::new()),
    }
  }

  /// A tape with room for `capacity` nodes before it reallocates
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      nodes: RefCell::new(Vec::with_capacity(capacity)),
    }
  }

  /// Number of nodes recorded so far
  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.borrow().len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Record a leaf holding `value`, its gradient starting at zero
  #[inline]
  pub fn var(&self, value: T) -> Var<'_, T, F> {
    let grad = value.zeros_like();
    let id = self.push(Node::Leaf { grad });
    Var::new(id, value, self)
  }

  /// Apply `op` to `operands`, recording the result as a new node.
  ///
  /// This is the only way computed nodes come into existence: the forward
  /// pass runs against a fresh context, and the context, the operand ids and
  /// the operation itself become the creation record of the result. When the
  /// forward pass fails nothing is recorded, and every existing node stays
  /// usable.
  ///
  /// # Panics
  ///
  /// When the number of operands does not match the arity of `op`, or when an
  /// operand was recorded on a different tape.
  pub fn apply<'t>(&'t self, op: F, operands: &[&Var<'t, T, F>]) -> Result<Var<'t, T, F>, F::Error> {
    assert_eq!(
      operands.len(),
      op.arity(),
      "{op:?} takes {} operand(s)",
      op.arity()
    );
    for operand in operands {
      assert!(
        ptr::eq(operand.tape(), self),
        "operand {} was recorded on another tape",
        operand.id()
      );
    }

    let mut ctx = Context::new();
    let inputs: SmallVec<[&T; 2]> = operands.iter().map(|var| var.value()).collect();
    let value = op.forward(&mut ctx, &inputs)?;

    let operands: SmallVec<[NodeId; 2]> = operands.iter().map(|var| var.id()).collect();
    trace!(op = ?op, operands = ?operands, next = self.len(), "apply");
    let id = self.push(Node::Computed { op, operands, ctx });

    Ok(Var::new(id, value, self))
  }

  /// Gradient accumulated by a leaf; computed nodes keep no gradient of their own
  pub fn grad(&self, id: NodeId) -> Option<T> {
    match self.nodes.borrow().get(id.index()) {
      Some(Node::Leaf { grad }) => Some(grad.clone()),
      _ => None,
    }
  }

  /// Whether `id` is a leaf (has no creation record)
  pub fn is_leaf(&self, id: NodeId) -> bool {
    matches!(self.nodes.borrow().get(id.index()), Some(Node::Leaf { .. }))
  }

  /// The operands `id` was computed from, empty for leaves
  pub fn operands(&self, id: NodeId) -> SmallVec<[NodeId; 2]> {
    match self.nodes.borrow().get(id.index()) {
      Some(Node::Computed { operands, .. }) => operands.clone(),
      _ => SmallVec::new(),
    }
  }

  /// Every computed ancestor of `root`, consumers before the nodes they consume
  pub fn topological_sort(&self, root: NodeId) -> Vec<NodeId> {
    topological_sort(&self.nodes.borrow(), root)
  }

  /// Propagate `seed`, the gradient of the objective with respect to `root`,
  /// back to every leaf `root` depends on.
  ///
  /// Leaf gradients accumulate: calling this twice without `zero_grad` in
  /// between adds both passes together.
  pub fn backward(&self, root: NodeId, seed: T) {
    backpropagate(&mut self.nodes.borrow_mut(), root, seed);
  }

  /// Reset the gradient of every leaf to zero
  pub fn zero_grad(&self) {
    for node in self.nodes.borrow_mut().iter_mut() {
      if let Node::Leaf { grad } = node {
        *grad = grad.zeros_like();
      }
    }
  }

  /// Forget the whole graph; needs exclusive access, so no handle can outlive it
  pub fn clear(&mut self) {
    self.nodes.get_mut().clear();
  }

  #[inline]
  fn push(&self, node: Node<T, F>) -> NodeId {
    let mut nodes = self.nodes.borrow_mut();
    let id = NodeId(nodes.len());
    nodes.push(node);
    id
  }
}

impl<T, F> Default for Tape<T, F>
where
  T: Payload,
  F: Function<T>,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<T, F: Function<T>> fmt::Debug for Tape<T, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let nodes = self.nodes.borrow();
    let leaves = nodes
      .iter()
      .filter(|node| matches!(node, Node::Leaf { .. }))
      .count();
    f.debug_struct("Tape")
      .field("nodes", &nodes.len())
      .field("leaves", &leaves)
      .finish()
  }
}
