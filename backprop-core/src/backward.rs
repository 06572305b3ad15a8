use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug_span;

use crate::tape::Node;
use crate::topo::topological_sort;
use crate::{Function, NodeId, Payload};

/// We know how many in-flight gradients to expect, but a map with a custom
/// hasher has no `with_capacity`...
trait HashMapExt {
  fn with_capacity(capacity: usize) -> Self;
}

impl<K, V, S> HashMapExt for HashMap<K, V, S>
where
  K: Hash + Eq,
  S: BuildHasher + Default,
{
  fn with_capacity(capacity: usize) -> Self {
    HashMap::with_capacity_and_hasher(capacity, S::default())
  }
}

/// Distribute `seed` from `root` down to every leaf it depends on.
///
/// Computed nodes collect their incoming gradient in a transient table keyed
/// by id; a node reached along several paths sums every contribution before
/// it is processed, which the topological order guarantees. Leaves accumulate
/// in place and keep their gradient after the table is dropped.
pub(crate) fn backpropagate<T, F>(nodes: &mut [Node<T, F>], root: NodeId, seed: T)
where
  T: Payload,
  F: Function<T>,
{
  let order = topological_sort(nodes, root);
  let _span = debug_span!("backpropagate", root = %root, nodes = order.len()).entered();

  let mut table: FxHashMap<NodeId, T> = FxHashMap::with_capacity(order.len());
  table.insert(root, seed);

  for id in order {
    // every consumer of `id` has been processed, so its gradient is final
    let Some(upstream) = table.remove(&id) else {
      continue;
    };
    let Node::Computed { op, operands, ctx } = &nodes[id.index()] else {
      continue;
    };

    let partials = op.backward(ctx, &upstream);
    debug_assert_eq!(
      partials.len(),
      operands.len(),
      "{op:?} returned the wrong number of partials"
    );
    let contributions: SmallVec<[(NodeId, T); 2]> = operands.iter().copied().zip(partials).collect();

    for (operand, partial) in contributions {
      match &mut nodes[operand.index()] {
        Node::Leaf { grad } => grad.accumulate(&partial),
        Node::Computed { .. } => match table.entry(operand) {
          Entry::Occupied(mut slot) => slot.get_mut().accumulate(&partial),
          Entry::Vacant(slot) => {
            slot.insert(partial);
          }
        },
      }
    }
  }
}
