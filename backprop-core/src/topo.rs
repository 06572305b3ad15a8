use bit_set::BitSet;

use crate::tape::Node;
use crate::{Function, NodeId};

/// Order the computed ancestors of `root` so that every node comes before the
/// operands it was computed from...
///
/// Leaves are neither emitted nor expanded, they only receive gradients. A node
/// reachable along several paths is emitted once. A leaf root (or an id the
/// tape does not know) yields an empty order.
pub(crate) fn topological_sort<T, F>(nodes: &[Node<T, F>], root: NodeId) -> Vec<NodeId>
where
  F: Function<T>,
{
  // ids are dense arena indices, so a bitset is enough to track visits
  let mut visited = BitSet::with_capacity(nodes.len());
  let mut stack = Vec::with_capacity(64);
  let mut order = Vec::new();

  stack.push((root, false));

  // linear dfs, deep chains must not blow the call stack...
  while let Some((id, operands_done)) = stack.pop() {
    if operands_done {
      // postorder: every operand is already in `order`
      order.push(id);
      continue;
    }

    let Some(Node::Computed { operands, .. }) = nodes.get(id.index()) else {
      continue;
    };
    if !visited.insert(id.index()) {
      continue;
    }

    // marker to emit the node after its operands
    stack.push((id, true));
    // push in reverse so the first operand is expanded first
    for operand in operands.iter().rev() {
      if !visited.contains(operand.index()) {
        stack.push((*operand, false));
      }
    }
  }

  // producers before consumers -> consumers before producers
  order.reverse();
  order
}
