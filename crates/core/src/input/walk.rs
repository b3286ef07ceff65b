use std::collections::{HashMap, HashSet};

use super::graph::{Input, Node, NodeId};

/// Result of a depth-limited nesting walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthReport {
    /// Container nesting depth; a scalar root is 0, `{}` is 1.
    /// Saturates at `limit + 1` once the limit is exceeded.
    pub depth: usize,
    /// A container was reached again while it was still on the current path.
    pub cyclic: bool,
}

impl DepthReport {
    pub fn exceeds(&self, limit: usize) -> bool {
        self.depth > limit
    }
}

/// Measure container nesting depth, stopping once `limit` is exceeded.
///
/// Back-edges to a container on the current path set `cyclic` instead of
/// being followed. Recursion is bounded by `limit + 1`.
pub fn measure_depth(input: &Input, limit: usize) -> DepthReport {
    let mut report = DepthReport::default();
    let mut on_path = HashSet::new();
    let mut deepest_entry: HashMap<NodeId, usize> = HashMap::new();
    descend(
        input,
        input.root(),
        1,
        limit,
        &mut on_path,
        &mut deepest_entry,
        &mut report,
    );
    report
}

fn descend(
    input: &Input,
    id: NodeId,
    level: usize,
    limit: usize,
    on_path: &mut HashSet<NodeId>,
    deepest_entry: &mut HashMap<NodeId, usize>,
    report: &mut DepthReport,
) {
    let node = input.node(id);
    if !node.is_container() {
        return;
    }
    if on_path.contains(&id) {
        report.cyclic = true;
        return;
    }
    report.depth = report.depth.max(level);
    if level > limit {
        return;
    }
    // Re-entering at the same or a shallower level cannot produce a deeper result.
    if deepest_entry.get(&id).is_some_and(|&seen| seen >= level) {
        return;
    }
    deepest_entry.insert(id, level);

    on_path.insert(id);
    for child in (0..node.child_count()).filter_map(|i| node.child(i)) {
        descend(input, child, level + 1, limit, on_path, deepest_entry, report);
    }
    on_path.remove(&id);
}

/// Whether any container is reachable from itself. Iterative three-colour DFS.
pub fn has_cycle(input: &Input) -> bool {
    let mut finished: HashSet<NodeId> = HashSet::new();
    let mut on_path: HashSet<NodeId> = HashSet::new();
    // (node, index of next child to visit)
    let mut stack: Vec<(NodeId, usize)> = vec![(input.root(), 0)];
    on_path.insert(input.root());

    while let Some((id, next)) = stack.pop() {
        if let Some(child) = input.node(id).child(next) {
            stack.push((id, next + 1));
            if on_path.contains(&child) {
                return true;
            }
            if !finished.contains(&child) && input.node(child).is_container() {
                on_path.insert(child);
                stack.push((child, 0));
            }
        } else {
            on_path.remove(&id);
            finished.insert(id);
        }
    }
    false
}

/// Visit every reachable node exactly once, pre-order, children in order.
pub(crate) fn for_each_reachable(input: &Input, mut f: impl FnMut(NodeId, &Node)) {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![input.root()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let node = input.node(id);
        f(id, node);
        let children = node.children();
        stack.extend(children.into_iter().rev());
    }
}

/// Total own-property count across all distinct reachable objects.
pub fn property_count(input: &Input) -> usize {
    let mut count = 0;
    for_each_reachable(input, |_, node| {
        if let Node::Object(fields) = node {
            count += fields.len();
        }
    });
    count
}

/// All finite numeric leaves, in traversal order.
pub fn numeric_leaves(input: &Input) -> Vec<f64> {
    let mut values = Vec::new();
    for_each_reachable(input, |_, node| {
        if let Node::Number(n) = node {
            if n.is_finite() {
                values.push(*n);
            }
        }
    });
    values
}
