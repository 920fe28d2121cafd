use std::collections::VecDeque;

use crate::{DependencyKind, NodeId, ResolvedGraph};

#[derive(Clone, Debug, thiserror::Error)]
#[error("resolved graph contains a dependency cycle: {cycle:?}")]
pub struct CycleError {
    pub cycle: Vec<NodeId>,
}

/// Topologically sort nodes by direct-construction dependencies: a node's
/// dependencies come before the node itself.
///
/// Notes:
/// - Promised (proxy) edges are ignored for ordering and cycle detection;
///   they may point "backwards" without creating a dependency cycle.
/// - Interceptor attachments are not topological constraints either; the
///   interceptor nodes themselves order through their own dependencies.
pub fn topo_order(g: &ResolvedGraph) -> Result<Vec<NodeId>, CycleError> {
    let n = g.nodes.len();
    let mut indeg = vec![0usize; n];
    let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];

    for node in &g.nodes {
        for dep in &node.deps {
            if dep.kind == DependencyKind::Promised {
                continue;
            }
            let u = dep.node.0;
            let v = node.id.0;
            if u == v {
                continue;
            }
            out[u].push(v);
        }
    }

    for out in &mut out {
        out.sort_unstable();
        out.dedup();
        for &v in out.iter() {
            indeg[v] += 1;
        }
    }

    let mut q = VecDeque::new();
    for (i, &d) in indeg.iter().enumerate() {
        if d == 0 {
            q.push_back(i);
        }
    }

    let mut order = Vec::with_capacity(n);
    while let Some(u) = q.pop_front() {
        order.push(NodeId(u));
        for &v in &out[u] {
            indeg[v] -= 1;
            if indeg[v] == 0 {
                q.push_back(v);
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }

    let cycle = find_cycle(&out, &indeg);
    Err(CycleError { cycle })
}

fn find_cycle(out: &[Vec<usize>], indeg: &[usize]) -> Vec<NodeId> {
    let n = out.len();
    let mut state = vec![0u8; n];
    let mut stack = Vec::new();

    fn dfs(
        u: usize,
        out: &[Vec<usize>],
        indeg: &[usize],
        state: &mut [u8],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        state[u] = 1;
        stack.push(u);

        for &v in &out[u] {
            if indeg[v] == 0 {
                continue;
            }
            match state[v] {
                0 => {
                    if let Some(cycle) = dfs(v, out, indeg, state, stack) {
                        return Some(cycle);
                    }
                }
                1 => {
                    let start = stack
                        .iter()
                        .position(|&node| node == v)
                        .expect("node on stack");
                    let mut cycle = stack[start..].to_vec();
                    cycle.push(v);
                    return Some(cycle);
                }
                _ => {}
            }
        }

        stack.pop();
        state[u] = 2;
        None
    }

    for u in 0..n {
        if indeg[u] == 0 || state[u] != 0 {
            continue;
        }
        if let Some(cycle) = dfs(u, out, indeg, &mut state, &mut stack) {
            return cycle.into_iter().map(NodeId).collect();
        }
    }

    unreachable!("cycle expected in remaining graph");
}
