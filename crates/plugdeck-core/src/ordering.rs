//! Dependency-respecting load order.
//!
//! Kahn's algorithm over the candidate set. Edges come from hard
//! dependencies, soft dependencies and `load_before` hints; references to
//! names outside the set are ignored here (missing hard dependencies are
//! reported by the loader). Ties are broken by input order, so the result is
//! deterministic for a given discovery order.

use std::collections::{BTreeSet, HashMap};

use crate::asset::AssetDescriptor;
use crate::error::{AssetError, Result};

/// Sort `descriptors` so every asset comes after the assets it depends on.
///
/// Fails with [`AssetError::CyclicDependency`] naming one cycle when the
/// graph is not acyclic.
pub fn dependency_order<'a, I>(descriptors: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a AssetDescriptor>,
{
    let nodes: Vec<&AssetDescriptor> = descriptors.into_iter().collect();
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();

    // successors[i]: nodes that must come after i
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut add_edge = |before: usize, after: usize| {
        if !successors[before].contains(&after) {
            successors[before].push(after);
            predecessors[after].push(before);
        }
    };

    for (i, desc) in nodes.iter().enumerate() {
        for dep in desc.depends.iter().chain(&desc.soft_depends) {
            if let Some(&d) = index.get(dep.as_str()) {
                add_edge(d, i);
            }
        }
        for later in &desc.load_before {
            if let Some(&l) = index.get(later.as_str()) {
                add_edge(i, l);
            }
        }
    }

    let mut in_degree: Vec<usize> = predecessors.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(nodes.len());

    while let Some(next) = ready.pop_first() {
        sorted.push(next);
        for &succ in &successors[next] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                ready.insert(succ);
            }
        }
    }

    if sorted.len() != nodes.len() {
        let cycle = find_cycle(&in_degree, &predecessors)
            .into_iter()
            .map(|i| nodes[i].name.clone())
            .collect();
        return Err(AssetError::CyclicDependency { cycle });
    }

    Ok(sorted.into_iter().map(|i| nodes[i].name.clone()).collect())
}

/// Extract one cycle among the nodes Kahn's pass could not emit.
///
/// Every such node still has a predecessor in the same set, so walking
/// predecessors must eventually revisit a node.
fn find_cycle(in_degree: &[usize], predecessors: &[Vec<usize>]) -> Vec<usize> {
    let Some(start) = (0..in_degree.len()).find(|&i| in_degree[i] > 0) else {
        return Vec::new();
    };

    let mut walk = vec![start];
    let mut position: HashMap<usize, usize> = HashMap::from([(start, 0)]);
    let mut current = start;

    loop {
        let Some(&prev) = predecessors[current].iter().find(|&&p| in_degree[p] > 0) else {
            return walk;
        };
        if let Some(&at) = position.get(&prev) {
            // walk[at..] runs against the edges; flip it into load order
            let mut cycle: Vec<usize> = walk[at..].iter().rev().copied().collect();
            cycle.rotate_right(1);
            cycle.push(cycle[0]);
            return cycle;
        }
        position.insert(prev, walk.len());
        walk.push(prev);
        current = prev;
    }
}
