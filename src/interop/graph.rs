//! Reference graph between named definitions.
//!
//! Used when exporting a definition: only the definitions it can reach need
//! to appear under `$defs`. Walks keep a visited set, so cyclic references
//! terminate.

use std::collections::HashSet;

use indexmap::IndexMap;

/// Directed graph of definition ids. An edge `a -> b` means definition `a`
/// contains a reference to `b`.
///
/// # Example
///
/// ```rust
/// use schemata::ReferenceGraph;
///
/// let mut graph = ReferenceGraph::new();
/// graph.add_definition("Tree", ["Node"]);
/// graph.add_definition("Node", ["Node", "Leaf"]);
/// graph.add_definition("Leaf", Vec::<String>::new());
///
/// assert_eq!(graph.reachable_from("Tree"), vec!["Node", "Leaf"]);
/// assert_eq!(graph.recursive_definitions(), vec!["Node"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    edges: IndexMap<String, Vec<String>>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a definition and the ids it references. Re-adding an id
    /// replaces its edges.
    pub fn add_definition<I, S>(&mut self, id: impl Into<String>, refs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut targets: Vec<String> = Vec::new();
        for target in refs.into_iter().map(Into::into) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        self.edges.insert(id.into(), targets);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// The ids `id` references directly.
    pub fn references(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every id reachable from `root` through one or more references, in
    /// depth-first discovery order. `root` itself is included only if it is
    /// part of a cycle. Ids with no definition are included as well.
    pub fn reachable_from(&self, root: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<&str> = self.references(root).iter().rev().map(String::as_str).collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id.to_string());
            stack.extend(self.references(id).iter().rev().map(String::as_str));
        }

        order
    }

    /// Definitions that can reach themselves, in insertion order.
    pub fn recursive_definitions(&self) -> Vec<String> {
        self.edges
            .keys()
            .filter(|id| self.reachable_from(id).iter().any(|reached| reached == *id))
            .cloned()
            .collect()
    }

    /// Referenced ids that have no definition, sorted and deduplicated.
    pub fn unresolved(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .edges
            .values()
            .flatten()
            .filter(|id| !self.edges.contains_key(id.as_str()))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}
