//! Static property dependency graph.
//!
//! Each entity type declares once which derived properties must be
//! re-announced when a property changes. The table is an adjacency list
//! (`property -> dependents`) checked for cycles when it is built.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

/// A cycle was found while building a [`DependencyGraph`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("dependency cycle through {node}")]
pub struct CycleError {
    pub node: String,
}

/// Acyclic `property -> dependents` table.
#[derive(Clone, Debug)]
pub struct DependencyGraph<P> {
    dependents: HashMap<P, Vec<P>>,
}

impl<P> DependencyGraph<P>
where
    P: Copy + Eq + Hash + fmt::Debug,
{
    /// Builds the graph from `(property, dependents)` rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows contain a cycle. Graph tables are compile-time
    /// constants, so a cycle is a programming error.
    pub fn new(rows: &[(P, &[P])]) -> Self {
        match Self::try_new(rows) {
            Ok(graph) => graph,
            Err(err) => panic!("invalid dependency table: {err}"),
        }
    }

    /// Builds the graph, rejecting cycles.
    pub fn try_new(rows: &[(P, &[P])]) -> Result<Self, CycleError> {
        let mut dependents: HashMap<P, Vec<P>> = HashMap::new();
        let mut order = Vec::new();
        for (node, edges) in rows {
            let entry = dependents.entry(*node).or_insert_with(|| {
                order.push(*node);
                Vec::new()
            });
            for edge in *edges {
                if !entry.contains(edge) {
                    entry.push(*edge);
                }
            }
        }

        let graph = Self { dependents };
        graph.check_acyclic(&order)?;
        Ok(graph)
    }

    /// Direct dependents of `property`.
    pub fn dependents(&self, property: P) -> &[P] {
        self.dependents
            .get(&property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every property reachable from `start`, breadth-first, `start` first,
    /// each property at most once.
    pub fn propagate(&self, start: P) -> Vec<P> {
        self.propagate_all([start])
    }

    /// Union of [`propagate`](Self::propagate) over `starts`, duplicates
    /// suppressed, in first-reached order.
    pub fn propagate_all(&self, starts: impl IntoIterator<Item = P>) -> Vec<P> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut queue = VecDeque::new();

        for start in starts {
            if seen.insert(start) {
                queue.push_back(start);
            }
            while let Some(node) = queue.pop_front() {
                out.push(node);
                for &next in self.dependents(node) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        out
    }

    fn check_acyclic(&self, order: &[P]) -> Result<(), CycleError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<P>(
            graph: &DependencyGraph<P>,
            node: P,
            marks: &mut HashMap<P, Mark>,
        ) -> Result<(), CycleError>
        where
            P: Copy + Eq + Hash + fmt::Debug,
        {
            match marks.get(&node) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(CycleError {
                        node: format!("{node:?}"),
                    });
                }
                None => {}
            }
            marks.insert(node, Mark::Visiting);
            for &next in graph.dependents(node) {
                visit(graph, next, marks)?;
            }
            marks.insert(node, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        for &node in order {
            visit(self, node, &mut marks)?;
        }
        Ok(())
    }
}
