//! Change propagation: static dependency graphs and scoped listeners.
//!
//! Entities announce property changes through a [`Notifier`]. When a tracked
//! input changes, the entity walks its [`DependencyGraph`] from that property
//! and emits one notification per reached property, so listeners only learn
//! *what* changed and re-read the values they care about.

mod graph;
mod subscription;

pub use graph::{CycleError, DependencyGraph};
pub use subscription::{Notifier, Subscription};

use core::hash::Hash;

/// Announces `changed` and everything that depends on it.
pub fn announce<P>(graph: &DependencyGraph<P>, notifier: &Notifier<P>, changed: P)
where
    P: Copy + Eq + Hash + core::fmt::Debug + 'static,
{
    announce_all(graph, notifier, [changed]);
}

/// Announces the union of the fan-outs from every property in `changed`.
pub fn announce_all<P>(
    graph: &DependencyGraph<P>,
    notifier: &Notifier<P>,
    changed: impl IntoIterator<Item = P>,
) where
    P: Copy + Eq + Hash + core::fmt::Debug + 'static,
{
    let reached = graph.propagate_all(changed);
    tracing::trace!(?reached, "announcing property changes");
    notifier.notify_all(reached.iter());
}
