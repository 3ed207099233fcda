//! Reachability checks run before a dependency is accepted.

use crate::{Edge, Error, ItemId, Result, ScheduleGraph};
use tracing::debug;

/// Whether `to` is reachable from `from` over the successors in `edges`.
///
/// To vet a proposed `predecessor -> successor` edge call this with
/// `from = successor` and `to = predecessor`: if the successor already leads
/// back to the predecessor, the new edge would close a cycle. An item is
/// always considered reachable from itself.
#[must_use]
pub fn would_create_cycle(from: ItemId, to: ItemId, edges: &[Edge]) -> bool {
    if from == to {
        return true;
    }
    ScheduleGraph::from_edges(edges).reaches(from, to)
}

/// Check that `edge` may be added to `edges`.
///
/// # Errors
///
/// Returns [`Error::Cycle`] for self-dependencies and edges that close a
/// cycle, and [`Error::DuplicateEdge`] when the edge already exists.
pub fn ensure_edge_allowed(edge: Edge, edges: &[Edge]) -> Result<()> {
    if edges.contains(&edge) {
        return Err(Error::DuplicateEdge {
            predecessor: edge.predecessor,
            successor: edge.successor,
        });
    }
    if would_create_cycle(edge.successor, edge.predecessor, edges) {
        debug!(%edge, "Rejecting dependency that closes a cycle");
        return Err(Error::cycle(edge.predecessor, edge.successor));
    }
    Ok(())
}
