//! Graph mutations that change the dependency structure, not just dates.
//!
//! Each mutator is pure: it receives a snapshot and returns the edge changes
//! together with the reflow they cause. Nothing is computed when validation
//! fails.

mod relocate;
mod reorder;

pub use relocate::{MoveOutcome, move_item_across_groups};
pub use reorder::{ReorderOutcome, reorder_group_as_chain};

use crate::{Edge, Error, Item, ItemId, ItemUpdate, Result, ensure_edge_allowed, reflow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Edges whose endpoints both belong to `items`.
#[must_use]
pub fn edges_within(items: &[Item], edges: &[Edge]) -> Vec<Edge> {
    let ids: HashSet<ItemId> = items.iter().map(|item| item.id).collect();
    edges
        .iter()
        .filter(|edge| ids.contains(&edge.predecessor) && ids.contains(&edge.successor))
        .copied()
        .collect()
}

/// Result of adding or removing one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdit {
    /// The full edge set after the edit.
    pub edges: Vec<Edge>,
    /// Items moved by the edit.
    pub updates: Vec<ItemUpdate>,
}

fn ensure_known(items: &[Item], edge: Edge) -> Result<()> {
    for id in [edge.predecessor, edge.successor] {
        if !items.iter().any(|item| item.id == id) {
            return Err(Error::UnknownItem { item: id });
        }
    }
    Ok(())
}

/// Add `edge` after checking it keeps the graph acyclic, then reflow.
///
/// # Errors
///
/// Returns [`Error::UnknownItem`] when an endpoint is missing from `items`,
/// and the errors of [`ensure_edge_allowed`] and [`reflow`].
pub fn add_dependency(edge: Edge, items: &[Item], edges: &[Edge]) -> Result<DependencyEdit> {
    ensure_known(items, edge)?;
    ensure_edge_allowed(edge, edges)?;

    let mut next = edges.to_vec();
    next.push(edge);
    let updates = reflow(items, &edges_within(items, &next), &[])?;
    Ok(DependencyEdit {
        edges: next,
        updates,
    })
}

/// Remove `edge`, then reflow.
///
/// Successors are pulled earlier when the removed edge was what held them
/// back; a successor left without predecessors keeps its current start.
///
/// # Errors
///
/// Returns [`Error::MissingEdge`] when `edge` is not in `edges`, and the
/// errors of [`reflow`].
pub fn remove_dependency(edge: Edge, items: &[Item], edges: &[Edge]) -> Result<DependencyEdit> {
    if !edges.contains(&edge) {
        return Err(Error::MissingEdge {
            predecessor: edge.predecessor,
            successor: edge.successor,
        });
    }

    let next: Vec<Edge> = edges.iter().filter(|e| **e != edge).copied().collect();
    let updates = reflow(items, &edges_within(items, &next), &[])?;
    Ok(DependencyEdit {
        edges: next,
        updates,
    })
}
