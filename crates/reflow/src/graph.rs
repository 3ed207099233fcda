//! Request-scoped dependency graph built from one snapshot.
//!
//! The graph is keyed by [`ItemId`] instead of holding references between
//! items, so it can be rebuilt cheaply for every compute call and dropped
//! afterwards.

use crate::{Edge, Item, ItemId};
use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Predecessor/successor indices over one group's items.
///
/// Node and neighbor iteration follow insertion order, which makes every
/// algorithm built on top of this type deterministic for identical input.
#[derive(Debug, Clone, Default)]
pub struct ScheduleGraph {
    graph: DiGraphMap<ItemId, ()>,
    dangling: Vec<Edge>,
}

impl ScheduleGraph {
    /// Build the graph for `items`.
    ///
    /// Edges with an endpoint outside `items` are dropped and remembered as
    /// dangling; they appear transiently while an item moves between groups.
    #[must_use]
    pub fn build(items: &[Item], edges: &[Edge]) -> Self {
        Self::from_ids(items.iter().map(|item| item.id), edges)
    }

    /// Build the graph over an explicit id set.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ItemId>, edges: &[Edge]) -> Self {
        let mut graph = DiGraphMap::new();
        for id in ids {
            graph.add_node(id);
        }

        let mut dangling = Vec::new();
        for edge in edges {
            if !graph.contains_node(edge.predecessor) || !graph.contains_node(edge.successor) {
                warn!(%edge, "Dropping dependency that references an item outside the snapshot");
                dangling.push(*edge);
                continue;
            }
            if graph.add_edge(edge.predecessor, edge.successor, ()).is_some() {
                debug!(%edge, "Ignoring duplicate dependency");
            }
        }

        debug!(
            items = graph.node_count(),
            edges = graph.edge_count(),
            dangling = dangling.len(),
            "Built schedule graph"
        );

        Self { graph, dangling }
    }

    /// Build a graph containing exactly the endpoints of `edges`.
    #[must_use]
    pub fn from_edges(edges: &[Edge]) -> Self {
        let graph = edges
            .iter()
            .map(|edge| (edge.predecessor, edge.successor))
            .collect::<DiGraphMap<ItemId, ()>>();
        Self {
            graph,
            dangling: Vec::new(),
        }
    }

    /// Number of items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct dependencies kept.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether `id` is part of the graph.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.graph.contains_node(id)
    }

    /// Whether the dependency is part of the graph.
    #[must_use]
    pub fn contains_edge(&self, edge: Edge) -> bool {
        self.graph.contains_edge(edge.predecessor, edge.successor)
    }

    /// Item ids in insertion order.
    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.graph.nodes()
    }

    /// Kept dependencies.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph
            .all_edges()
            .map(|(predecessor, successor, _)| Edge::new(predecessor, successor))
    }

    /// Items that must finish before `id` starts.
    pub fn predecessors(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        self.graph.neighbors_directed(id, Direction::Incoming)
    }

    /// Items waiting on `id`.
    pub fn successors(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        self.graph.neighbors_directed(id, Direction::Outgoing)
    }

    /// Number of predecessors of `id`.
    #[must_use]
    pub fn in_degree(&self, id: ItemId) -> usize {
        self.predecessors(id).count()
    }

    /// Number of predecessors for every item.
    #[must_use]
    pub fn in_degrees(&self) -> HashMap<ItemId, usize> {
        self.item_ids().map(|id| (id, self.in_degree(id))).collect()
    }

    /// Items without predecessors, in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.item_ids().filter(|&id| self.in_degree(id) == 0)
    }

    /// Edges dropped during construction because an endpoint was missing.
    #[must_use]
    pub fn dangling_edges(&self) -> &[Edge] {
        &self.dangling
    }

    /// Whether `to` can be reached from `from` by following successors.
    ///
    /// An item always reaches itself.
    #[must_use]
    pub fn reaches(&self, from: ItemId, to: ItemId) -> bool {
        if from == to {
            return true;
        }
        if !self.contains(from) || !self.contains(to) {
            return false;
        }

        let mut bfs = Bfs::new(&self.graph, from);
        while let Some(node) = bfs.next(&self.graph) {
            if node == to {
                return true;
            }
        }
        false
    }
}
