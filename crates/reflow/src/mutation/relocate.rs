//! Moving an item from one group to another.
//!
//! The item is cut out of its origin chain. Each former predecessor is
//! bridged to each former successor so the remaining items keep their
//! relative order, unless that bridge would close a cycle, in which case the
//! two sides simply diverge. Bridges are checked against the origin's
//! remaining edges only.

use super::edges_within;
use crate::{Edge, Error, GroupId, Item, ItemId, ItemUpdate, Result, ScheduleGraph, reflow, would_create_cycle};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of [`move_item_across_groups`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    /// The item as it belongs to its new group.
    pub moved: Item,
    /// Every edge that touched the item.
    pub dropped_edges: Vec<Edge>,
    /// Predecessor-to-successor edges inserted in the origin group.
    pub bridged_edges: Vec<Edge>,
    /// Bridges skipped because they would have closed a cycle.
    pub rejected_bridges: Vec<Edge>,
    /// Reflow of the origin group after the item left.
    pub origin_updates: Vec<ItemUpdate>,
    /// Reflow of the destination group after the item arrived.
    pub destination_updates: Vec<ItemUpdate>,
}

impl MoveOutcome {
    /// `edges` with this move's drops and bridges applied.
    #[must_use]
    pub fn apply_to(&self, edges: &[Edge]) -> Vec<Edge> {
        edges
            .iter()
            .filter(|edge| !self.dropped_edges.contains(edge))
            .chain(&self.bridged_edges)
            .copied()
            .collect()
    }
}

/// Move `item_id` from group `from` to group `to`.
///
/// `items` must contain both groups; `edges` may contain any edges touching
/// them. The moved item keeps its dates and duration and arrives in the
/// destination as a root.
///
/// # Errors
///
/// Returns [`Error::SameGroup`] when `from == to`, [`Error::UnknownItem`] or
/// [`Error::GroupMismatch`] when the item is not in `from`, and
/// [`Error::MissingAnchor`] when the remaining origin items have no root.
pub fn move_item_across_groups(
    item_id: ItemId,
    from: GroupId,
    to: GroupId,
    items: &[Item],
    edges: &[Edge],
) -> Result<MoveOutcome> {
    if from == to {
        return Err(Error::SameGroup {
            item: item_id,
            group: from,
        });
    }
    let item = items
        .iter()
        .find(|item| item.id == item_id)
        .ok_or(Error::UnknownItem { item: item_id })?;
    if item.group_id != from {
        return Err(Error::GroupMismatch {
            item: item_id,
            expected: from,
            actual: item.group_id,
        });
    }

    let mut predecessors = Vec::new();
    let mut successors = Vec::new();
    let mut dropped_edges = Vec::new();
    let mut remaining = Vec::new();
    for edge in edges {
        if !edge.touches(item_id) {
            remaining.push(*edge);
            continue;
        }
        dropped_edges.push(*edge);
        if edge.successor == item_id && edge.predecessor != item_id {
            predecessors.push(edge.predecessor);
        } else if edge.predecessor == item_id && edge.successor != item_id {
            successors.push(edge.successor);
        }
    }

    let mut bridged_edges = Vec::new();
    let mut rejected_bridges = Vec::new();
    for &pred in &predecessors {
        for &succ in &successors {
            let bridge = Edge::new(pred, succ);
            if remaining.contains(&bridge) {
                continue;
            }
            if would_create_cycle(succ, pred, &remaining) {
                debug!(%bridge, "Dropping bridge that would close a cycle");
                rejected_bridges.push(bridge);
                continue;
            }
            remaining.push(bridge);
            bridged_edges.push(bridge);
        }
    }

    let mut moved = item.clone();
    moved.group_id = to;

    let origin: Vec<Item> = items
        .iter()
        .filter(|other| other.group_id == from && other.id != item_id)
        .cloned()
        .collect();
    let origin_edges = edges_within(&origin, &remaining);
    if !origin.is_empty() && ScheduleGraph::build(&origin, &origin_edges).roots().next().is_none() {
        return Err(Error::MissingAnchor { group: from });
    }

    let destination: Vec<Item> = items
        .iter()
        .filter(|other| other.group_id == to && other.id != item_id)
        .cloned()
        .chain(std::iter::once(moved.clone()))
        .collect();
    let destination_edges = edges_within(&destination, &remaining);

    let origin_updates = reflow(&origin, &origin_edges, &[])?;
    let destination_updates = reflow(&destination, &destination_edges, &[])?;

    debug!(
        item = %item_id,
        %from,
        %to,
        dropped = dropped_edges.len(),
        bridged = bridged_edges.len(),
        rejected = rejected_bridges.len(),
        "Moved item across groups"
    );

    Ok(MoveOutcome {
        moved,
        dropped_edges,
        bridged_edges,
        rejected_bridges,
        origin_updates,
        destination_updates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn item(id: u64, group: u64, start: u32, duration: u32) -> Item {
        Item::new(ItemId::new(id), GroupId::new(group), day(start), duration).unwrap()
    }

    fn edge(p: u64, s: u64) -> Edge {
        Edge::new(ItemId::new(p), ItemId::new(s))
    }

    #[test]
    fn test_fan_in_and_fan_out_bridge_every_pair() {
        let items = [
            item(1, 1, 1, 1),
            item(2, 1, 1, 1),
            item(3, 1, 2, 1),
            item(4, 1, 3, 1),
            item(5, 1, 3, 1),
        ];
        let edges = [edge(1, 3), edge(2, 3), edge(3, 4), edge(3, 5)];
        let outcome = move_item_across_groups(ItemId::new(3), GroupId::new(1), GroupId::new(2), &items, &edges)
            .unwrap();

        assert_eq!(outcome.dropped_edges, edges.to_vec());
        assert_eq!(
            outcome.bridged_edges,
            vec![edge(1, 4), edge(1, 5), edge(2, 4), edge(2, 5)]
        );
        assert!(outcome.rejected_bridges.is_empty());
        // 4 and 5 now start the day after 1 and 2 end.
        assert_eq!(outcome.origin_updates.len(), 2);
        assert!(outcome.origin_updates.iter().all(|u| u.start_date == day(2)));
    }

    #[test]
    fn test_existing_bridge_is_not_duplicated() {
        let items = [item(1, 1, 1, 1), item(2, 1, 2, 1), item(3, 1, 3, 1)];
        let edges = [edge(1, 2), edge(2, 3), edge(1, 3)];
        let outcome = move_item_across_groups(ItemId::new(2), GroupId::new(1), GroupId::new(2), &items, &edges)
            .unwrap();

        assert!(outcome.bridged_edges.is_empty());
        assert_eq!(outcome.apply_to(&edges), vec![edge(1, 3)]);
    }

    #[test]
    fn test_moved_item_keeps_dates_in_destination() {
        let items = [item(1, 1, 1, 2), item(2, 1, 3, 4), item(9, 2, 1, 1)];
        let outcome = move_item_across_groups(
            ItemId::new(2),
            GroupId::new(1),
            GroupId::new(2),
            &items,
            &[edge(1, 2)],
        )
        .unwrap();

        assert_eq!(outcome.moved.group_id, GroupId::new(2));
        assert_eq!(outcome.moved.start_date, day(3));
        assert!(outcome.destination_updates.is_empty());
    }

    #[test]
    fn test_rejects_wrong_origin() {
        let items = [item(1, 1, 1, 1)];
        assert_eq!(
            move_item_across_groups(ItemId::new(1), GroupId::new(3), GroupId::new(2), &items, &[]),
            Err(Error::GroupMismatch {
                item: ItemId::new(1),
                expected: GroupId::new(3),
                actual: GroupId::new(1),
            })
        );
        assert!(matches!(
            move_item_across_groups(ItemId::new(1), GroupId::new(1), GroupId::new(1), &items, &[]),
            Err(Error::SameGroup { .. })
        ));
        assert!(matches!(
            move_item_across_groups(ItemId::new(7), GroupId::new(1), GroupId::new(2), &items, &[]),
            Err(Error::UnknownItem { .. })
        ));
    }

    #[test]
    fn test_rootless_origin_is_missing_anchor() {
        let items = [item(1, 1, 1, 1), item(2, 1, 1, 1), item(3, 1, 1, 1)];
        let edges = [edge(1, 2), edge(2, 1)];
        assert_eq!(
            move_item_across_groups(ItemId::new(3), GroupId::new(1), GroupId::new(2), &items, &edges),
            Err(Error::MissingAnchor {
                group: GroupId::new(1),
            })
        );
    }
}
