//! Re-chaining a whole group in an explicit order.

use crate::reflow::Span;
use crate::{BranchKind, Edge, Error, GroupId, Item, ItemId, ItemUpdate, Result, reflow};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of [`reorder_group_as_chain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderOutcome {
    /// Internal edges deleted.
    pub removed_edges: Vec<Edge>,
    /// Consecutive-pair edges replacing them.
    pub new_edges: Vec<Edge>,
    /// The new first item, pinned to the group's previous anchor date.
    pub root_anchor: ItemUpdate,
    /// Every other item moved by the new chain.
    pub updates: Vec<ItemUpdate>,
}

impl ReorderOutcome {
    /// Anchor and cascade updates as one list.
    #[must_use]
    pub fn all_updates(&self) -> Vec<ItemUpdate> {
        std::iter::once(self.root_anchor)
            .chain(self.updates.iter().copied())
            .collect()
    }
}

fn validate_order(group: GroupId, order: &[ItemId], members: &[&Item]) -> Result<()> {
    let member_ids: HashSet<ItemId> = members.iter().map(|item| item.id).collect();
    let mut seen = HashSet::with_capacity(order.len());
    for id in order {
        if !member_ids.contains(id) {
            return Err(Error::order_mismatch(group, format!("{id} is not in the group")));
        }
        if !seen.insert(*id) {
            return Err(Error::order_mismatch(group, format!("{id} is listed twice")));
        }
    }
    if seen.len() != member_ids.len() {
        return Err(Error::order_mismatch(
            group,
            format!("{} of {} items are listed", seen.len(), member_ids.len()),
        ));
    }
    Ok(())
}

/// Replace a group's internal dependencies with a single chain in `order`.
///
/// The existing internal dependencies must already form simple chains: no
/// item may have more than one internal predecessor or successor. The
/// earliest start among the current roots becomes the start of the new
/// first item, so the group does not drift. Edges leaving or entering the
/// group are preserved untouched and not reported.
///
/// # Errors
///
/// Returns [`Error::OrderMismatch`] unless `order` lists every group member
/// exactly once, [`Error::Branching`] when the current dependencies branch,
/// and [`Error::MissingAnchor`] when the group is empty or has no root.
pub fn reorder_group_as_chain(
    group: GroupId,
    order: &[ItemId],
    items: &[Item],
    edges: &[Edge],
) -> Result<ReorderOutcome> {
    let members: Vec<&Item> = items.iter().filter(|item| item.group_id == group).collect();
    validate_order(group, order, &members)?;
    let Some(&first) = order.first() else {
        return Err(Error::MissingAnchor { group });
    };

    let member_ids: HashSet<ItemId> = members.iter().map(|item| item.id).collect();
    let mut removed_edges: Vec<Edge> = Vec::new();
    for edge in edges {
        if member_ids.contains(&edge.predecessor)
            && member_ids.contains(&edge.successor)
            && !removed_edges.contains(edge)
        {
            removed_edges.push(*edge);
        }
    }

    let mut fan_in: HashMap<ItemId, usize> = HashMap::new();
    let mut fan_out: HashMap<ItemId, usize> = HashMap::new();
    for edge in &removed_edges {
        *fan_in.entry(edge.successor).or_default() += 1;
        *fan_out.entry(edge.predecessor).or_default() += 1;
    }
    for item in &members {
        if fan_in.get(&item.id).copied().unwrap_or(0) > 1 {
            return Err(Error::Branching {
                group,
                item: item.id,
                kind: BranchKind::FanIn,
            });
        }
        if fan_out.get(&item.id).copied().unwrap_or(0) > 1 {
            return Err(Error::Branching {
                group,
                item: item.id,
                kind: BranchKind::FanOut,
            });
        }
    }

    let anchor = members
        .iter()
        .filter(|item| !fan_in.contains_key(&item.id))
        .map(|item| item.start_date)
        .min()
        .ok_or(Error::MissingAnchor { group })?;

    let new_edges: Vec<Edge> = order
        .windows(2)
        .filter_map(|pair| match pair {
            [prev, next] => Some(Edge::new(*prev, *next)),
            _ => None,
        })
        .collect();

    let mut anchored: Vec<Item> = members.iter().map(|item| (*item).clone()).collect();
    let mut root_anchor = None;
    for item in &mut anchored {
        if item.id == first {
            let span = Span::starting(first, anchor, item.duration)?;
            item.start_date = span.start;
            item.end_date = span.end;
            root_anchor = Some(span.update(first));
        }
    }
    let root_anchor = root_anchor.ok_or(Error::UnknownItem { item: first })?;

    let updates: Vec<ItemUpdate> = reflow(&anchored, &new_edges, &[])?
        .into_iter()
        .filter(|update| update.id != first)
        .collect();

    debug!(
        %group,
        removed = removed_edges.len(),
        added = new_edges.len(),
        %anchor,
        updated = updates.len(),
        "Reordered group as chain"
    );

    Ok(ReorderOutcome {
        removed_edges,
        new_edges,
        root_anchor,
        updates,
    })
}
