//! Stable display ordering.

use crate::{Edge, Item, ItemId, ScheduleGraph};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Tiebreak between items with no ordering relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    rank: i64,
    start: NaiveDate,
    id: ItemId,
}

impl SortKey {
    const fn of(item: &Item) -> Self {
        Self {
            rank: item.rank,
            start: item.start_date,
            id: item.id,
        }
    }
}

/// Order items so every predecessor precedes its successors.
///
/// Items that are free to go in any order are sorted by rank, then start
/// date, then id. The ready set is kept sorted, so the result is identical
/// across calls on identical input. Items stuck behind a pre-existing cycle
/// are appended at the end in the same key order.
#[must_use]
pub fn topological_order(items: &[Item], edges: &[Edge]) -> Vec<ItemId> {
    let graph = ScheduleGraph::build(items, edges);
    let keys: HashMap<ItemId, SortKey> = items.iter().map(|item| (item.id, SortKey::of(item))).collect();
    let mut in_degree = graph.in_degrees();

    let mut ready: BTreeSet<SortKey> = graph
        .roots()
        .filter_map(|id| keys.get(&id).copied())
        .collect();
    let mut order = Vec::with_capacity(keys.len());

    while let Some(key) = ready.pop_first() {
        order.push(key.id);
        for succ in graph.successors(key.id) {
            let Some(degree) = in_degree.get_mut(&succ) else {
                continue;
            };
            *degree = degree.saturating_sub(1);
            if *degree == 0
                && let Some(&succ_key) = keys.get(&succ)
            {
                ready.insert(succ_key);
            }
        }
        in_degree.remove(&key.id);
    }

    if !in_degree.is_empty() {
        let mut leftovers: Vec<SortKey> = in_degree
            .keys()
            .filter_map(|id| keys.get(id).copied())
            .collect();
        leftovers.sort();
        warn!(
            leftovers = leftovers.len(),
            "Appending items caught in a dependency cycle"
        );
        order.extend(leftovers.into_iter().map(|key| key.id));
    }

    order
}
