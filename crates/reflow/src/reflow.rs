//! Tight finish-to-start rescheduling.
//!
//! Every item starts on the day after its latest predecessor ends; items
//! without predecessors keep whatever start date they have. The pass is a
//! single Kahn traversal over the snapshot, so each item is visited once and
//! successors always observe their predecessors' committed dates.
//!
//! The computation keeps two explicit maps, `original` (pre-call values) and
//! `working` (values being computed), and only reports items whose dates
//! differ between the two.

use crate::{Edge, Error, Item, ItemId, ItemOverride, ItemUpdate, Result, ScheduleGraph, end_date_for};
use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Dates and duration of one item during a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration: u32,
}

impl Span {
    pub(crate) fn of(item: &Item) -> Self {
        Self {
            start: item.start_date,
            end: item.end_date,
            duration: item.duration,
        }
    }

    /// Span of `duration` days starting on `start`.
    pub(crate) fn starting(item: ItemId, start: NaiveDate, duration: u32) -> Result<Self> {
        if duration == 0 {
            return Err(Error::InvalidDuration { item, duration });
        }
        let end = end_date_for(start, duration).ok_or(Error::DateOutOfRange { item })?;
        Ok(Self {
            start,
            end,
            duration,
        })
    }

    pub(crate) const fn update(self, id: ItemId) -> ItemUpdate {
        ItemUpdate {
            id,
            start_date: self.start,
            end_date: self.end,
            duration: self.duration,
        }
    }
}

/// Recompute dates for every item reachable from a change.
///
/// `overrides` are applied to a working copy before the traversal: a new
/// duration recomputes the end from the current start, a new start shifts
/// the whole span. Only items whose start or end differ from their pre-call
/// values (before overrides) are returned, in processing order.
///
/// Items kept out of the traversal by a pre-existing cycle are left as they
/// are.
///
/// # Errors
///
/// Returns [`Error::InvalidDuration`] for zero durations,
/// [`Error::UnknownItem`] for overrides naming an item outside `items`, and
/// [`Error::DateOutOfRange`] when a computed date is not representable.
pub fn reflow(items: &[Item], edges: &[Edge], overrides: &[ItemOverride]) -> Result<Vec<ItemUpdate>> {
    let original: HashMap<ItemId, Span> = items.iter().map(|item| (item.id, Span::of(item))).collect();
    let mut working = original.clone();

    for item in items {
        if item.duration == 0 {
            return Err(Error::InvalidDuration {
                item: item.id,
                duration: item.duration,
            });
        }
    }

    for edit in overrides {
        let current = working
            .get(&edit.id)
            .copied()
            .ok_or(Error::UnknownItem { item: edit.id })?;
        let start = edit.start_date.unwrap_or(current.start);
        let duration = edit.duration.unwrap_or(current.duration);
        working.insert(edit.id, Span::starting(edit.id, start, duration)?);
    }

    let graph = ScheduleGraph::build(items, edges);
    let mut in_degree = graph.in_degrees();
    let mut ready: VecDeque<ItemId> = graph.roots().collect();
    let mut updates = Vec::new();
    let mut visited = 0_usize;

    while let Some(id) = ready.pop_front() {
        visited += 1;
        let Some(&current) = working.get(&id) else {
            continue;
        };

        let latest_predecessor_end = graph
            .predecessors(id)
            .filter_map(|pred| working.get(&pred).map(|span| span.end))
            .max();
        let start = match latest_predecessor_end {
            None => current.start,
            Some(end) => end.succ_opt().ok_or(Error::DateOutOfRange { item: id })?,
        };
        let next = Span::starting(id, start, current.duration)?;

        if let Some(before) = original.get(&id)
            && (before.start != next.start || before.end != next.end)
        {
            updates.push(next.update(id));
        }
        working.insert(id, next);

        for succ in graph.successors(id) {
            if let Some(degree) = in_degree.get_mut(&succ) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.push_back(succ);
                }
            }
        }
    }

    if visited < graph.item_count() {
        warn!(
            unreached = graph.item_count() - visited,
            "Schedule graph contains a cycle; leaving unreached items untouched"
        );
    }

    debug!(
        items = items.len(),
        edges = graph.edge_count(),
        overrides = overrides.len(),
        updated = updates.len(),
        "Reflow complete"
    );

    Ok(updates)
}

/// Apply a batch of edits as one reflow.
///
/// Several overrides for the same item are folded together, later fields
/// winning, before the traversal runs.
///
/// # Errors
///
/// Same as [`reflow`].
pub fn apply_bulk_edit(
    items: &[Item],
    edges: &[Edge],
    overrides: &[ItemOverride],
) -> Result<Vec<ItemUpdate>> {
    let mut folded: Vec<ItemOverride> = Vec::with_capacity(overrides.len());
    for edit in overrides {
        match folded.iter_mut().find(|existing| existing.id == edit.id) {
            Some(existing) => existing.merge(edit),
            None => folded.push(*edit),
        }
    }
    reflow(items, edges, &folded)
}
