//! Serialized edit cycles.
//!
//! Every mutating operation loads a fresh snapshot, runs the engine and
//! persists the result while holding its group's lock, so two edits to the
//! same group never compute from diverging snapshots. Moves lock both groups
//! in ascending id order.

use crate::{ChangeSet, PlannerError, Result, ScheduleStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};
use waymark_reflow::{
    Edge, GroupId, Item, ItemId, ItemOverride, ItemUpdate, MoveOutcome, ReorderOutcome,
    TeamId, TeamOverlayReflow, TeamTrack, add_dependency, apply_bulk_edit,
    compute_team_overlay_reflow, edges_within, move_item_across_groups, reflow_for_team,
    remove_dependency, reorder_group_as_chain, topological_order,
};

/// Runs engine operations against a [`ScheduleStore`].
#[derive(Debug)]
pub struct Planner<S> {
    store: S,
    locks: Mutex<HashMap<GroupId, Arc<Mutex<()>>>>,
}

struct GroupSnapshot {
    items: Vec<Item>,
    edges: Vec<Edge>,
}

impl GroupSnapshot {
    fn internal_edges(&self) -> Vec<Edge> {
        edges_within(&self.items, &self.edges)
    }

    fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }
}

impl<S: ScheduleStore> Planner<S> {
    /// Create a planner over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn group_lock(&self, group: GroupId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| PlannerError::LockPoisoned { group })?;
        Ok(Arc::clone(locks.entry(group).or_default()))
    }

    /// Drop the group's lock once no edit holds or waits on it.
    fn release_group_lock(&self, group: GroupId) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // Clones are only handed out under the registry lock, so a count
        // of one means nobody else can be waiting on this group.
        if locks
            .get(&group)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&group);
        }
    }

    fn with_group<T>(&self, group: GroupId, edit: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.group_lock(group)?;
        let result = match lock.lock() {
            Ok(_guard) => edit(),
            Err(_) => Err(PlannerError::LockPoisoned { group }),
        };
        drop(lock);
        self.release_group_lock(group);
        result
    }

    /// Groups whose lock is currently held or awaited.
    #[must_use]
    pub fn active_groups(&self) -> usize {
        self.locks.lock().map_or(0, |locks| locks.len())
    }

    fn with_groups<T>(&self, a: GroupId, b: GroupId, edit: impl FnOnce() -> Result<T>) -> Result<T> {
        if a == b {
            return self.with_group(a, edit);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        self.with_group(first, || self.with_group(second, edit))
    }

    fn load_group(&self, group: GroupId) -> Result<GroupSnapshot> {
        let items = self.store.load_items(group)?;
        let ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();
        let edges = self.store.load_edges(&ids)?;
        debug!(%group, items = items.len(), edges = edges.len(), "Loaded group snapshot");
        Ok(GroupSnapshot { items, edges })
    }

    fn ensure_member(snapshot: &GroupSnapshot, group: GroupId, item: ItemId) -> Result<()> {
        if snapshot.items.iter().any(|i| i.id == item) {
            Ok(())
        } else {
            Err(PlannerError::NotInGroup { item, group })
        }
    }

    fn persist(&self, changes: &ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.store.apply(changes)
    }

    /// Add `predecessor -> successor` and reflow the group.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::NotInGroup`] when an endpoint is not in
    /// `group`, and engine errors such as a cycle or duplicate.
    #[instrument(skip(self))]
    pub fn add_dependency(&self, group: GroupId, edge: Edge) -> Result<Vec<ItemUpdate>> {
        self.with_group(group, || {
            let snapshot = self.load_group(group)?;
            Self::ensure_member(&snapshot, group, edge.predecessor)?;
            Self::ensure_member(&snapshot, group, edge.successor)?;

            let edit = add_dependency(edge, &snapshot.items, &snapshot.internal_edges())?;
            self.persist(&ChangeSet {
                updates: edit.updates.clone(),
                added_edges: vec![edge],
                ..ChangeSet::default()
            })?;
            Ok(edit.updates)
        })
    }

    /// Remove `predecessor -> successor` and reflow the group.
    ///
    /// # Errors
    ///
    /// Returns engine errors, e.g. when the dependency does not exist.
    #[instrument(skip(self))]
    pub fn remove_dependency(&self, group: GroupId, edge: Edge) -> Result<Vec<ItemUpdate>> {
        self.with_group(group, || {
            let snapshot = self.load_group(group)?;
            let edit = remove_dependency(edge, &snapshot.items, &snapshot.internal_edges())?;
            self.persist(&ChangeSet {
                updates: edit.updates.clone(),
                removed_edges: vec![edge],
                ..ChangeSet::default()
            })?;
            Ok(edit.updates)
        })
    }

    /// Apply date and duration edits to items of `group` and reflow.
    ///
    /// # Errors
    ///
    /// Returns engine errors, e.g. for unknown items or zero durations.
    #[instrument(skip(self, overrides), fields(overrides = overrides.len()))]
    pub fn edit_items(&self, group: GroupId, overrides: &[ItemOverride]) -> Result<Vec<ItemUpdate>> {
        self.with_group(group, || {
            let snapshot = self.load_group(group)?;
            let updates = apply_bulk_edit(&snapshot.items, &snapshot.internal_edges(), overrides)?;
            self.persist(&ChangeSet::with_updates(updates.clone()))?;
            Ok(updates)
        })
    }

    /// Move an item to another group, bridging its old chain.
    ///
    /// # Errors
    ///
    /// Returns engine errors, e.g. when the item is not in `from`.
    #[instrument(skip(self))]
    pub fn move_item(&self, item: ItemId, from: GroupId, to: GroupId) -> Result<MoveOutcome> {
        self.with_groups(from, to, || {
            let origin = self.load_group(from)?;
            let destination = self.load_group(to)?;

            let mut items = origin.items;
            items.extend(destination.items);
            let mut edges = origin.edges;
            for edge in destination.edges {
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }

            let outcome = move_item_across_groups(item, from, to, &items, &edges)?;
            let mut updates = outcome.origin_updates.clone();
            updates.extend(outcome.destination_updates.iter().copied());
            self.persist(&ChangeSet {
                updates,
                reassignments: vec![(item, to)],
                added_edges: outcome.bridged_edges.clone(),
                removed_edges: outcome.dropped_edges.clone(),
            })?;
            Ok(outcome)
        })
    }

    /// Re-chain `group` in `order`.
    ///
    /// # Errors
    ///
    /// Returns engine errors, e.g. when the group's dependencies branch.
    #[instrument(skip(self, order), fields(items = order.len()))]
    pub fn reorder(&self, group: GroupId, order: &[ItemId]) -> Result<ReorderOutcome> {
        self.with_group(group, || {
            let snapshot = self.load_group(group)?;
            let outcome = reorder_group_as_chain(group, order, &snapshot.items, &snapshot.edges)?;
            self.persist(&ChangeSet {
                updates: outcome.all_updates(),
                added_edges: outcome.new_edges.clone(),
                removed_edges: outcome.removed_edges.clone(),
                ..ChangeSet::default()
            })?;
            Ok(outcome)
        })
    }

    /// Expand items to fit their team tracks, reflow and persist.
    ///
    /// # Errors
    ///
    /// Returns engine errors, e.g. for zero overlay durations.
    #[instrument(skip(self))]
    pub fn sync_team_overlays(&self, group: GroupId) -> Result<TeamOverlayReflow> {
        self.with_group(group, || {
            let snapshot = self.load_group(group)?;
            let overlays = self.store.load_overlays(&snapshot.ids())?;
            let result =
                compute_team_overlay_reflow(&snapshot.items, &snapshot.internal_edges(), &overlays)?;
            self.persist(&ChangeSet::with_updates(result.merged_updates()))?;
            Ok(result)
        })
    }

    /// One team's independent schedule for `group`. Read-only.
    ///
    /// # Errors
    ///
    /// Returns store and engine errors.
    pub fn team_schedule(&self, group: GroupId, team: TeamId) -> Result<Vec<TeamTrack>> {
        let snapshot = self.load_group(group)?;
        let overlays = self.store.load_overlays(&snapshot.ids())?;
        Ok(reflow_for_team(
            &snapshot.items,
            &snapshot.internal_edges(),
            &overlays,
            team,
        )?)
    }

    /// Display order for `group`. Read-only.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn topological_order(&self, group: GroupId) -> Result<Vec<ItemId>> {
        let snapshot = self.load_group(group)?;
        Ok(topological_order(&snapshot.items, &snapshot.internal_edges()))
    }
}
