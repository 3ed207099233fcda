//! Persistence boundary.
//!
//! The engine never talks to storage. A [`ScheduleStore`] supplies
//! snapshots by group and accepts a [`ChangeSet`] that it must apply
//! atomically. [`InMemoryStore`] is the reference implementation.

use crate::{PlannerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use waymark_reflow::{Edge, GroupId, Item, ItemId, ItemUpdate, TeamOverlay};

/// Items, edges and overlays of any number of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Items.
    #[serde(default)]
    pub items: Vec<Item>,
    /// Dependencies.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Team overlays.
    #[serde(default)]
    pub overlays: Vec<TeamOverlay>,
}

impl Snapshot {
    /// Read a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PlannerError::io(e, path, "read"))?;
        serde_json::from_str(&content).map_err(|source| PlannerError::Snapshot {
            source,
            path: path.into(),
        })
    }

    /// Write the snapshot as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|source| PlannerError::Snapshot {
            source,
            path: path.into(),
        })?;
        std::fs::write(path, content).map_err(|e| PlannerError::io(e, path, "write"))
    }

    /// Items of one group, in snapshot order.
    #[must_use]
    pub fn group_items(&self, group: GroupId) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| item.group_id == group)
            .cloned()
            .collect()
    }
}

/// Everything one edit cycle persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// New dates and durations.
    pub updates: Vec<ItemUpdate>,
    /// Items changing group.
    pub reassignments: Vec<(ItemId, GroupId)>,
    /// Dependencies to insert.
    pub added_edges: Vec<Edge>,
    /// Dependencies to delete.
    pub removed_edges: Vec<Edge>,
}

impl ChangeSet {
    /// A change set holding only date updates.
    #[must_use]
    pub fn with_updates(updates: Vec<ItemUpdate>) -> Self {
        Self {
            updates,
            ..Self::default()
        }
    }

    /// Whether there is nothing to persist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
            && self.reassignments.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }
}

/// Storage the planner loads snapshots from and persists results to.
pub trait ScheduleStore {
    /// Items of one group.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] when the backend fails.
    fn load_items(&self, group: GroupId) -> Result<Vec<Item>>;

    /// Dependencies with at least one endpoint in `items`.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] when the backend fails.
    fn load_edges(&self, items: &[ItemId]) -> Result<Vec<Edge>>;

    /// Team overlays on `items`.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] when the backend fails.
    fn load_overlays(&self, items: &[ItemId]) -> Result<Vec<TeamOverlay>>;

    /// Apply every change in `changes`, or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] when the change set cannot be applied.
    fn apply(&self, changes: &ChangeSet) -> Result<()>;
}

/// A [`ScheduleStore`] kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<Snapshot>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Copy of the current contents.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if the store's lock is poisoned.
    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(self.lock()?.clone())
    }

    /// Insert an item.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if an item with the same id exists.
    pub fn insert_item(&self, item: Item) -> Result<()> {
        let mut state = self.lock()?;
        if state.items.iter().any(|existing| existing.id == item.id) {
            return Err(PlannerError::store(format!("{} already exists", item.id)));
        }
        state.items.push(item);
        Ok(())
    }

    /// Insert a team overlay, replacing the team's previous one on the item.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Store`] if the store's lock is poisoned.
    pub fn upsert_overlay(&self, overlay: TeamOverlay) -> Result<()> {
        let mut state = self.lock()?;
        state
            .overlays
            .retain(|o| !(o.item_id == overlay.item_id && o.team_id == overlay.team_id));
        state.overlays.push(overlay);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Snapshot>> {
        self.state
            .lock()
            .map_err(|_| PlannerError::store("in-memory store lock poisoned"))
    }
}

fn validate(state: &Snapshot, changes: &ChangeSet) -> Result<()> {
    let ids: HashSet<ItemId> = state.items.iter().map(|item| item.id).collect();
    let referenced = changes
        .updates
        .iter()
        .map(|u| u.id)
        .chain(changes.reassignments.iter().map(|(id, _)| *id))
        .chain(
            changes
                .added_edges
                .iter()
                .flat_map(|e| [e.predecessor, e.successor]),
        );
    for id in referenced {
        if !ids.contains(&id) {
            return Err(PlannerError::store(format!("{id} does not exist")));
        }
    }
    for edge in &changes.removed_edges {
        if !state.edges.contains(edge) {
            return Err(PlannerError::store(format!("dependency {edge} does not exist")));
        }
    }
    for edge in &changes.added_edges {
        if state.edges.contains(edge) && !changes.removed_edges.contains(edge) {
            return Err(PlannerError::store(format!("dependency {edge} already exists")));
        }
    }
    Ok(())
}

impl ScheduleStore for InMemoryStore {
    fn load_items(&self, group: GroupId) -> Result<Vec<Item>> {
        Ok(self.lock()?.group_items(group))
    }

    fn load_edges(&self, items: &[ItemId]) -> Result<Vec<Edge>> {
        let ids: HashSet<&ItemId> = items.iter().collect();
        Ok(self
            .lock()?
            .edges
            .iter()
            .filter(|edge| ids.contains(&edge.predecessor) || ids.contains(&edge.successor))
            .copied()
            .collect())
    }

    fn load_overlays(&self, items: &[ItemId]) -> Result<Vec<TeamOverlay>> {
        let ids: HashSet<&ItemId> = items.iter().collect();
        Ok(self
            .lock()?
            .overlays
            .iter()
            .filter(|overlay| ids.contains(&overlay.item_id))
            .copied()
            .collect())
    }

    fn apply(&self, changes: &ChangeSet) -> Result<()> {
        let mut state = self.lock()?;
        validate(&state, changes)?;

        state.edges.retain(|edge| !changes.removed_edges.contains(edge));
        state.edges.extend(changes.added_edges.iter().copied());
        for item in &mut state.items {
            if let Some(update) = changes.updates.iter().rev().find(|u| u.id == item.id) {
                item.apply(update);
            }
            if let Some((_, group)) = changes.reassignments.iter().rev().find(|(id, _)| *id == item.id) {
                item.group_id = *group;
            }
        }

        debug!(
            updates = changes.updates.len(),
            reassignments = changes.reassignments.len(),
            added = changes.added_edges.len(),
            removed = changes.removed_edges.len(),
            "Applied change set"
        );
        Ok(())
    }
}
