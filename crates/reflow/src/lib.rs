//! Dependency-driven schedule reflow for waymark.
//!
//! This crate keeps milestone schedules tight: every item starts on the day
//! after its latest finish-to-start predecessor ends, and items without
//! predecessors stay where the user put them. All operations are pure
//! functions over a snapshot of one group's items and edges; they return the
//! minimal set of changes for the caller to persist.
//!
//! # Key Operations
//!
//! - [`reflow`]: recompute dates after an edit, returning only changed items
//! - [`would_create_cycle`]: reachability check before accepting an edge
//! - [`compute_team_overlay_reflow`]: expand parents to fit team tracks
//! - [`move_item_across_groups`]: cut an item out of its chain and bridge it
//! - [`reorder_group_as_chain`]: impose an explicit order on a group
//! - [`topological_order`]: stable ordering for display
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use waymark_reflow::{Edge, GroupId, Item, ItemId, reflow};
//!
//! let jan = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
//! let group = GroupId::new(1);
//! let design = Item::new(ItemId::new(1), group, jan(1), 3)?;
//! let build = Item::new(ItemId::new(2), group, jan(1), 5)?;
//!
//! let updates = reflow(&[design, build], &[Edge::new(ItemId::new(1), ItemId::new(2))], &[])?;
//! assert_eq!(updates[0].start_date, jan(4));
//! assert_eq!(updates[0].end_date, jan(8));
//! # Ok::<(), waymark_reflow::Error>(())
//! ```

mod cycle;
mod error;
mod graph;
mod model;
mod mutation;
mod order;
mod overlay;
mod reflow;

pub use cycle::{ensure_edge_allowed, would_create_cycle};
pub use error::{BranchKind, Error, Result};
pub use graph::ScheduleGraph;
pub use model::{
    Edge, GroupId, Item, ItemId, ItemOverride, ItemUpdate, TeamId, TeamOverlay, apply_updates,
    end_date_for, to_day,
};
pub use mutation::{
    DependencyEdit, MoveOutcome, ReorderOutcome, add_dependency, edges_within,
    move_item_across_groups, remove_dependency, reorder_group_as_chain,
};
pub use order::topological_order;
pub use overlay::{
    DurationExpansion, TeamOverlayReflow, TeamTrack, compute_team_overlay_reflow,
    derive_overlay_dates, expand_durations, reflow_for_team, teams,
};
pub use reflow::{apply_bulk_edit, reflow};
