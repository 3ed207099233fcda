//! Edit cycles for waymark schedules.
//!
//! The reflow engine is pure: it takes a snapshot and returns changes. This
//! crate wraps it in load, compute and persist cycles against a
//! [`ScheduleStore`], serialized per group so concurrent edits never
//! overwrite each other with stale dates.
//!
//! ```
//! use chrono::NaiveDate;
//! use waymark_planner::{InMemoryStore, Planner};
//! use waymark_reflow::{Edge, GroupId, Item, ItemId};
//!
//! let jan = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
//! let group = GroupId::new(1);
//! let store = InMemoryStore::new();
//! store.insert_item(Item::new(ItemId::new(1), group, jan(1), 3)?)?;
//! store.insert_item(Item::new(ItemId::new(2), group, jan(1), 2)?)?;
//!
//! let planner = Planner::new(store);
//! let updates = planner.add_dependency(group, Edge::new(ItemId::new(1), ItemId::new(2)))?;
//! assert_eq!(updates[0].start_date, jan(4));
//! # Ok::<(), waymark_planner::PlannerError>(())
//! ```

mod error;
mod planner;
mod store;

pub use error::{PlannerError, Result};
pub use planner::Planner;
pub use store::{ChangeSet, InMemoryStore, ScheduleStore, Snapshot};
