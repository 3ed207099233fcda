//! Schedule data model: items, dependency edges, team overlays and the
//! update records the engine hands back to callers.

use crate::{Error, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw identifier.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a schedulable item.
    ItemId,
    "item"
);
opaque_id!(
    /// Identifier of a group (project) of items.
    GroupId,
    "group"
);
opaque_id!(
    /// Identifier of a team that overlays its own durations.
    TeamId,
    "team"
);

/// Normalize a timestamp to its calendar day.
#[must_use]
pub fn to_day(timestamp: DateTime<Utc>) -> NaiveDate {
    timestamp.date_naive()
}

/// Inclusive end date of a span of `duration` days beginning on `start`.
///
/// Returns `None` for a zero duration or when the end falls outside the
/// calendar range.
#[must_use]
pub fn end_date_for(start: NaiveDate, duration: u32) -> Option<NaiveDate> {
    let extra = duration.checked_sub(1)?;
    start.checked_add_days(Days::new(u64::from(extra)))
}

/// A schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Item identifier.
    pub id: ItemId,
    /// Group the item belongs to.
    pub group_id: GroupId,
    /// First working day.
    pub start_date: NaiveDate,
    /// Last working day, `start_date + duration - 1`.
    pub end_date: NaiveDate,
    /// Length in whole days, inclusive.
    pub duration: u32,
    /// Explicit sort key used to break ordering ties.
    #[serde(default)]
    pub rank: i64,
}

impl Item {
    /// Create an item whose end date is derived from its start and duration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDuration`] for a zero duration and
    /// [`Error::DateOutOfRange`] when the end date is not representable.
    pub fn new(id: ItemId, group_id: GroupId, start_date: NaiveDate, duration: u32) -> Result<Self> {
        if duration == 0 {
            return Err(Error::InvalidDuration { item: id, duration });
        }
        let end_date = end_date_for(start_date, duration).ok_or(Error::DateOutOfRange { item: id })?;
        Ok(Self {
            id,
            group_id,
            start_date,
            end_date,
            duration,
            rank: 0,
        })
    }

    /// Create an item from a timestamp, dropping its time of day.
    ///
    /// # Errors
    ///
    /// Same as [`Item::new`].
    pub fn from_timestamp(
        id: ItemId,
        group_id: GroupId,
        start: DateTime<Utc>,
        duration: u32,
    ) -> Result<Self> {
        Self::new(id, group_id, to_day(start), duration)
    }

    /// Set the explicit sort key.
    #[must_use]
    pub const fn with_rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    /// Whether the stored end date agrees with start and duration.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        end_date_for(self.start_date, self.duration) == Some(self.end_date)
    }

    /// Overwrite dates and duration from an engine update.
    pub fn apply(&mut self, update: &ItemUpdate) {
        self.start_date = update.start_date;
        self.end_date = update.end_date;
        self.duration = update.duration;
    }
}

/// Finish-to-start dependency: `successor` starts after `predecessor` ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Item that must finish first.
    pub predecessor: ItemId,
    /// Item that waits.
    pub successor: ItemId,
}

impl Edge {
    /// Create an edge `predecessor -> successor`.
    #[must_use]
    pub const fn new(predecessor: ItemId, successor: ItemId) -> Self {
        Self {
            predecessor,
            successor,
        }
    }

    /// Whether either endpoint is `item`.
    #[must_use]
    pub fn touches(&self, item: ItemId) -> bool {
        self.predecessor == item || self.successor == item
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.predecessor, self.successor)
    }
}

/// A team's own duration estimate for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOverlay {
    /// Parent item.
    pub item_id: ItemId,
    /// Team owning this track.
    pub team_id: TeamId,
    /// Team duration in whole days.
    pub duration: u32,
}

impl TeamOverlay {
    /// Create an overlay.
    #[must_use]
    pub const fn new(item_id: ItemId, team_id: TeamId, duration: u32) -> Self {
        Self {
            item_id,
            team_id,
            duration,
        }
    }
}

/// Partial edit applied to an item before a reflow runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOverride {
    /// Target item.
    pub id: ItemId,
    /// New start date, if moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// New duration, if resized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl ItemOverride {
    /// Override only the start date.
    #[must_use]
    pub const fn start(id: ItemId, start_date: NaiveDate) -> Self {
        Self {
            id,
            start_date: Some(start_date),
            duration: None,
        }
    }

    /// Override only the duration.
    #[must_use]
    pub const fn duration(id: ItemId, duration: u32) -> Self {
        Self {
            id,
            start_date: None,
            duration: Some(duration),
        }
    }

    /// Also override the duration.
    #[must_use]
    pub const fn with_duration(mut self, duration: u32) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Fold a later override for the same item into this one.
    pub fn merge(&mut self, later: &Self) {
        if later.start_date.is_some() {
            self.start_date = later.start_date;
        }
        if later.duration.is_some() {
            self.duration = later.duration;
        }
    }
}

/// New dates computed for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    /// Updated item.
    pub id: ItemId,
    /// New start date.
    pub start_date: NaiveDate,
    /// New end date.
    pub end_date: NaiveDate,
    /// Duration the dates were computed with.
    pub duration: u32,
}

/// Return a copy of `items` with `updates` applied by id.
#[must_use]
pub fn apply_updates(items: &[Item], updates: &[ItemUpdate]) -> Vec<Item> {
    let by_id: HashMap<ItemId, &ItemUpdate> = updates.iter().map(|u| (u.id, u)).collect();
    items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            if let Some(update) = by_id.get(&item.id) {
                item.apply(update);
            }
            item
        })
        .collect()
}
