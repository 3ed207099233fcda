//! Error types for schedule reflow operations.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use crate::{GroupId, ItemId};
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Result type for reflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of an item breaks a simple chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// The item has more than one internal predecessor.
    FanIn,
    /// The item has more than one internal successor.
    FanOut,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FanIn => f.write_str("predecessor"),
            Self::FanOut => f.write_str("successor"),
        }
    }
}

/// Errors raised by the reflow engine.
///
/// Every error is detected before any update is computed, so a failed call
/// never yields a partially applied schedule.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum Error {
    /// The proposed dependency (or bridge) would close a cycle.
    #[error("Dependency {predecessor} -> {successor} would create a circular dependency")]
    #[diagnostic(
        code(waymark::reflow::cycle),
        help("The successor already leads back to the predecessor; remove that path first")
    )]
    Cycle {
        /// Item that would have to finish first.
        predecessor: ItemId,
        /// Item that would wait on the predecessor.
        successor: ItemId,
    },

    /// The dependency is already present.
    #[error("Dependency {predecessor} -> {successor} already exists")]
    #[diagnostic(code(waymark::reflow::duplicate_edge))]
    DuplicateEdge {
        /// Predecessor of the existing edge.
        predecessor: ItemId,
        /// Successor of the existing edge.
        successor: ItemId,
    },

    /// The dependency to remove does not exist.
    #[error("Dependency {predecessor} -> {successor} does not exist")]
    #[diagnostic(code(waymark::reflow::missing_edge))]
    MissingEdge {
        /// Predecessor of the requested edge.
        predecessor: ItemId,
        /// Successor of the requested edge.
        successor: ItemId,
    },

    /// A reorder was requested over dependencies that are not a simple chain.
    #[error("Cannot reorder {group}: {item} has more than one internal {kind}")]
    #[diagnostic(
        code(waymark::reflow::branching),
        help("Reordering imposes a single chain; remove parallel branches first")
    )]
    Branching {
        /// Group being reordered.
        group: GroupId,
        /// First item found to branch.
        item: ItemId,
        /// Whether the item fans in or out.
        kind: BranchKind,
    },

    /// No root item exists to anchor the group's start date.
    #[error("Cannot determine a root anchor date for {group}")]
    #[diagnostic(code(waymark::reflow::missing_anchor))]
    MissingAnchor {
        /// Group without a root.
        group: GroupId,
    },

    /// An operation referenced an item missing from the snapshot.
    #[error("Item {item} is not part of the snapshot")]
    #[diagnostic(code(waymark::reflow::unknown_item))]
    UnknownItem {
        /// The missing item.
        item: ItemId,
    },

    /// The item does not belong to the group the caller named.
    #[error("Item {item} belongs to {actual}, not {expected}")]
    #[diagnostic(code(waymark::reflow::group_mismatch))]
    GroupMismatch {
        /// The item being moved.
        item: ItemId,
        /// Group named by the caller.
        expected: GroupId,
        /// Group the item actually belongs to.
        actual: GroupId,
    },

    /// A move names the same origin and destination group.
    #[error("Item {item} is already in {group}")]
    #[diagnostic(code(waymark::reflow::same_group))]
    SameGroup {
        /// The item being moved.
        item: ItemId,
        /// Origin and destination.
        group: GroupId,
    },

    /// A reorder list does not cover the group exactly once.
    #[error("Order for {group} is invalid: {reason}")]
    #[diagnostic(code(waymark::reflow::order_mismatch))]
    OrderMismatch {
        /// Group being reordered.
        group: GroupId,
        /// What is wrong with the list.
        reason: String,
    },

    /// Durations are whole days and at least one.
    #[error("Item {item} has invalid duration {duration}; durations are at least one day")]
    #[diagnostic(code(waymark::reflow::invalid_duration))]
    InvalidDuration {
        /// Offending item.
        item: ItemId,
        /// The rejected duration.
        duration: u32,
    },

    /// Date arithmetic left the representable calendar range.
    #[error("Dates for item {item} fall outside the supported calendar range")]
    #[diagnostic(code(waymark::reflow::date_out_of_range))]
    DateOutOfRange {
        /// Offending item.
        item: ItemId,
    },
}

impl Error {
    /// Create a cycle error for a proposed `predecessor -> successor` edge.
    #[must_use]
    pub const fn cycle(predecessor: ItemId, successor: ItemId) -> Self {
        Self::Cycle {
            predecessor,
            successor,
        }
    }

    /// Create an order mismatch error.
    #[must_use]
    pub fn order_mismatch(group: GroupId, reason: impl Into<String>) -> Self {
        Self::OrderMismatch {
            group,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_both_items() {
        let err = Error::cycle(ItemId::new(1), ItemId::new(2));
        assert_eq!(
            err.to_string(),
            "Dependency item#1 -> item#2 would create a circular dependency"
        );
    }

    #[test]
    fn test_branching_message_names_direction() {
        let err = Error::Branching {
            group: GroupId::new(7),
            item: ItemId::new(3),
            kind: BranchKind::FanOut,
        };
        assert_eq!(
            err.to_string(),
            "Cannot reorder group#7: item#3 has more than one internal successor"
        );
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = Error::MissingAnchor {
            group: GroupId::new(1),
        };
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("waymark::reflow::missing_anchor"));
    }
}
