//! Error types for the planner crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;
use waymark_reflow::{GroupId, ItemId};

/// Result type for planner operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Errors raised while running an edit cycle.
#[derive(Error, Debug, Diagnostic)]
pub enum PlannerError {
    /// The engine rejected the edit.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] waymark_reflow::Error),

    /// The store could not load or persist data.
    #[error("Schedule store error: {message}")]
    #[diagnostic(code(waymark::planner::store))]
    Store {
        /// What went wrong.
        message: String,
    },

    /// An item addressed by the caller is not in the group.
    #[error("Item {item} is not part of {group}")]
    #[diagnostic(
        code(waymark::planner::not_in_group),
        help("Reload the group; the item may have moved")
    )]
    NotInGroup {
        /// The item.
        item: ItemId,
        /// The group that was loaded.
        group: GroupId,
    },

    /// A previous edit panicked while holding the group's lock.
    #[error("Edit lock for {group} was poisoned by a failed edit")]
    #[diagnostic(code(waymark::planner::lock_poisoned))]
    LockPoisoned {
        /// Group whose lock is unusable.
        group: GroupId,
    },

    /// I/O error while reading or writing a snapshot file.
    #[error("I/O {operation} failed: {}", path.display())]
    #[diagnostic(
        code(waymark::planner::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error
        path: Box<Path>,
        /// Operation that failed (e.g., "read", "write")
        operation: String,
    },

    /// A snapshot file is not valid JSON for the expected shape.
    #[error("Invalid snapshot {}: {source}", path.display())]
    #[diagnostic(code(waymark::planner::snapshot))]
    Snapshot {
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
        /// Snapshot path
        path: Box<Path>,
    },
}

impl PlannerError {
    /// Create a store error
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(source: std::io::Error, path: impl AsRef<Path>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.as_ref().into(),
            operation: operation.into(),
        }
    }
}
