//! Team duration overlays.
//!
//! A parent item stands for the union of every team's effort, so it must be
//! at least as long as the longest team track on it. Team tracks share the
//! parent's start date and are otherwise projections: they never move items.

use crate::reflow::{Span, reflow};
use crate::{Edge, Error, Item, ItemId, ItemUpdate, Result, TeamId, TeamOverlay, apply_updates};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// An item lengthened to contain its longest team track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationExpansion {
    /// Expanded item.
    pub item_id: ItemId,
    /// Duration before expansion.
    pub previous_duration: u32,
    /// Duration after expansion.
    pub duration: u32,
    /// Unchanged start date.
    pub start_date: NaiveDate,
    /// End date recomputed from the start.
    pub end_date: NaiveDate,
}

impl DurationExpansion {
    /// The expansion expressed as an item update.
    #[must_use]
    pub const fn as_update(&self) -> ItemUpdate {
        ItemUpdate {
            id: self.item_id,
            start_date: self.start_date,
            end_date: self.end_date,
            duration: self.duration,
        }
    }
}

/// Dates of one team's track on one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTrack {
    /// Parent item.
    pub item_id: ItemId,
    /// Team owning the track.
    pub team_id: TeamId,
    /// First day of the track.
    pub start_date: NaiveDate,
    /// Last day of the track.
    pub end_date: NaiveDate,
    /// Track duration.
    pub duration: u32,
}

/// Outcome of [`compute_team_overlay_reflow`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamOverlayReflow {
    /// Items lengthened before the reflow ran.
    pub expansions: Vec<DurationExpansion>,
    /// Items moved by the reflow cascade.
    pub updates: Vec<ItemUpdate>,
    /// Derived team track dates, one per overlay.
    pub overlay_dates: Vec<TeamTrack>,
}

impl TeamOverlayReflow {
    /// Expansions and cascade updates as one list, one entry per item.
    ///
    /// When an item was both expanded and moved, the cascade update wins; it
    /// already carries the expanded duration.
    #[must_use]
    pub fn merged_updates(&self) -> Vec<ItemUpdate> {
        let mut merged: Vec<ItemUpdate> =
            self.expansions.iter().map(DurationExpansion::as_update).collect();
        for update in &self.updates {
            match merged.iter_mut().find(|existing| existing.id == update.id) {
                Some(existing) => *existing = *update,
                None => merged.push(*update),
            }
        }
        merged
    }
}

fn validate_overlays(overlays: &[TeamOverlay]) -> Result<()> {
    for overlay in overlays {
        if overlay.duration == 0 {
            return Err(Error::InvalidDuration {
                item: overlay.item_id,
                duration: 0,
            });
        }
    }
    Ok(())
}

/// Lengthen items whose longest team overlay exceeds their own duration.
///
/// The end date is recomputed from the item's existing start. Overlays for
/// items outside `items` are ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidDuration`] for a zero overlay duration and
/// [`Error::DateOutOfRange`] when an expanded end date is not representable.
pub fn expand_durations(
    items: &[Item],
    overlays: &[TeamOverlay],
) -> Result<(Vec<Item>, Vec<DurationExpansion>)> {
    validate_overlays(overlays)?;

    let mut longest: HashMap<ItemId, u32> = HashMap::new();
    for overlay in overlays {
        let entry = longest.entry(overlay.item_id).or_default();
        *entry = (*entry).max(overlay.duration);
    }

    let mut expanded = Vec::with_capacity(items.len());
    let mut expansions = Vec::new();
    for item in items {
        let mut item = item.clone();
        if let Some(&team_max) = longest.get(&item.id)
            && team_max > item.duration
        {
            let span = Span::starting(item.id, item.start_date, team_max)?;
            expansions.push(DurationExpansion {
                item_id: item.id,
                previous_duration: item.duration,
                duration: team_max,
                start_date: span.start,
                end_date: span.end,
            });
            item.duration = span.duration;
            item.end_date = span.end;
        }
        expanded.push(item);
    }

    Ok((expanded, expansions))
}

/// Project each overlay onto its parent's (post-reflow) start date.
///
/// # Errors
///
/// Returns [`Error::InvalidDuration`] for a zero overlay duration and
/// [`Error::DateOutOfRange`] when a track end date is not representable.
pub fn derive_overlay_dates(items: &[Item], overlays: &[TeamOverlay]) -> Result<Vec<TeamTrack>> {
    validate_overlays(overlays)?;

    let starts: HashMap<ItemId, NaiveDate> =
        items.iter().map(|item| (item.id, item.start_date)).collect();
    let mut tracks = Vec::with_capacity(overlays.len());
    for overlay in overlays {
        let Some(&start) = starts.get(&overlay.item_id) else {
            warn!(
                item = %overlay.item_id,
                team = %overlay.team_id,
                "Ignoring team overlay for an item outside the snapshot"
            );
            continue;
        };
        let span = Span::starting(overlay.item_id, start, overlay.duration)?;
        tracks.push(TeamTrack {
            item_id: overlay.item_id,
            team_id: overlay.team_id,
            start_date: span.start,
            end_date: span.end,
            duration: span.duration,
        });
    }
    Ok(tracks)
}

/// Expand parents to fit their team tracks, reflow, then derive track dates.
///
/// # Errors
///
/// Propagates errors from [`expand_durations`], [`reflow`] and
/// [`derive_overlay_dates`].
pub fn compute_team_overlay_reflow(
    items: &[Item],
    edges: &[Edge],
    overlays: &[TeamOverlay],
) -> Result<TeamOverlayReflow> {
    let (expanded, expansions) = expand_durations(items, overlays)?;
    let updates = reflow(&expanded, edges, &[])?;
    let scheduled = apply_updates(&expanded, &updates);
    let overlay_dates = derive_overlay_dates(&scheduled, overlays)?;

    debug!(
        expansions = expansions.len(),
        updates = updates.len(),
        tracks = overlay_dates.len(),
        "Team overlay reflow complete"
    );

    Ok(TeamOverlayReflow {
        expansions,
        updates,
        overlay_dates,
    })
}

/// Teams that have at least one overlay, in first-seen order.
#[must_use]
pub fn teams(overlays: &[TeamOverlay]) -> Vec<TeamId> {
    let mut seen = HashSet::new();
    overlays
        .iter()
        .map(|overlay| overlay.team_id)
        .filter(|team| seen.insert(*team))
        .collect()
}

/// A full schedule for one team, cascading that team's durations alone.
///
/// Every item takes the team's overlay duration, or its own duration where
/// the team has none, and the reflow runs over the same dependencies. The
/// result covers every item in input order and leaves the parent schedule
/// and other teams untouched.
///
/// # Errors
///
/// Propagates errors from [`reflow`].
pub fn reflow_for_team(
    items: &[Item],
    edges: &[Edge],
    overlays: &[TeamOverlay],
    team: TeamId,
) -> Result<Vec<TeamTrack>> {
    validate_overlays(overlays)?;

    let team_durations: HashMap<ItemId, u32> = overlays
        .iter()
        .filter(|overlay| overlay.team_id == team)
        .map(|overlay| (overlay.item_id, overlay.duration))
        .collect();

    let substituted = items
        .iter()
        .map(|item| {
            let duration = team_durations.get(&item.id).copied().unwrap_or(item.duration);
            let span = Span::starting(item.id, item.start_date, duration)?;
            let mut item = item.clone();
            item.duration = span.duration;
            item.end_date = span.end;
            Ok(item)
        })
        .collect::<Result<Vec<_>>>()?;

    let updates = reflow(&substituted, edges, &[])?;
    let scheduled = apply_updates(&substituted, &updates);

    debug!(%team, moved = updates.len(), "Per-team reflow complete");

    Ok(scheduled
        .into_iter()
        .map(|item| TeamTrack {
            item_id: item.id,
            team_id: team,
            start_date: item.start_date,
            end_date: item.end_date,
            duration: item.duration,
        })
        .collect())
}
