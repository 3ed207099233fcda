//! Command execution against a snapshot file.

use crate::cli::{Commands, SnapshotArgs};
use chrono::NaiveDate;
use miette::IntoDiagnostic;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};
use waymark_planner::{InMemoryStore, Planner, PlannerError, Snapshot};
use waymark_reflow::{
    Edge, Error, GroupId, ItemId, ItemOverride, ItemUpdate, TeamId, TeamOverlayReflow,
    TeamTrack, edges_within, ensure_edge_allowed,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EdgeCheck {
    predecessor: ItemId,
    successor: ItemId,
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupOverlays {
    group_id: GroupId,
    #[serde(flatten)]
    reflow: TeamOverlayReflow,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupOrder {
    group_id: GroupId,
    items: Vec<ItemId>,
}

/// Write `value` to stdout as pretty JSON.
fn emit<T: Serialize>(value: &T) -> miette::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).into_diagnostic()?;
    writeln!(out).into_diagnostic()?;
    Ok(())
}

fn groups(snapshot: &Snapshot) -> BTreeSet<GroupId> {
    snapshot.items.iter().map(|item| item.group_id).collect()
}

fn group_of(snapshot: &Snapshot, item: ItemId) -> miette::Result<GroupId> {
    snapshot
        .items
        .iter()
        .find(|candidate| candidate.id == item)
        .map(|found| found.group_id)
        .ok_or_else(|| Error::UnknownItem { item }.into())
}

/// Loaded snapshot wrapped in a planner.
struct Session {
    snapshot: Snapshot,
    planner: Planner<InMemoryStore>,
}

impl Session {
    fn open(path: &Path) -> miette::Result<Self> {
        let snapshot = Snapshot::load(path)?;
        info!(
            path = %path.display(),
            items = snapshot.items.len(),
            edges = snapshot.edges.len(),
            overlays = snapshot.overlays.len(),
            "Loaded snapshot"
        );
        let planner = Planner::new(InMemoryStore::from_snapshot(snapshot.clone()));
        Ok(Self { snapshot, planner })
    }

    fn finish(self, target: &SnapshotArgs) -> miette::Result<()> {
        if target.write {
            self.planner.store().snapshot()?.save(&target.snapshot)?;
            info!(path = %target.snapshot.display(), "Wrote snapshot");
        }
        Ok(())
    }
}

/// Run one CLI command.
#[instrument(name = "waymark_execute", skip(command))]
pub fn execute(command: Commands) -> miette::Result<()> {
    match command {
        Commands::Reflow {
            target,
            set_start,
            set_duration,
        } => reflow(&target, &set_start, &set_duration),
        Commands::CheckEdge {
            snapshot,
            predecessor,
            successor,
        } => check_edge(&snapshot, ItemId::new(predecessor), ItemId::new(successor)),
        Commands::Overlays { target, team } => overlays(&target, team),
        Commands::Move { target, item, to } => move_item(&target, ItemId::new(item), GroupId::new(to)),
        Commands::Reorder {
            target,
            group,
            order,
        } => reorder(&target, GroupId::new(group), &order),
        Commands::Order { snapshot, group } => order(&snapshot, group),
    }
}

fn reflow(
    target: &SnapshotArgs,
    set_start: &[(u64, NaiveDate)],
    set_duration: &[(u64, u32)],
) -> miette::Result<()> {
    let session = Session::open(&target.snapshot)?;

    let overrides = set_start
        .iter()
        .map(|&(id, start)| ItemOverride::start(ItemId::new(id), start))
        .chain(
            set_duration
                .iter()
                .map(|&(id, days)| ItemOverride::duration(ItemId::new(id), days)),
        );
    let mut by_group: BTreeMap<GroupId, Vec<ItemOverride>> =
        groups(&session.snapshot).into_iter().map(|g| (g, Vec::new())).collect();
    for item_override in overrides {
        let group = group_of(&session.snapshot, item_override.id)?;
        by_group.entry(group).or_default().push(item_override);
    }

    let mut updates: Vec<ItemUpdate> = Vec::new();
    for (group, overrides) in &by_group {
        updates.extend(session.planner.edit_items(*group, overrides)?);
    }

    emit(&updates)?;
    session.finish(target)
}

/// Report whether `predecessor -> successor` could be added, and why not.
fn check_edge(path: &Path, predecessor: ItemId, successor: ItemId) -> miette::Result<()> {
    let snapshot = Snapshot::load(path)?;
    let group = group_of(&snapshot, predecessor)?;

    let verdict = if group_of(&snapshot, successor)? == group {
        let members = snapshot.group_items(group);
        ensure_edge_allowed(
            Edge::new(predecessor, successor),
            &edges_within(&members, &snapshot.edges),
        )
        .map_err(PlannerError::from)
    } else {
        Err(PlannerError::NotInGroup {
            item: successor,
            group,
        })
    };

    emit(&EdgeCheck {
        predecessor,
        successor,
        allowed: verdict.is_ok(),
        reason: verdict.err().map(|e| e.to_string()),
    })
}

fn overlays(target: &SnapshotArgs, team: Option<u64>) -> miette::Result<()> {
    let session = Session::open(&target.snapshot)?;
    let groups = groups(&session.snapshot);

    if let Some(team) = team {
        let team = TeamId::new(team);
        let mut tracks: Vec<TeamTrack> = Vec::new();
        for group in groups {
            tracks.extend(session.planner.team_schedule(group, team)?);
        }
        return emit(&tracks);
    }

    let mut reports = Vec::with_capacity(groups.len());
    for group in groups {
        let reflow = session.planner.sync_team_overlays(group)?;
        reports.push(GroupOverlays {
            group_id: group,
            reflow,
        });
    }
    emit(&reports)?;
    session.finish(target)
}

fn move_item(target: &SnapshotArgs, item: ItemId, to: GroupId) -> miette::Result<()> {
    let session = Session::open(&target.snapshot)?;
    let from = group_of(&session.snapshot, item)?;

    let outcome = session.planner.move_item(item, from, to)?;
    emit(&outcome)?;
    session.finish(target)
}

fn reorder(target: &SnapshotArgs, group: GroupId, order: &[u64]) -> miette::Result<()> {
    let session = Session::open(&target.snapshot)?;
    let order: Vec<ItemId> = order.iter().copied().map(ItemId::new).collect();

    let outcome = session.planner.reorder(group, &order)?;
    emit(&outcome)?;
    session.finish(target)
}

fn order(path: &Path, group: Option<u64>) -> miette::Result<()> {
    let session = Session::open(path)?;
    let selected = match group {
        Some(group) => BTreeSet::from([GroupId::new(group)]),
        None => groups(&session.snapshot),
    };

    let mut orders = Vec::with_capacity(selected.len());
    for group in selected {
        orders.push(GroupOrder {
            group_id: group,
            items: session.planner.topological_order(group)?,
        });
    }
    emit(&orders)
}
