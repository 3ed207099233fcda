//! Property-based tests for schedule reflow invariants.
//!
//! These tests verify the behavioral contracts of the engine:
//! - Reflow is idempotent and reports only changed items
//! - Successors start the day after their latest predecessor ends
//! - Roots never move without an override
//! - Cycle detection agrees with graph reachability
//! - Display ordering respects dependencies and is deterministic

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use waymark_reflow::{
    Edge, GroupId, Item, ItemId, ScheduleGraph, apply_updates, reflow, topological_order,
    would_create_cycle,
};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

/// Generate items with random start offsets, durations and ranks.
fn items_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<Item>> {
    proptest::collection::vec((0_u64..60, 1_u32..15, -3_i64..3), min..=max).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (offset, duration, rank))| {
                let start = base_date().checked_add_days(Days::new(offset)).unwrap();
                Item::new(ItemId::new(i as u64), GroupId::new(1), start, duration)
                    .unwrap()
                    .with_rank(rank)
            })
            .collect()
    })
}

/// Generate a project whose edges only point from lower to higher indices,
/// which guarantees the graph is acyclic.
fn dag_strategy(min: usize, max: usize) -> impl Strategy<Value = (Vec<Item>, Vec<Edge>)> {
    items_strategy(min, max).prop_flat_map(|items| {
        let n = items.len();
        let pairs = proptest::collection::vec((0..n, 0..n), 0..=n * 2);
        (Just(items), pairs).prop_map(|(items, pairs)| {
            let mut seen = HashSet::new();
            let edges = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.min(b), a.max(b)))
                .filter(|pair| seen.insert(*pair))
                .map(|(a, b)| Edge::new(items[a].id, items[b].id))
                .collect();
            (items, edges)
        })
    })
}

fn by_id(items: &[Item]) -> HashMap<ItemId, &Item> {
    items.iter().map(|item| (item.id, item)).collect()
}

// =============================================================================
// Property Tests: Reflow
// =============================================================================

proptest! {
    /// Contract: A second reflow over the first reflow's output changes nothing.
    #[test]
    fn reflow_is_idempotent((items, edges) in dag_strategy(1, 25)) {
        let first = reflow(&items, &edges, &[]).expect("reflow should succeed on a DAG");
        let settled = apply_updates(&items, &first);
        let second = reflow(&settled, &edges, &[]).expect("second reflow should succeed");

        prop_assert!(second.is_empty(), "second reflow produced {:?}", second);
    }

    /// Contract: Every item with predecessors starts the day after the latest one ends.
    #[test]
    fn successors_start_after_latest_predecessor((items, edges) in dag_strategy(2, 25)) {
        let settled = apply_updates(&items, &reflow(&items, &edges, &[]).unwrap());
        let lookup = by_id(&settled);
        let graph = ScheduleGraph::build(&settled, &edges);

        for item in &settled {
            let latest = graph.predecessors(item.id).map(|p| lookup[&p].end_date).max();
            if let Some(latest) = latest {
                prop_assert_eq!(item.start_date, latest.succ_opt().unwrap());
            }
            prop_assert!(item.is_consistent(), "{} has inconsistent dates", item.id);
        }

        for edge in &edges {
            prop_assert!(lookup[&edge.successor].start_date > lookup[&edge.predecessor].end_date);
        }
    }

    /// Contract: Items without predecessors keep their start date.
    #[test]
    fn roots_are_stable((items, edges) in dag_strategy(1, 25)) {
        let updates = reflow(&items, &edges, &[]).unwrap();
        let graph = ScheduleGraph::build(&items, &edges);
        let roots: HashSet<ItemId> = graph.roots().collect();

        for update in &updates {
            prop_assert!(!roots.contains(&update.id), "root {} was moved", update.id);
        }
    }

    /// Contract: Reported items always differ from their input dates.
    #[test]
    fn reflow_reports_minimal_diff((items, edges) in dag_strategy(1, 25)) {
        let updates = reflow(&items, &edges, &[]).unwrap();
        let lookup = by_id(&items);
        let mut seen = HashSet::new();

        for update in &updates {
            let before = lookup[&update.id];
            prop_assert!(
                before.start_date != update.start_date || before.end_date != update.end_date,
                "{} reported without a change", update.id
            );
            prop_assert!(seen.insert(update.id), "{} reported twice", update.id);
        }
    }
}

// =============================================================================
// Property Tests: Cycle Detection
// =============================================================================

proptest! {
    /// Contract: An edge pointing back along an existing path is a cycle.
    #[test]
    fn back_edges_are_cycles((items, edges) in dag_strategy(2, 20)) {
        let graph = ScheduleGraph::build(&items, &edges);
        for a in &items {
            for b in &items {
                // Proposed edge a -> b closes a cycle exactly when b reaches a.
                prop_assert_eq!(
                    would_create_cycle(b.id, a.id, &edges),
                    graph.reaches(b.id, a.id)
                );
            }
        }
    }

    /// Contract: Forward edges in an index-ordered DAG never close a cycle.
    #[test]
    fn forward_edges_are_never_cycles((items, edges) in dag_strategy(2, 20)) {
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                prop_assert!(!would_create_cycle(b.id, a.id, &edges));
            }
        }
    }
}

// =============================================================================
// Property Tests: Ordering
// =============================================================================

proptest! {
    /// Contract: Every predecessor precedes its successors, and every item appears once.
    #[test]
    fn order_respects_dependencies((items, edges) in dag_strategy(1, 25)) {
        let order = topological_order(&items, &edges);
        prop_assert_eq!(order.len(), items.len());

        let position: HashMap<ItemId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        prop_assert_eq!(position.len(), items.len());
        for edge in &edges {
            prop_assert!(position[&edge.predecessor] < position[&edge.successor]);
        }
    }

    /// Contract: Ordering is independent of input order.
    #[test]
    fn order_is_deterministic((items, edges) in dag_strategy(1, 20)) {
        let mut reversed = items.clone();
        reversed.reverse();

        prop_assert_eq!(
            topological_order(&items, &edges),
            topological_order(&reversed, &edges)
        );
    }
}
