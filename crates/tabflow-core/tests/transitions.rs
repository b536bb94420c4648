//! Transition Matcher Tests
//!
//! Row partitioning and placement between consecutive steps.

mod common;

use common::{groupby_bundle, step, table};
use tabflow_core::config::Geometry;
use tabflow_core::{plan_transition, LayoutEngine, Phase, Point, TransitionPolicy};

fn engine() -> LayoutEngine {
    LayoutEngine::new(Geometry::default())
}

/// The first render has nothing to match against: every row enters in place.
#[test]
fn first_render_enters_every_row() {
    let bundle = groupby_bundle();
    let plan = plan_transition(None, &bundle.steps[0], &mut engine()).unwrap();

    assert_eq!(plan.policy, TransitionPolicy::Default);
    assert_eq!(plan.entering.len(), 6);
    assert!(plan.continuing.is_empty() && plan.exiting.is_empty());
    for row in &plan.entering {
        assert_eq!(row.start, row.target);
    }
}

/// Matching a step against itself keeps every row.
#[test]
fn self_transition_is_identity() {
    let bundle = groupby_bundle();
    for s in &bundle.steps {
        let plan = plan_transition(Some(s), s, &mut engine()).unwrap();
        assert!(plan.is_identity(), "step '{}' should match itself", s.title);
        assert_eq!(plan.continuing.len(), s.table.rows.len());
        for row in &plan.continuing {
            assert_eq!(row.from, row.to);
        }
    }
}

/// Initial -> Grouping: all six rows continue into their clusters and the key
/// column is highlighted.
#[test]
fn grouping_moves_rows_into_clusters() {
    let bundle = groupby_bundle();
    let plan = plan_transition(Some(&bundle.steps[0]), &bundle.steps[1], &mut engine()).unwrap();

    assert_eq!(plan.policy, TransitionPolicy::Grouping);
    assert_eq!(plan.highlight_column, Some(1));
    assert_eq!(plan.continuing.len(), 6);
    assert!(plan.entering.is_empty() && plan.exiting.is_empty());

    let id3 = plan.continuing.iter().find(|r| r.key == "3").unwrap();
    assert_eq!((id3.from_row, id3.to_row), (2, 1));
    assert_eq!(id3.from, Point::new(0.0, 95.0));
    assert_eq!(id3.to, Point::new(0.0, 65.0));

    let id4 = plan.continuing.iter().find(|r| r.key == "4").unwrap();
    assert_eq!(id4.to, Point::new(0.0, 225.0));
}

/// Grouping -> Aggregation: raw rows collapse into their group centroid and the
/// aggregate rows expand out of the centroid of their source group.
#[test]
fn aggregation_collapses_into_centroids() {
    let bundle = groupby_bundle();
    let plan = plan_transition(Some(&bundle.steps[1]), &bundle.steps[2], &mut engine()).unwrap();

    assert_eq!(plan.policy, TransitionPolicy::Collapse);
    assert_eq!(plan.highlight_column, None);
    assert!(plan.continuing.is_empty());
    assert_eq!(plan.exiting.len(), 6);
    assert_eq!(plan.entering.len(), 3);

    for exit in &plan.exiting {
        let expected = match exit.collapse_into.as_deref() {
            Some("A") => 65.0,
            Some("B") => 160.0,
            Some("C") => 225.0,
            other => panic!("unexpected group {:?}", other),
        };
        assert_eq!(exit.target.y, expected, "row {:?}", exit.key);
    }

    let starts: Vec<(Option<&str>, f32, f32)> = plan
        .entering
        .iter()
        .map(|r| (r.source_group.as_deref(), r.start.y, r.target.y))
        .collect();
    assert_eq!(
        starts,
        vec![
            (Some("A"), 65.0, 35.0),
            (Some("B"), 160.0, 65.0),
            (Some("C"), 225.0, 95.0)
        ]
    );
}

/// Aggregation -> Final: identical tables, nothing moves.
#[test]
fn final_step_after_aggregation_continues() {
    let bundle = groupby_bundle();
    let plan = plan_transition(Some(&bundle.steps[2]), &bundle.steps[3], &mut engine()).unwrap();
    assert_eq!(plan.policy, TransitionPolicy::Default);
    assert!(plan.is_identity());
    assert_eq!(plan.continuing.len(), 3);
}

/// Aggregation without a preceding grouping step uses the default policy.
#[test]
fn aggregation_without_grouping_fades() {
    let bundle = groupby_bundle();
    let plan = plan_transition(Some(&bundle.steps[0]), &bundle.steps[2], &mut engine()).unwrap();
    assert_eq!(plan.policy, TransitionPolicy::Default);
    for exit in &plan.exiting {
        assert_eq!(exit.collapse_into, None);
        assert_eq!(exit.target, exit.from);
    }
    for row in &plan.entering {
        assert_eq!(row.start, row.target);
    }
}

/// Only the first occurrence of a duplicated key is matched.
#[test]
fn duplicate_keys_match_first_occurrence_only() {
    let previous = step("Initial", table(&["K"], &[&["x"], &["x"], &["y"]]));
    let next = step("Sorted", table(&["K"], &[&["x"], &["y"], &["x"]]));
    let plan = plan_transition(Some(&previous), &next, &mut engine()).unwrap();

    let pairs: Vec<(usize, usize)> = plan
        .continuing
        .iter()
        .map(|r| (r.from_row, r.to_row))
        .collect();
    assert_eq!(pairs, vec![(0, 0), (2, 1)]);
    assert_eq!(plan.entering.len(), 1);
    assert_eq!(plan.entering[0].row, 2);
    assert_eq!(plan.exiting.len(), 1);
    assert_eq!(plan.exiting[0].row, 1);
}

/// An explicit phase overrides the title.
#[test]
fn phase_tag_overrides_title() {
    let bundle = groupby_bundle();
    let mut next = bundle.steps[1].clone();
    next.title = "Step 2".into();
    next.phase = Some(Phase::Grouping);
    let plan = plan_transition(Some(&bundle.steps[0]), &next, &mut engine()).unwrap();
    assert_eq!(plan.policy, TransitionPolicy::Grouping);

    next.title = "Grouping".into();
    next.phase = Some(Phase::Final);
    let plan = plan_transition(Some(&bundle.steps[0]), &next, &mut engine()).unwrap();
    assert_eq!(plan.policy, TransitionPolicy::Default);
}
