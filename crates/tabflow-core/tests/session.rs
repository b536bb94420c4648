//! Session Tests
//!
//! Loading bundles, request tokens and host-driven playback.

mod common;

use common::{groupby_bundle, step, table};
use tabflow_core::surface::AnimatableSurface;
use tabflow_core::{
    ElementId, ExplanationBundle, Stage, JsonFileService, ServiceError, Session, SessionError,
    SessionFailure, SessionStatus, StaticService, TransitionPolicy, VisualizerConfig,
};

fn session() -> Session {
    common::init_tracing();
    Session::new(VisualizerConfig::default(), 800.0, 500.0)
}

const EPS: f32 = 1e-3;

fn moving_rows(stage: &Stage) -> usize {
    stage
        .ids()
        .iter()
        .filter(|id| matches!(id, ElementId::Row(_)))
        .filter_map(|id| stage.element(id))
        .filter(|e| {
            let (now, target) = (e.state().position, e.target_state().position);
            (now.x - target.x).abs() > EPS || (now.y - target.y).abs() > EPS
        })
        .count()
}

fn single_step_bundle(title: &str) -> ExplanationBundle {
    ExplanationBundle {
        overall_summary: title.to_string(),
        steps: vec![step(title, table(&["ID"], &[&["1"]]))],
    }
}

/// Loading shows the first step with the cursor at `{0, false}`.
#[test]
fn load_shows_first_step() {
    let mut s = session();
    assert_eq!(s.status(), &SessionStatus::Idle);
    s.load(groupby_bundle()).unwrap();

    assert_eq!(s.status(), &SessionStatus::Ready);
    assert_eq!(s.cursor().index, 0);
    assert!(!s.cursor().playing);
    assert_eq!(s.current_step().unwrap().title, "Initial Data");
    assert!(s.stage().contains(&ElementId::Title));
    assert_eq!(s.last_report().unwrap().entering, 6);
}

/// A malformed bundle is reported and the previous one stays loaded.
#[test]
fn malformed_bundle_keeps_previous() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();
    s.next(0.0).unwrap();

    let mut broken = groupby_bundle();
    broken.steps[0].table.rows[0].pop();
    let err = s.load(broken).unwrap_err();
    assert!(matches!(err, SessionError::Bundle(_)));
    assert!(matches!(
        s.status(),
        SessionStatus::Failed(SessionFailure::MalformedBundle(_))
    ));
    assert_eq!(s.bundle().unwrap().len(), 4);
    assert_eq!(s.cursor().index, 1);
}

/// Navigation schedules the matching transition.
#[test]
fn navigation_plays_transitions() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();

    s.next(0.0).unwrap();
    assert_eq!(s.last_report().unwrap().policy, TransitionPolicy::Grouping);
    s.next(0.0).unwrap();
    assert_eq!(s.last_report().unwrap().policy, TransitionPolicy::Collapse);

    let generation = s.last_report().unwrap().generation;
    s.next(0.0).unwrap();
    s.next(0.0).unwrap();
    assert_eq!(s.cursor().index, 3);
    assert_eq!(
        s.last_report().unwrap().generation,
        generation + 1,
        "next at the last step does not re-render"
    );
}

/// Autoplay is driven entirely by `tick`.
#[test]
fn tick_drives_autoplay() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();
    s.toggle_play(0.0).unwrap();
    assert!(s.cursor().playing);

    s.tick(1000.0).unwrap();
    assert_eq!(s.cursor().index, 0);
    s.tick(2500.0).unwrap();
    assert_eq!(s.cursor().index, 1);
    s.tick(5000.0).unwrap();
    s.tick(7500.0).unwrap();
    assert_eq!(s.cursor().index, 3);
    assert!(!s.cursor().playing);

    s.tick(20_000.0).unwrap();
    assert_eq!(s.cursor().index, 3);
    assert_eq!(s.stage().now(), 20_000.0);
}

/// Only the result of the latest request is applied.
#[test]
fn stale_results_are_discarded() {
    let mut s = session();
    let first = s.begin_request();
    let second = s.begin_request();
    assert_eq!(s.status(), &SessionStatus::Loading(second));

    let applied = s
        .complete_request(first, Ok(single_step_bundle("stale")))
        .unwrap();
    assert!(!applied);
    assert!(s.bundle().is_none());

    let applied = s
        .complete_request(second, Ok(single_step_bundle("fresh")))
        .unwrap();
    assert!(applied);
    assert_eq!(s.bundle().unwrap().overall_summary, "fresh");
}

/// A failed request is visible and leaves the loaded bundle untouched.
#[test]
fn service_failure_keeps_previous_bundle() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();

    let token = s.begin_request();
    let err = s
        .complete_request(token, Err(ServiceError::RequestFailed("quota".into())))
        .unwrap_err();
    assert!(matches!(err, SessionError::Service(_)));
    assert_eq!(
        s.status(),
        &SessionStatus::Failed(SessionFailure::ServiceFailure(
            "Analysis request failed: quota".into()
        ))
    );
    assert_eq!(s.bundle().unwrap().len(), 4);
}

#[test]
fn analyze_through_services() {
    let mut s = session();
    let service = JsonFileService::new(common::fixture_path("groupby_mean.json"));
    let applied = pollster::block_on(s.analyze(&service, "df.groupby('Category').mean()"))
        .unwrap();
    assert!(applied);
    assert_eq!(s.bundle().unwrap().len(), 4);

    let failing = StaticService::failing("offline");
    assert!(pollster::block_on(s.analyze(&failing, "df")).is_err());
    assert_eq!(s.bundle().unwrap().len(), 4);

    let missing = JsonFileService::new(common::fixture_path("missing.json"));
    assert!(pollster::block_on(s.analyze(&missing, "df")).is_err());
    assert!(matches!(
        s.status(),
        SessionStatus::Failed(SessionFailure::ServiceFailure(_))
    ));
}

/// An empty bundle from the service is a malformed result.
#[test]
fn empty_bundle_from_service_is_malformed() {
    let mut s = session();
    let empty = StaticService::new(ExplanationBundle {
        overall_summary: String::new(),
        steps: vec![],
    });
    assert!(pollster::block_on(s.analyze(&empty, "df")).is_err());
    assert!(matches!(
        s.status(),
        SessionStatus::Failed(SessionFailure::MalformedBundle(_))
    ));
    assert!(s.bundle().is_none());
}

/// Resizing re-centers the table for the new width.
#[test]
fn resize_relayouts_current_step() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();
    s.resize(1000.0, 600.0, 0.0).unwrap();
    let table = s.stage().state(&ElementId::Table).unwrap();
    assert_eq!(table.position.x, 20.0 + (960.0 - 300.0) / 2.0);
    let caption = s.stage().state(&ElementId::Caption).unwrap();
    assert_eq!(caption.position.y, 560.0);
}

#[test]
fn reset_returns_to_idle() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();
    s.reset();
    assert_eq!(s.status(), &SessionStatus::Idle);
    assert!(s.bundle().is_none());
    assert!(s.stage().is_empty());
    assert!(s.next(0.0).is_ok());
    assert!(s.current_step().is_none());
}

/// A host that stops ticking once settled still sees the next transition play out
/// from the moment it navigates.
#[test]
fn navigation_after_idle_starts_from_host_time() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();
    s.tick(1000.0).unwrap();
    assert!(s.settled_at() <= 1000.0);

    s.next(10_000.0).unwrap();
    assert_eq!(s.settled_at(), 10_000.0 + 500.0 + 750.0);

    s.tick(10_016.0).unwrap();
    assert!(moving_rows(s.stage()) > 0, "rows still hold before sliding");
    assert!(s.stage().state(&ElementId::Caption).unwrap().opacity < EPS);

    s.tick(11_250.0).unwrap();
    assert_eq!(moving_rows(s.stage()), 0);
}

/// Autoplay waits a full interval from the moment play is pressed.
#[test]
fn autoplay_after_idle_waits_full_interval() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();
    s.tick(1000.0).unwrap();

    s.toggle_play(10_000.0).unwrap();
    s.tick(10_016.0).unwrap();
    assert_eq!(s.cursor().index, 0);
    s.tick(12_499.0).unwrap();
    assert_eq!(s.cursor().index, 0);
    s.tick(12_500.0).unwrap();
    assert_eq!(s.cursor().index, 1);
}

/// Resizing a settled grouping step moves the frame without replaying the caption
/// fade or the key-column pulse.
#[test]
fn resize_keeps_settled_effects() {
    let mut s = session();
    let palette = s.config().palette.clone();
    s.load(groupby_bundle()).unwrap();
    s.tick(1000.0).unwrap();
    s.next(1000.0).unwrap();
    assert_eq!(s.last_report().unwrap().policy, TransitionPolicy::Grouping);
    s.tick(5000.0).unwrap();
    let generation = s.last_report().unwrap().generation;

    s.resize(810.0, 500.0, 5000.0).unwrap();
    s.tick(5010.0).unwrap();

    let caption = s.stage().state(&ElementId::Caption).unwrap();
    assert!((caption.opacity - 1.0).abs() < EPS);
    let header = s
        .stage()
        .state(&ElementId::Header("Category".into()))
        .unwrap();
    assert!(header.fill.distance(&palette.header_fill) < EPS);
    assert_eq!(moving_rows(s.stage()), 0);
    assert_eq!(s.last_report().unwrap().generation, generation);
    assert_eq!(
        s.stage().state(&ElementId::Table).unwrap().position.x,
        20.0 + (770.0 - 300.0) / 2.0
    );
}

/// Resizing mid-transition keeps the rows heading to their targets.
#[test]
fn resize_during_transition_keeps_tweens() {
    let mut s = session();
    s.load(groupby_bundle()).unwrap();
    s.tick(1000.0).unwrap();
    s.next(1000.0).unwrap();
    let settled = s.settled_at();

    s.resize(1000.0, 600.0, 1600.0).unwrap();
    assert_eq!(s.settled_at(), settled);
    s.tick(1700.0).unwrap();
    assert!(moving_rows(s.stage()) > 0);
}

/// Loading a bundle directly supersedes a request that is still in flight.
#[test]
fn load_supersedes_pending_request() {
    let mut s = session();
    let token = s.begin_request();
    s.load(groupby_bundle()).unwrap();

    let applied = s
        .complete_request(token, Ok(single_step_bundle("late")))
        .unwrap();
    assert!(!applied);
    assert_eq!(s.bundle().unwrap().len(), 4);
    assert_eq!(s.status(), &SessionStatus::Ready);
}
