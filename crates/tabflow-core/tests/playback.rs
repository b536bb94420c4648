//! Playback Controller Tests
//!
//! Cursor navigation and the autoplay deadline.

use tabflow_core::{Cursor, Playback};

const INTERVAL: f64 = 2500.0;

/// Navigation clamps to the step range and pauses autoplay.
#[test]
fn navigation_clamps_and_pauses() {
    let mut p = Playback::new(4, INTERVAL);
    assert!(!p.prev(), "prev at the first step is a no-op");
    assert_eq!(p.index(), 0);

    assert!(p.go_to(10));
    assert_eq!(p.index(), 3);
    assert!(!p.next(), "next at the last step is a no-op");

    assert!(p.first());
    p.toggle_play(0.0);
    assert!(p.is_playing());
    assert!(p.next());
    assert_eq!(
        p.cursor(),
        Cursor {
            index: 1,
            playing: false
        }
    );
    assert_eq!(p.deadline(), None, "navigation cancels the pending tick");

    assert!(p.last());
    assert_eq!(p.index(), 3);
}

/// Autoplay advances once per interval and stops on the last step.
#[test]
fn autoplay_runs_to_the_end_and_stops() {
    let mut p = Playback::new(3, INTERVAL);
    p.toggle_play(0.0);
    assert_eq!(p.deadline(), Some(2500.0));

    assert_eq!(p.poll(2499.0), None);
    assert_eq!(p.poll(2500.0), Some(1));
    assert!(p.is_playing());
    assert_eq!(p.deadline(), Some(5000.0));

    assert_eq!(p.poll(5000.0), Some(2));
    assert!(!p.is_playing(), "reaching the last step stops playback");
    assert_eq!(p.poll(10_000.0), None);
}

/// A late poll advances a single step and re-arms from the poll time.
#[test]
fn late_poll_advances_one_step() {
    let mut p = Playback::new(5, INTERVAL);
    p.toggle_play(0.0);
    assert_eq!(p.poll(9000.0), Some(1));
    assert_eq!(p.deadline(), Some(11_500.0));
}

/// Pressing play on the last step starts over from the first.
#[test]
fn play_at_end_rewinds() {
    let mut p = Playback::new(3, INTERVAL);
    p.last();
    assert!(p.toggle_play(100.0));
    assert_eq!(p.index(), 0);
    assert!(p.is_playing());
    assert_eq!(p.deadline(), Some(2600.0));

    assert!(!p.toggle_play(200.0));
    assert!(!p.is_playing());
    assert_eq!(p.poll(5000.0), None);
}

/// A single-step bundle cannot play.
#[test]
fn single_step_never_plays() {
    let mut p = Playback::new(1, INTERVAL);
    assert!(!p.toggle_play(0.0));
    assert!(!p.is_playing());
    assert_eq!(p.deadline(), None);
}

/// With nothing loaded every operation is a no-op.
#[test]
fn empty_playback_is_inert() {
    let mut p = Playback::new(0, INTERVAL);
    assert!(!p.next());
    assert!(!p.prev());
    assert!(!p.go_to(3));
    assert!(!p.last());
    assert!(!p.toggle_play(0.0));
    assert!(!p.is_playing());
    assert_eq!(p.poll(1e9), None);
    assert_eq!(p.cursor(), Cursor::default());
}

#[test]
fn reset_rewinds_and_stops() {
    let mut p = Playback::new(3, INTERVAL);
    p.go_to(2);
    p.toggle_play(0.0);
    p.reset(5);
    assert_eq!(p.cursor(), Cursor::default());
    assert_eq!(p.len(), 5);
}
