//! # Playback Controller
//!
//! Cursor over the steps of a bundle with an autoplay deadline.
//!
//! The controller owns no timer. The host polls it with its clock and the controller
//! reports when the autoplay deadline has fired, so tearing a session down is just
//! dropping (or [`Playback::stop`]ping) the controller.

use serde::Serialize;
use tracing::trace;

/// Snapshot of the playback position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Cursor {
    pub index: usize,
    pub playing: bool,
}

#[derive(Debug, Clone)]
pub struct Playback {
    len: usize,
    index: usize,
    playing: bool,
    interval_ms: f64,
    deadline: Option<f64>,
}

impl Playback {
    pub fn new(len: usize, interval_ms: f64) -> Self {
        Self {
            len,
            index: 0,
            playing: false,
            interval_ms,
            deadline: None,
        }
    }

    /// Rewinds to `{0, false}` over a sequence of `len` steps.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.index = 0;
        self.stop();
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            index: self.index,
            playing: self.playing,
        }
    }

    /// Clock time at which the next autoplay advance fires.
    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Pauses and cancels the pending autoplay advance.
    pub fn stop(&mut self) {
        self.playing = false;
        self.deadline = None;
    }

    /// Jumps to `index`, clamped to the last step. Returns whether the index changed.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.is_empty() {
            return false;
        }
        self.stop();
        self.set_index(index.min(self.len - 1))
    }

    pub fn next(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.stop();
        self.set_index((self.index + 1).min(self.len - 1))
    }

    pub fn prev(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.stop();
        self.set_index(self.index.saturating_sub(1))
    }

    pub fn first(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.stop();
        self.set_index(0)
    }

    pub fn last(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.stop();
        self.set_index(self.len - 1)
    }

    /// Starts or pauses autoplay. Starting from the last step rewinds to the first.
    /// Returns whether the index changed.
    pub fn toggle_play(&mut self, now: f64) -> bool {
        if self.is_empty() {
            return false;
        }
        let changed = if self.index == self.len - 1 {
            self.set_index(0)
        } else {
            false
        };
        if self.playing {
            self.stop();
        } else {
            self.playing = true;
            self.arm(now);
        }
        changed
    }

    /// Fires the autoplay deadline if it is due, advancing at most one step.
    /// Returns the new index when the cursor moved.
    pub fn poll(&mut self, now: f64) -> Option<usize> {
        let due = self.deadline.filter(|&d| self.playing && now >= d)?;
        self.index += 1;
        trace!(index = self.index, due, now, "autoplay advance");
        self.arm(now);
        Some(self.index)
    }

    fn set_index(&mut self, index: usize) -> bool {
        let changed = self.index != index;
        self.index = index;
        changed
    }

    // Playing on the last step stops immediately.
    fn arm(&mut self, now: f64) {
        if self.index + 1 < self.len {
            self.deadline = Some(now + self.interval_ms);
        } else {
            self.stop();
        }
    }
}
