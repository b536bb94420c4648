use keyframe::{AnimationSequence, CanTween, EasingFunction, Keyframe};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest segment length, keeps keyframe times strictly increasing.
const MIN_SEGMENT: f64 = 1e-3;

/// Supported easing functions for animations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
}

impl EasingFunction for EasingType {
    fn y(&self, x: f64) -> f64 {
        match self {
            EasingType::Linear => keyframe::functions::Linear.y(x),
            EasingType::EaseIn => keyframe::functions::EaseIn.y(x),
            EasingType::EaseOut => keyframe::functions::EaseOut.y(x),
            EasingType::EaseInOut => keyframe::functions::EaseInOut.y(x),
        }
    }
}

impl EasingType {
    /// Evaluates the easing curve at a specific point `x` (0.0 to 1.0).
    pub fn eval(&self, x: f32) -> f32 {
        self.y(x as f64) as f32
    }
}

/// A generic animated value that tracks keyframes and current state.
///
/// Times are relative to the start of the track. Every duration in this crate is
/// expressed in milliseconds.
#[derive(Clone)]
pub struct Animated<T>
where
    T: Clone + CanTween + Default,
{
    /// Raw storage of keyframes (value, absolute_time, easing used to reach the value).
    pub raw_keyframes: Vec<(T, f64, EasingType)>,
    /// The underlying keyframe sequence used for interpolation.
    pub sequence: AnimationSequence<T>,
    /// The current calculated value for the last updated time.
    pub current_value: T,
}

impl<T> Animated<T>
where
    T: Clone + CanTween + Default,
{
    /// Creates a new animated value with an initial state and no motion.
    pub fn new(initial: T) -> Self {
        let kf = Keyframe::new(initial.clone(), 0.0, EasingType::Linear);

        Self {
            sequence: AnimationSequence::from(vec![kf]),
            raw_keyframes: vec![(initial.clone(), 0.0, EasingType::Linear)],
            current_value: initial,
        }
    }

    /// Appends a new keyframe to the end of the current sequence.
    ///
    /// # Arguments
    /// * `target` - The value to reach.
    /// * `duration` - Time to reach the target from the previous keyframe.
    /// * `easing` - The easing curve of the segment ending at `target`.
    pub fn add_keyframe(&mut self, target: T, duration: f64, easing: EasingType) {
        let new_time = self.end_time() + duration.max(MIN_SEGMENT);
        self.raw_keyframes.push((target, new_time, easing));
        self.rebuild();
    }

    /// Keeps the last value for `duration` before the next keyframe starts.
    pub fn add_hold(&mut self, duration: f64) {
        if duration <= 0.0 {
            return;
        }
        let last = self.final_value();
        self.add_keyframe(last, duration, EasingType::Linear);
    }

    // A keyframe's easing governs the segment that leaves it, so each frame borrows the
    // easing requested for the segment towards its successor.
    fn rebuild(&mut self) {
        let frames: Vec<Keyframe<T>> = self
            .raw_keyframes
            .iter()
            .enumerate()
            .map(|(i, (val, time, _))| {
                let outgoing = self
                    .raw_keyframes
                    .get(i + 1)
                    .map(|next| next.2)
                    .unwrap_or(EasingType::Linear);
                Keyframe::new(val.clone(), *time, outgoing)
            })
            .collect();

        self.sequence = AnimationSequence::from(frames);
    }

    fn end_time(&self) -> f64 {
        self.raw_keyframes.last().map(|k| k.1).unwrap_or(0.0)
    }

    /// Returns the total duration of the animation sequence.
    pub fn duration(&self) -> f64 {
        self.end_time()
    }

    /// The value the track settles on once every keyframe has played.
    pub fn final_value(&self) -> T {
        self.raw_keyframes
            .last()
            .map(|k| k.0.clone())
            .unwrap_or_else(|| self.current_value.clone())
    }

    /// Updates `current_value` based on the provided track-relative time.
    pub fn update(&mut self, time: f64) {
        let clamped = time.clamp(0.0, self.duration());
        self.sequence.advance_to(clamped);
        self.current_value = self.sequence.now();
    }
}

impl<T> fmt::Debug for Animated<T>
where
    T: Clone + CanTween + Default + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animated")
            .field("current_value", &self.current_value)
            .field("duration", &self.duration())
            .finish()
    }
}

/// An `Animated` value anchored at an absolute clock time.
///
/// The surface clock keeps running across transitions, so every retarget starts a
/// fresh track whose time zero is the moment the transition was issued.
#[derive(Clone, Debug)]
pub struct Track<T>
where
    T: Clone + CanTween + Default + fmt::Debug,
{
    base: f64,
    anim: Animated<T>,
}

impl<T> Track<T>
where
    T: Clone + CanTween + Default + fmt::Debug,
{
    /// A track resting at `value`.
    pub fn still(value: T, now: f64) -> Self {
        Self {
            base: now,
            anim: Animated::new(value),
        }
    }

    pub fn value(&self) -> T {
        self.anim.current_value.clone()
    }

    /// The value the track ends on.
    pub fn target(&self) -> T {
        self.anim.final_value()
    }

    /// Absolute clock time at which the last keyframe is reached.
    pub fn end(&self) -> f64 {
        self.base + self.anim.duration()
    }

    /// Drops any pending motion and tweens from the current value to `target`.
    pub fn retarget(&mut self, now: f64, target: T, delay: f64, duration: f64, easing: EasingType) {
        if delay <= 0.0 && duration <= 0.0 {
            *self = Self::still(target, now);
            return;
        }
        let mut anim = Animated::new(self.value());
        anim.add_hold(delay);
        anim.add_keyframe(target, duration, easing);
        self.base = now;
        self.anim = anim;
    }

    /// Appends a tween after the pending motion. `delay` counts from `now`; a segment
    /// that would start before the previous one ends waits for it.
    pub fn chain(&mut self, now: f64, target: T, delay: f64, duration: f64, easing: EasingType) {
        let start = (now + delay).max(self.end());
        self.anim.add_hold(start - self.end());
        self.anim.add_keyframe(target, duration, easing);
    }

    pub fn update(&mut self, now: f64) {
        self.anim.update(now - self.base);
    }
}
