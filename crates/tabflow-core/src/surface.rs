//! The seam between the animation driver and a rendering backend.
//!
//! A surface tracks visual elements by [`ElementId`] and tweens their position,
//! opacity and fill. The driver never draws; it only issues `spawn` / `animate_to` /
//! `remove_after` calls, so any backend (the in-memory [`Stage`](crate::stage::Stage),
//! a widget tree, a vector document) can play the same transitions.

use crate::animation::EasingType;
use crate::types::{Color, Point, Viewport};
use std::fmt;

/// Stable element identity on a surface.
///
/// Rows are identified by a handle allocated by the driver rather than by their
/// natural key, so duplicated keys never collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementId {
    /// Group holding the headers and rows; positioned at the table origin.
    Table,
    Title,
    Caption,
    /// Header cell, keyed by column name.
    Header(String),
    Row(u64),
    /// Body cell `column` of row `handle`.
    Cell(u64, usize),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Table => write!(f, "table"),
            ElementId::Title => write!(f, "title"),
            ElementId::Caption => write!(f, "caption"),
            ElementId::Header(name) => write!(f, "header[{}]", name),
            ElementId::Row(h) => write!(f, "row#{}", h),
            ElementId::Cell(h, c) => write!(f, "cell#{}:{}", h, c),
        }
    }
}

/// What an element draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// Invisible container; children are drawn relative to it.
    Group,
    Header,
    Cell,
    Title,
    Caption,
}

/// Static description of an element, fixed at spawn time.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementSpec {
    pub kind: ElementKind,
    pub parent: Option<ElementId>,
    pub label: String,
    pub width: f32,
    pub height: f32,
}

impl ElementSpec {
    pub fn group(parent: Option<ElementId>) -> Self {
        Self {
            kind: ElementKind::Group,
            parent,
            label: String::new(),
            width: 0.0,
            height: 0.0,
        }
    }
}

/// Animatable properties of an element. Positions are relative to the parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualState {
    pub position: Point,
    pub opacity: f32,
    pub fill: Color,
}

impl VisualState {
    pub fn at(position: Point) -> Self {
        Self {
            position,
            opacity: 1.0,
            fill: Color::TRANSPARENT,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_fill(mut self, fill: Color) -> Self {
        self.fill = fill;
        self
    }
}

/// A single property goal for a tween.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Target {
    Position(Point),
    Opacity(f32),
    Fill(Color),
}

/// When and how fast a tween runs. `delay` counts from the moment it is issued.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub duration: f64,
    pub delay: f64,
    pub easing: EasingType,
}

impl Timing {
    pub fn new(duration: f64, delay: f64, easing: EasingType) -> Self {
        Self {
            duration,
            delay,
            easing,
        }
    }

    /// Applies the target at once.
    pub fn instant() -> Self {
        Self::new(0.0, 0.0, EasingType::Linear)
    }
}

/// A backend that can hold and tween visual elements.
pub trait AnimatableSurface {
    /// Current clock time in milliseconds.
    fn now(&self) -> f64;

    fn viewport(&self) -> Viewport;

    /// Starts a new transition generation. Completions scheduled by earlier generations
    /// become no-ops.
    fn begin(&mut self, generation: u64);

    fn contains(&self, id: &ElementId) -> bool;

    /// Every element currently on the surface, including ones pending removal.
    fn ids(&self) -> Vec<ElementId>;

    /// Creates or replaces an element, dropping any motion or removal pending on it.
    fn spawn(&mut self, id: ElementId, spec: ElementSpec, initial: VisualState);

    /// Tweens one property from its current value, superseding pending motion on
    /// that property.
    fn animate_to(&mut self, id: &ElementId, target: Target, timing: Timing);

    /// Tweens one property after its pending motion has played.
    fn chain_to(&mut self, id: &ElementId, target: Target, timing: Timing);

    /// Removes an element and its children once `delay` has elapsed.
    fn remove_after(&mut self, id: &ElementId, delay: f64);

    /// Removes an element and its children immediately.
    fn remove(&mut self, id: &ElementId);

    /// Current sampled state of an element.
    fn state(&self, id: &ElementId) -> Option<VisualState>;
}
