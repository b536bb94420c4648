//! # tabflow
//!
//! `tabflow-core` animates table transformations step by step: rows sorting into groups,
//! groups collapsing into aggregates, columns appearing and disappearing.
//!
//! It combines a flexbox Layout Engine ([Taffy](https://crates.io/crates/taffy)) for
//! the table diagram, a row matcher that diffs consecutive snapshots, keyframe tweens
//! driven by a millisecond clock, and a Skia rasterizer for frames.
//!
//! ## Core Features
//!
//! *   **Step Bundles**: Validated sequences of table snapshots with optional grouping metadata.
//! *   **Row Matching**: Rows keep their identity across steps through their natural key.
//! *   **Semantic Transitions**: Grouping slides and pulses, aggregation collapses into centroids.
//! *   **Playback**: Cursor navigation with autoplay.
//! *   **Pluggable Surfaces**: The driver animates any [`AnimatableSurface`].
//!
//! ## Usage
//!
//! The core entry point is the [`Session`] struct, which owns the bundle, the cursor and
//! the stage.
//!
//! ```rust,no_run
//! use tabflow_core::{ExplanationBundle, Session, VisualizerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bundle = ExplanationBundle::from_json(&std::fs::read_to_string("bundle.json")?)?;
//! let mut session = Session::new(VisualizerConfig::default(), 800.0, 500.0);
//! session.set_clock(0.0);
//! session.load(bundle)?;
//! session.toggle_play(0.0)?;
//! session.tick(16.0)?;
//! let png = session.snapshot_png()?;
//! # let _ = png;
//! # Ok(())
//! # }
//! ```

/// Keyframe tracks and easing functions.
pub mod animation;

/// Visualizer geometry, timings and palette.
pub mod config;

/// Error types.
pub mod errors;

/// Tables, groups, steps and bundles.
pub mod model;

/// Step cursor and autoplay.
pub mod playback;

/// The analysis service seam.
pub mod service;

/// Application state.
pub mod session;

/// In-memory animatable scene.
pub mod stage;

/// The surface trait the driver animates.
pub mod surface;

/// Layout, matching, driving and rendering.
pub mod systems;

/// Common value types.
pub mod types;

pub use animation::EasingType;
pub use config::VisualizerConfig;
pub use errors::{BundleError, ConfigError, RenderError, ServiceError, SessionError};
pub use model::{ExplanationBundle, Group, Phase, Step, Table};
pub use playback::{Cursor, Playback};
pub use service::{AnalysisService, JsonFileService, StaticService};
pub use session::{RequestToken, Session, SessionFailure, SessionStatus};
pub use stage::Stage;
pub use surface::{AnimatableSurface, ElementId};
pub use systems::driver::{AnimationDriver, TransitionReport};
pub use systems::layout::{LayoutEngine, TableLayout};
pub use systems::matcher::{plan_transition, TransitionPlan, TransitionPolicy};
pub use systems::renderer::Renderer;
pub use types::{Color, Point, Viewport};
