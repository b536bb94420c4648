//! # Animation Driver
//!
//! Turns a [`TransitionPlan`] into timed mutations on an [`AnimatableSurface`].
//!
//! ## Responsibilities
//! - **Scheduling**: Applies per-policy delays (grouping slide, aggregation collapse).
//! - **Row Tracking**: Keeps the handle of every rendered row of the last target step.
//! - **Highlight Pulse**: Flashes the key column of grouping steps.
//! - **Supersession**: Every call starts a new generation; rows still fading out from
//!   an earlier call are removed before the new transition is laid down.

use crate::config::VisualizerConfig;
use crate::errors::RenderError;
use crate::model::Step;
use crate::surface::{
    AnimatableSurface, ElementId, ElementKind, ElementSpec, Target, Timing, VisualState,
};
use crate::systems::layout::LayoutEngine;
use crate::systems::matcher::{plan_transition, TransitionPlan, TransitionPolicy};
use crate::types::{Point, Viewport};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Summary of one scheduled transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionReport {
    pub generation: u64,
    pub policy: TransitionPolicy,
    pub continuing: usize,
    pub entering: usize,
    pub exiting: usize,
    /// Delay applied to continuing and entering rows.
    pub row_delay: f64,
    /// Leftover rows of superseded transitions that were removed.
    pub superseded: usize,
}

/// Viewport-dependent placement of the frame elements.
struct Frame {
    inner_width: f32,
    table: Point,
    title: Point,
    caption: Point,
}

pub struct AnimationDriver {
    config: VisualizerConfig,
    engine: LayoutEngine,
    generation: u64,
    shown: Option<Step>,
    /// Row handle per row of `shown`, in table order.
    live: Vec<u64>,
    next_handle: u64,
}

impl AnimationDriver {
    pub fn new(config: VisualizerConfig) -> Self {
        Self {
            engine: LayoutEngine::new(config.geometry.clone()),
            config,
            generation: 0,
            shown: None,
            live: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The step the surface is animating towards.
    pub fn shown(&self) -> Option<&Step> {
        self.shown.as_ref()
    }

    /// Surface handle of each rendered row of the shown step.
    pub fn row_handles(&self) -> &[u64] {
        &self.live
    }

    /// Clears the surface and forgets the shown step.
    pub fn reset<S: AnimatableSurface>(&mut self, surface: &mut S) {
        self.generation += 1;
        surface.begin(self.generation);
        for id in surface.ids() {
            surface.remove(&id);
        }
        self.shown = None;
        self.live.clear();
    }

    /// Computes the plan from the shown step to `next` without touching the surface.
    pub fn plan(&mut self, next: &Step) -> Result<TransitionPlan, RenderError> {
        plan_transition(self.shown.as_ref(), next, &mut self.engine)
    }

    /// Animates the surface towards `next`, superseding any transition in flight.
    #[instrument(level = "debug", skip_all, fields(title = %next.title))]
    pub fn show<S: AnimatableSurface>(
        &mut self,
        next: &Step,
        surface: &mut S,
    ) -> Result<TransitionReport, RenderError> {
        let plan = self.plan(next)?;

        self.generation += 1;
        surface.begin(self.generation);

        let superseded = self.remove_stale_rows(surface);
        self.place_frame(next, &plan, surface);

        let timings = &self.config.timings;
        let geometry = &self.config.geometry;
        let palette = &self.config.palette;
        let easing = timings.easing;
        let row_delay = match plan.policy {
            TransitionPolicy::Default => 0.0,
            TransitionPolicy::Grouping => timings.grouping_delay_ms,
            TransitionPolicy::Collapse => timings.aggregation_delay_ms,
        };
        let exit_timing = Timing::new(timings.transition_ms, 0.0, easing);
        let row_timing = Timing::new(timings.transition_ms, row_delay, easing);

        for exit in &plan.exiting {
            let Some(&handle) = self.live.get(exit.row) else {
                continue;
            };
            let id = ElementId::Row(handle);
            if exit.collapse_into.is_some() {
                surface.animate_to(&id, Target::Position(exit.target), exit_timing);
            }
            surface.animate_to(&id, Target::Opacity(0.0), exit_timing);
            surface.remove_after(&id, timings.transition_ms);
        }

        let previous_columns = self
            .shown
            .as_ref()
            .map(|s| s.table.columns.len())
            .unwrap_or(0);
        let mut live = vec![0; next.table.rows.len()];

        for row in &plan.continuing {
            let Some(&handle) = self.live.get(row.from_row) else {
                continue;
            };
            let id = ElementId::Row(handle);
            for column in next.table.columns.len()..previous_columns {
                surface.remove(&ElementId::Cell(handle, column));
            }
            spawn_cells(surface, handle, &next.table.rows[row.to_row], &plan, self);
            surface.animate_to(&id, Target::Position(row.to), row_timing);
            surface.animate_to(&id, Target::Opacity(1.0), row_timing);
            live[row.to_row] = handle;
        }

        for row in &plan.entering {
            let handle = self.next_handle;
            self.next_handle += 1;
            let id = ElementId::Row(handle);
            surface.spawn(
                id.clone(),
                ElementSpec {
                    kind: ElementKind::Group,
                    parent: Some(ElementId::Table),
                    label: String::new(),
                    width: plan.layout.width,
                    height: geometry.row_height,
                },
                VisualState::at(row.start).with_opacity(0.0),
            );
            spawn_cells(surface, handle, &next.table.rows[row.row], &plan, self);
            surface.animate_to(&id, Target::Position(row.target), row_timing);
            surface.animate_to(&id, Target::Opacity(1.0), row_timing);
            live[row.row] = handle;
        }

        if let Some(column) = plan.highlight_column {
            let first = Timing::new(timings.pulse_ms, 0.0, easing);
            let back = Timing::new(timings.pulse_ms, timings.pulse_return_delay_ms, easing);
            if let Some(name) = next.table.columns.get(column) {
                let header = ElementId::Header(name.clone());
                surface.animate_to(&header, Target::Fill(palette.accent_header), first);
                surface.chain_to(&header, Target::Fill(palette.header_fill), back);
            }
            for &handle in &live {
                let cell = ElementId::Cell(handle, column);
                surface.animate_to(&cell, Target::Fill(palette.accent_cell), first);
                surface.chain_to(&cell, Target::Fill(palette.cell_fill), back);
            }
        }

        let report = TransitionReport {
            generation: self.generation,
            policy: plan.policy,
            continuing: plan.continuing.len(),
            entering: plan.entering.len(),
            exiting: plan.exiting.len(),
            row_delay,
            superseded,
        };
        debug!(
            generation = report.generation,
            policy = ?report.policy,
            continuing = report.continuing,
            entering = report.entering,
            exiting = report.exiting,
            superseded = report.superseded,
            "transition scheduled"
        );

        self.live = live;
        self.shown = Some(next.clone());
        Ok(report)
    }

    fn remove_stale_rows<S: AnimatableSurface>(&self, surface: &mut S) -> usize {
        let live: HashSet<u64> = self.live.iter().copied().collect();
        let stale: Vec<ElementId> = surface
            .ids()
            .into_iter()
            .filter(|id| matches!(id, ElementId::Row(h) if !live.contains(h)))
            .collect();
        for id in &stale {
            surface.remove(id);
        }
        stale.len()
    }

    /// Moves the frame of the shown step to fit the current viewport. Tweens already
    /// in flight keep running.
    #[instrument(level = "debug", skip_all)]
    pub fn relayout<S: AnimatableSurface>(&mut self, surface: &mut S) -> Result<(), RenderError> {
        let Some(step) = self.shown.as_ref() else {
            return Ok(());
        };
        let layout = self
            .engine
            .compute_layout(&step.table, step.groups.as_deref())?;
        let frame = self.frame(surface.viewport(), layout.width);
        for (id, position) in [
            (ElementId::Table, frame.table),
            (ElementId::Title, frame.title),
            (ElementId::Caption, frame.caption),
        ] {
            surface.animate_to(&id, Target::Position(position), Timing::instant());
        }
        debug!(width = surface.viewport().width, "frame relaid out");
        Ok(())
    }

    fn frame(&self, viewport: Viewport, table_width: f32) -> Frame {
        let geometry = &self.config.geometry;
        let padding = geometry.padding;
        let inner_width = viewport.width - padding.left - padding.right;
        let center_x = padding.left + inner_width / 2.0;
        Frame {
            inner_width,
            table: Point::new(
                padding.left + (inner_width - table_width) / 2.0,
                padding.top + geometry.table_top,
            ),
            title: Point::new(center_x, padding.top - 15.0),
            caption: Point::new(center_x, viewport.height - padding.bottom - 20.0),
        }
    }

    /// Table origin, title, caption and headers. Headers are keyed by column name and
    /// placed without animation.
    fn place_frame<S: AnimatableSurface>(
        &self,
        step: &Step,
        plan: &TransitionPlan,
        surface: &mut S,
    ) {
        let geometry = &self.config.geometry;
        let timings = &self.config.timings;
        let frame = self.frame(surface.viewport(), plan.layout.width);

        surface.spawn(
            ElementId::Table,
            ElementSpec::group(None),
            VisualState::at(frame.table),
        );

        surface.spawn(
            ElementId::Title,
            ElementSpec {
                kind: ElementKind::Title,
                parent: None,
                label: step.title.clone(),
                width: frame.inner_width,
                height: 0.0,
            },
            VisualState::at(frame.title),
        );

        surface.spawn(
            ElementId::Caption,
            ElementSpec {
                kind: ElementKind::Caption,
                parent: None,
                label: step.explanation.clone(),
                width: frame.inner_width,
                height: 0.0,
            },
            VisualState::at(frame.caption).with_opacity(0.0),
        );
        surface.animate_to(
            &ElementId::Caption,
            Target::Opacity(1.0),
            Timing::new(timings.caption_fade_ms, timings.caption_delay_ms, timings.easing),
        );

        let columns: HashSet<&str> = step.table.columns.iter().map(String::as_str).collect();
        for id in surface.ids() {
            if let ElementId::Header(name) = &id {
                if !columns.contains(name.as_str()) {
                    surface.remove(&id);
                }
            }
        }
        for slot in &plan.layout.headers {
            surface.spawn(
                ElementId::Header(slot.column.clone()),
                ElementSpec {
                    kind: ElementKind::Header,
                    parent: Some(ElementId::Table),
                    label: slot.column.clone(),
                    width: geometry.cell_width - 1.0,
                    height: geometry.header_height,
                },
                VisualState::at(Point::new(slot.x, 0.0))
                    .with_fill(self.config.palette.header_fill),
            );
        }
    }
}

fn spawn_cells<S: AnimatableSurface>(
    surface: &mut S,
    handle: u64,
    cells: &[String],
    plan: &TransitionPlan,
    driver: &AnimationDriver,
) {
    let geometry = &driver.config.geometry;
    for (column, value) in cells.iter().enumerate() {
        let x = plan
            .layout
            .headers
            .get(column)
            .map(|h| h.x)
            .unwrap_or(column as f32 * geometry.cell_width);
        surface.spawn(
            ElementId::Cell(handle, column),
            ElementSpec {
                kind: ElementKind::Cell,
                parent: Some(ElementId::Row(handle)),
                label: value.clone(),
                width: geometry.cell_width - 1.0,
                height: geometry.row_height - 1.0,
            },
            VisualState::at(Point::new(x, 0.0)).with_fill(driver.config.palette.cell_fill),
        );
    }
}
