//! # Transition Matcher
//!
//! Diffs the rows of two consecutive steps.
//!
//! ## Responsibilities
//! - **Row Matching**: Pairs rows by natural key (first column), first occurrence only.
//! - **Policy**: Picks the timing/placement policy from the phases of both steps.
//! - **Placement**: Computes where entering rows start and where exiting rows go.
//!
//! ## Key Types
//! - `TransitionPolicy`: Default, Grouping or Collapse.
//! - `TransitionPlan`: The continuing / entering / exiting partition with positions
//!   in table-local coordinates.

use crate::errors::RenderError;
use crate::model::{Phase, Step};
use crate::systems::layout::{LayoutEngine, TableLayout};
use crate::types::Point;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// How a transition is timed and where collapsing rows travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Everything animates at once, entering rows fade in at their slot.
    Default,
    /// Delayed slide into clusters plus a pulse on the key column.
    Grouping,
    /// Aggregation after grouping: rows collapse into group centroids.
    Collapse,
}

impl TransitionPolicy {
    pub fn between(previous: Option<&Step>, next: &Step) -> Self {
        match next.phase() {
            Some(Phase::Grouping) => TransitionPolicy::Grouping,
            Some(Phase::Aggregating)
                if previous.is_some_and(|p| {
                    p.phase() == Some(Phase::Grouping) && p.groups.is_some()
                }) =>
            {
                TransitionPolicy::Collapse
            }
            _ => TransitionPolicy::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuingRow {
    pub key: String,
    pub from_row: usize,
    pub to_row: usize,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnteringRow {
    pub row: usize,
    pub key: Option<String>,
    pub start: Point,
    pub target: Point,
    /// Group of the previous step this row expands out of.
    pub source_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExitingRow {
    pub row: usize,
    pub key: Option<String>,
    pub from: Point,
    pub target: Point,
    /// Group of the previous step this row collapses into.
    pub collapse_into: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionPlan {
    pub policy: TransitionPolicy,
    pub continuing: Vec<ContinuingRow>,
    pub entering: Vec<EnteringRow>,
    pub exiting: Vec<ExitingRow>,
    /// Column pulsed on grouping steps.
    pub highlight_column: Option<usize>,
    #[serde(skip)]
    pub layout: TableLayout,
}

impl TransitionPlan {
    pub fn is_identity(&self) -> bool {
        self.entering.is_empty() && self.exiting.is_empty()
    }
}

/// Builds the plan for moving from `previous` (absent on first render) to `next`.
pub fn plan_transition(
    previous: Option<&Step>,
    next: &Step,
    engine: &mut LayoutEngine,
) -> Result<TransitionPlan, RenderError> {
    let layout = engine.compute_layout(&next.table, next.groups.as_deref())?;
    let previous_layout = previous
        .map(|p| engine.compute_layout(&p.table, p.groups.as_deref()))
        .transpose()?;
    let policy = TransitionPolicy::between(previous, next);

    // First occurrence of each key in the previous table.
    let mut previous_keys: HashMap<&str, usize> = HashMap::new();
    if let Some(p) = previous {
        for row in 0..p.table.rows.len() {
            if let Some(key) = p.table.natural_key(row) {
                previous_keys.entry(key).or_insert(row);
            }
        }
    }

    let mut continuing = Vec::new();
    let mut entering = Vec::new();
    let mut matched = HashSet::new();
    let mut seen_next = HashSet::new();

    for row in 0..next.table.rows.len() {
        let key = next.table.natural_key(row);
        let target = layout.row_position(row).unwrap_or(Point::ZERO);
        let first_in_next = key.is_some_and(|k| seen_next.insert(k));
        let partner = key
            .filter(|_| first_in_next)
            .and_then(|k| previous_keys.get(k).copied());

        match (partner, previous, &previous_layout) {
            (Some(from_row), Some(_), Some(prev_layout)) => {
                matched.insert(from_row);
                continuing.push(ContinuingRow {
                    key: key.unwrap_or_default().to_string(),
                    from_row,
                    to_row: row,
                    from: prev_layout.row_position(from_row).unwrap_or(target),
                    to: target,
                });
            }
            _ => {
                let source = match (policy, previous, &previous_layout) {
                    (TransitionPolicy::Collapse, Some(p), Some(prev_layout)) => {
                        source_group(&next.table.rows[row], p).and_then(|group| {
                            prev_layout.centroid(&group).map(|c| (group, c))
                        })
                    }
                    _ => None,
                };
                let (source_group, start) = match source {
                    Some((group, centroid)) => (Some(group), centroid),
                    None => (None, target),
                };
                entering.push(EnteringRow {
                    row,
                    key: key.map(str::to_string),
                    start,
                    target,
                    source_group,
                });
            }
        }
    }

    let mut exiting = Vec::new();
    if let (Some(p), Some(prev_layout)) = (previous, &previous_layout) {
        for row in (0..p.table.rows.len()).filter(|r| !matched.contains(r)) {
            let from = prev_layout.row_position(row).unwrap_or(Point::ZERO);
            let collapse = if policy == TransitionPolicy::Collapse {
                prev_layout.rows.get(row).and_then(|slot| slot.group).and_then(|gi| {
                    let block = prev_layout.blocks.get(gi)?;
                    Some((block.key.clone(), Point::new(from.x, block.centroid)))
                })
            } else {
                None
            };
            let (collapse_into, target) = match collapse {
                Some((key, centroid)) => (Some(key), centroid),
                None => (None, from),
            };
            exiting.push(ExitingRow {
                row,
                key: p.table.natural_key(row).map(str::to_string),
                from,
                target,
                collapse_into,
            });
        }
    }

    let highlight_column = match policy {
        TransitionPolicy::Grouping => layout.key_column,
        _ => None,
    };

    Ok(TransitionPlan {
        policy,
        continuing,
        entering,
        exiting,
        highlight_column,
        layout,
    })
}

/// The group of `previous` a new row expands from: its first cell naming a group key.
fn source_group(cells: &[String], previous: &Step) -> Option<String> {
    let groups = previous.groups.as_deref()?;
    cells
        .iter()
        .find_map(|cell| groups.iter().find(|g| &g.key == cell))
        .map(|g| g.key.clone())
}
