//! # Step Data Model
//!
//! The explanation bundle as produced by the analysis service, plus its structural
//! validation.
//!
//! ## Key Types
//! - `Table`: ordered columns and rows of string cells.
//! - `Group`: a group key and the step-0 row indices it covers.
//! - `Step`: one snapshot (title, explanation, table, optional groups and phase).
//! - `ExplanationBundle`: the overall summary plus a non-empty sequence of steps.

use crate::errors::BundleError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashSet};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// The natural key of a row: the value of its first column.
    pub fn natural_key(&self, row: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.first()).map(String::as_str)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Group {
    pub key: String,
    /// Indices into the step-0 row ordering.
    #[serde(
        deserialize_with = "deserialize_indices",
        serialize_with = "serialize_indices"
    )]
    pub indices: BTreeSet<usize>,
}

impl Group {
    pub fn new(key: impl Into<String>, indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            key: key.into(),
            indices: indices.into_iter().collect(),
        }
    }
}

// The service schema declares indices as JSON numbers, so `2.0` must be accepted.
fn deserialize_indices<'de, D>(deserializer: D) -> Result<BTreeSet<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<f64>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|value| {
            if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
                Ok(value as usize)
            } else {
                Err(serde::de::Error::custom(BundleError::InvalidIndex { value }))
            }
        })
        .collect()
}

fn serialize_indices<S>(indices: &BTreeSet<usize>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(indices.iter())
}

/// Semantic role of a step, driving the transition policy.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initial,
    Grouping,
    Aggregating,
    Final,
}

impl Phase {
    /// Infers a phase from free-text step titles (case-insensitive substring match).
    pub fn from_title(title: &str) -> Option<Phase> {
        let title = title.to_lowercase();
        if title.contains("grouping") {
            Some(Phase::Grouping)
        } else if title.contains("aggregation") {
            Some(Phase::Aggregating)
        } else if title.contains("initial") {
            Some(Phase::Initial)
        } else if title.contains("final") {
            Some(Phase::Final)
        } else {
            None
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Step {
    pub title: String,
    pub explanation: String,
    #[serde(alias = "data")]
    pub table: Table,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Group>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

impl Step {
    /// The explicit phase tag, or one inferred from the title.
    pub fn phase(&self) -> Option<Phase> {
        self.phase.or_else(|| Phase::from_title(&self.title))
    }

    /// Resolves the column whose values attribute every row to exactly one group.
    pub fn key_column(&self) -> Option<usize> {
        self.groups
            .as_deref()
            .and_then(|groups| key_column(&self.table, groups))
    }
}

/// Finds the first column in which every row's value is the key of exactly one group.
///
/// Grouping metadata names groups by value only, so the column is located by
/// matching values rather than by name.
pub fn key_column(table: &Table, groups: &[Group]) -> Option<usize> {
    if table.rows.is_empty() || groups.is_empty() {
        return None;
    }
    (0..table.columns.len()).find(|&col| {
        table.rows.iter().all(|row| {
            row.get(col)
                .map(|value| groups.iter().filter(|g| &g.key == value).count() == 1)
                .unwrap_or(false)
        })
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationBundle {
    #[serde(alias = "overallExplanation")]
    pub overall_summary: String,
    pub steps: Vec<Step>,
}

impl ExplanationBundle {
    /// Decodes and validates a bundle from JSON.
    pub fn from_json(source: &str) -> Result<Self, BundleError> {
        let bundle: ExplanationBundle = serde_json::from_str(source)?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Checks every structural invariant; the first violation is reported.
    pub fn validate(&self) -> Result<(), BundleError> {
        let first = self.steps.first().ok_or(BundleError::EmptySteps)?;
        let original_rows = first.table.rows.len();
        for (index, step) in self.steps.iter().enumerate() {
            validate_step(index, step, original_rows)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn validate_step(index: usize, step: &Step, original_rows: usize) -> Result<(), BundleError> {
    let table = &step.table;

    let mut seen = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.as_str()) {
            return Err(BundleError::DuplicateColumn {
                step: index,
                column: column.clone(),
            });
        }
    }

    for (row, cells) in table.rows.iter().enumerate() {
        if cells.len() != table.columns.len() {
            return Err(BundleError::RaggedRow {
                step: index,
                row,
                expected: table.columns.len(),
                found: cells.len(),
            });
        }
    }

    let Some(groups) = &step.groups else {
        return Ok(());
    };

    let mut keys = HashSet::new();
    let mut covered = BTreeSet::new();
    for group in groups {
        if !keys.insert(group.key.as_str()) {
            return Err(BundleError::DuplicateGroupKey {
                step: index,
                key: group.key.clone(),
            });
        }
        if let Some(&bad) = group.indices.iter().find(|&&i| i >= original_rows) {
            return Err(BundleError::GroupIndexOutOfRange {
                step: index,
                key: group.key.clone(),
                index: bad,
                rows: original_rows,
            });
        }
        covered.extend(group.indices.iter().copied());
    }

    let missing: Vec<usize> = (0..original_rows).filter(|i| !covered.contains(i)).collect();
    if !missing.is_empty() {
        return Err(BundleError::UncoveredRows {
            step: index,
            missing,
        });
    }

    if !table.rows.is_empty() && key_column(table, groups).is_none() {
        return Err(BundleError::UnattributedRows { step: index });
    }

    Ok(())
}
