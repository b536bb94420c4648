//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use tabflow_core::{ExplanationBundle, Group, Step, Table};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// The four-step groupby-mean walkthrough.
pub fn groupby_bundle() -> ExplanationBundle {
    let text = std::fs::read_to_string(fixture_path("groupby_mean.json"))
        .expect("fixture should be readable");
    ExplanationBundle::from_json(&text).expect("fixture should be valid")
}

pub fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
    Table {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    }
}

pub fn step(title: &str, table: Table) -> Step {
    Step {
        title: title.to_string(),
        explanation: String::new(),
        table,
        groups: None,
        phase: None,
    }
}

pub fn grouped(title: &str, table: Table, groups: Vec<Group>) -> Step {
    Step {
        groups: Some(groups),
        ..step(title, table)
    }
}
