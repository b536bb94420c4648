use thiserror::Error;

/// Structural problems found while decoding or validating an explanation bundle.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Bundle has no steps")]
    EmptySteps,
    #[error("Step {step}: column '{column}' appears more than once")]
    DuplicateColumn { step: usize, column: String },
    #[error("Step {step}: row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        step: usize,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Step {step}: group key '{key}' appears more than once")]
    DuplicateGroupKey { step: usize, key: String },
    #[error("Step {step}: group '{key}' references row {index}, but the original table has {rows} rows")]
    GroupIndexOutOfRange {
        step: usize,
        key: String,
        index: usize,
        rows: usize,
    },
    #[error("Step {step}: groups do not cover original rows {missing:?}")]
    UncoveredRows { step: usize, missing: Vec<usize> },
    #[error("Step {step}: no column attributes every row to exactly one group")]
    UnattributedRows { step: usize },
    #[error("Invalid group index {value}: expected a non-negative integer")]
    InvalidIndex { value: f64 },
    #[error("Malformed bundle JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures reported by an analysis service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Analysis request failed: {0}")]
    RequestFailed(String),
    #[error("Analysis service returned an invalid bundle: {0}")]
    InvalidBundle(#[from] BundleError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create surface")]
    SurfaceFailure,
    #[error("Failed to encode frame")]
    EncodeFailure,
    #[error("Element tree exceeds maximum depth")]
    RecursionLimit,
    #[error("Layout error: {0}")]
    Layout(String),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid color '{0}': expected #rrggbb or #rrggbbaa")]
    InvalidColor(String),
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by a [`Session`](crate::session::Session) operation.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
