use crate::errors::ServiceError;
use crate::model::ExplanationBundle;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Turns a source snippet into an explanation bundle.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Analyzes `source` and returns the step-by-step bundle.
    async fn analyze(&self, source: &str) -> ServiceResult<ExplanationBundle>;

    /// Returns the service name (e.g., "json-file").
    fn name(&self) -> &'static str;
}

/// Serves a pre-computed bundle from a JSON file, whatever the source.
#[derive(Debug, Clone)]
pub struct JsonFileService {
    path: PathBuf,
}

impl JsonFileService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AnalysisService for JsonFileService {
    async fn analyze(&self, source: &str) -> ServiceResult<ExplanationBundle> {
        debug!(path = %self.path.display(), source_len = source.len(), "reading bundle");
        let text = std::fs::read_to_string(&self.path)?;
        Ok(ExplanationBundle::from_json(&text)?)
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}

/// Answers every request with the same outcome.
#[derive(Debug, Clone)]
pub struct StaticService {
    outcome: Result<ExplanationBundle, String>,
}

impl StaticService {
    pub fn new(bundle: ExplanationBundle) -> Self {
        Self {
            outcome: Ok(bundle),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
        }
    }
}

#[async_trait]
impl AnalysisService for StaticService {
    async fn analyze(&self, _source: &str) -> ServiceResult<ExplanationBundle> {
        self.outcome
            .clone()
            .map_err(ServiceError::RequestFailed)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
