//! Error types for the members harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Timed out after {timeout_ms} ms waiting for: {condition}")]
    StepTimeout { condition: String, timeout_ms: u64 },

    #[error("Assertion failed on {property}: expected {expected:?}, observed {observed:?}")]
    AssertionFailure {
        property: String,
        expected: String,
        observed: String,
    },

    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailure { url: String, reason: String },

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Application failed to start: {0}")]
    AppStartup(String),

    #[error("Application health check failed after {0} attempts")]
    AppHealthCheck(usize),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Workflow spec parse error: {0}")]
    SpecParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Short machine-readable kind used in suite reports
    pub fn kind(&self) -> &'static str {
        match self {
            E2eError::StepTimeout { .. } => "step_timeout",
            E2eError::AssertionFailure { .. } => "assertion_failure",
            E2eError::NavigationFailure { .. } => "navigation_failure",
            E2eError::PlaywrightNotFound => "playwright_not_found",
            E2eError::Driver(_) => "driver",
            E2eError::AppStartup(_) | E2eError::AppHealthCheck(_) => "app",
            E2eError::ScenarioNotFound(_) => "scenario_not_found",
            E2eError::SpecParse(_) | E2eError::Yaml(_) => "spec_parse",
            E2eError::Io(_) => "io",
            E2eError::Json(_) => "json",
            E2eError::Http(_) => "http",
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
