//! Suite runner: one fresh session per scenario, results collected to JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::app::AppHandle;
use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::members;
use crate::runner::WorkflowRunner;
use crate::scenarios::{Scenario, ScenarioDriver, ScenarioTrace};
use crate::session::{Session, SessionFactory};

/// Why a scenario failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDetail {
    pub kind: String,
    pub message: String,
}

impl From<&E2eError> for FailureDetail {
    fn from(e: &E2eError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

/// Page capture taken when a scenario fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotArtifact {
    pub path: PathBuf,
    pub sha256: String,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub trace: ScenarioTrace,
    pub failure: Option<FailureDetail>,
    pub screenshot: Option<ScreenshotArtifact>,
}

/// Result of running a list of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Runs scenarios, each in its own session from `factory`
pub struct SuiteRunner<F: SessionFactory> {
    factory: F,
    config: SuiteConfig,
    runner: WorkflowRunner,
    app: Option<AppHandle>,
}

impl<F: SessionFactory> SuiteRunner<F> {
    pub fn new(factory: F, mut config: SuiteConfig) -> Self {
        config.normalize();
        let runner = WorkflowRunner::new(config.runner.clone());
        Self {
            factory,
            config,
            runner,
            app: None,
        }
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Start (or attach to) the site and wait until it is healthy
    pub async fn start_app(&mut self) -> E2eResult<()> {
        if self.app.is_some() {
            return Ok(());
        }
        self.app = Some(AppHandle::start(&self.config.app).await?);
        Ok(())
    }

    /// Stop the site if this runner started it
    pub async fn stop_app(&mut self) -> E2eResult<()> {
        if let Some(mut app) = self.app.take() {
            app.stop().await?;
        }
        Ok(())
    }

    /// Run scenarios in order
    pub async fn run(&self, scenarios: &[Scenario]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = self.run_scenario(scenario).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result
                        .failure
                        .as_ref()
                        .map(|f| f.message.as_str())
                        .unwrap_or("unknown error")
                );
            }
            results.push(result);

            if failed > 0 && self.config.fail_fast {
                warn!("Stopping after first failure (fail_fast)");
                break;
            }
        }

        let skipped = scenarios.len() - results.len();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Suite Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        SuiteResult {
            started_at,
            total: scenarios.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }

    /// Run a single scenario in a fresh session
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let mut trace = ScenarioTrace::default();
        let mut screenshot = None;

        let outcome = match self.factory.open().await {
            Ok(mut session) => {
                let outcome = self.drive(scenario, &mut session, &mut trace).await;
                if outcome.is_err() {
                    screenshot = self.capture_failure(scenario.name(), &mut session).await;
                }
                if let Err(e) = session.close().await {
                    warn!("Closing session for '{}' failed: {}", scenario.name(), e);
                }
                outcome
            }
            Err(e) => Err(e),
        };

        ScenarioResult {
            name: scenario.name().to_string(),
            success: outcome.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            trace,
            failure: outcome.as_ref().err().map(FailureDetail::from),
            screenshot,
        }
    }

    async fn drive(
        &self,
        scenario: &Scenario,
        session: &mut F::Session,
        trace: &mut ScenarioTrace,
    ) -> E2eResult<()> {
        if let Some(credentials) = &self.config.credentials {
            if self.config.playwright.storage_state.is_none() {
                let report = self.runner.run(session, &members::sign_in(credentials)).await?;
                trace.workflows.push(report);
            }
        }

        ScenarioDriver::new(&self.runner, &self.config.fixtures)
            .run(scenario, session, trace)
            .await
    }

    async fn capture_failure(
        &self,
        name: &str,
        session: &mut F::Session,
    ) -> Option<ScreenshotArtifact> {
        let path = self
            .config
            .output_dir
            .join("screenshots")
            .join(format!("{}.png", artifact_name(name)));

        if let Err(e) = session.screenshot(&path).await {
            warn!("Failure screenshot for '{}' not captured: {}", name, e);
            return None;
        }

        match hash_file(&path) {
            Ok(sha256) => {
                debug!("Failure screenshot: {} ({})", path.display(), sha256);
                Some(ScreenshotArtifact { path, sha256 })
            }
            Err(e) => {
                warn!("Failure screenshot for '{}' unreadable: {}", name, e);
                None
            }
        }
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// File stem for a scenario's artifacts; scenario names come from user YAML
fn artifact_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "scenario".to_string()
    } else {
        stem
    }
}

/// Hash a file using SHA256
fn hash_file(path: &Path) -> E2eResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
