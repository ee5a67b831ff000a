//! Workflow runner: executes steps in order against one session

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::error::{E2eError, E2eResult};
use crate::session::{Download, Session};
use crate::wait::{await_condition, WaitPolicy};
use crate::workflow::{Locator, Workflow, WorkflowStep};

/// Timing of one completed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub duration_ms: u64,
}

/// Completion signal for one workflow, with its trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub name: String,
    pub steps: Vec<StepResult>,
    pub downloads: Vec<Download>,
    pub duration_ms: u64,
}

/// Configuration for the workflow runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Base URL that relative navigations resolve against
    pub base_url: String,

    /// Budget for element waits and implicit actionability waits
    pub step: WaitPolicy,

    /// Budget for download waits
    pub download: WaitPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2368".to_string(),
            step: WaitPolicy::default(),
            download: WaitPolicy {
                timeout_ms: 15_000,
                poll_interval_ms: 100,
            },
        }
    }
}

/// Executes workflows step by step, stopping at the first failure
#[derive(Debug, Clone)]
pub struct WorkflowRunner {
    config: RunnerConfig,
}

struct DownloadProbe<'s, S: ?Sized> {
    session: &'s mut S,
    found: Option<Download>,
}

impl WorkflowRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Resolve a workflow URL against the base URL
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        if url.starts_with('/') {
            format!("{}{}", base, url)
        } else {
            format!("{}/{}", base, url)
        }
    }

    /// Run every step of `workflow` in order.
    ///
    /// The first failing step ends the workflow; later steps never run.
    pub async fn run<S: Session + ?Sized>(
        &self,
        session: &mut S,
        workflow: &Workflow,
    ) -> E2eResult<WorkflowReport> {
        let start = Instant::now();
        info!("Running workflow '{}' ({} steps)", workflow.name, workflow.steps.len());

        let mut steps = Vec::with_capacity(workflow.steps.len());
        let mut downloads = Vec::new();

        for (index, step) in workflow.steps.iter().enumerate() {
            let step_name = step.describe();
            let step_start = Instant::now();
            debug!("[{}#{}] {}", workflow.name, index + 1, step_name);

            match self.execute_step(session, step, &step_name).await {
                Ok(download) => {
                    downloads.extend(download);
                }
                Err(e) => {
                    error!(
                        "Workflow '{}' failed at step {} ({}): {}",
                        workflow.name,
                        index + 1,
                        step_name,
                        e
                    );
                    return Err(e);
                }
            }

            steps.push(StepResult {
                step_name,
                duration_ms: step_start.elapsed().as_millis() as u64,
            });
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Workflow '{}' completed ({} ms)", workflow.name, duration_ms);

        Ok(WorkflowReport {
            name: workflow.name.clone(),
            steps,
            downloads,
            duration_ms,
        })
    }

    async fn execute_step<S: Session + ?Sized>(
        &self,
        session: &mut S,
        step: &WorkflowStep,
        step_name: &str,
    ) -> E2eResult<Option<Download>> {
        match step {
            WorkflowStep::Navigate { url } => {
                let url = self.resolve_url(url);
                session.goto(&url).await.map_err(|e| match e {
                    E2eError::NavigationFailure { .. } => e,
                    other => E2eError::NavigationFailure {
                        url: url.clone(),
                        reason: other.to_string(),
                    },
                })?;
            }
            WorkflowStep::Click { selector } => {
                self.wait_present(session, selector, step_name, self.config.step).await?;
                session.click(selector).await?;
            }
            WorkflowStep::Fill { selector, value } => {
                self.wait_present(session, selector, step_name, self.config.step).await?;
                session.fill(selector, value).await?;
            }
            WorkflowStep::PressKey { key } => {
                session.press_key(key).await?;
            }
            WorkflowStep::TypeText { text } => {
                session.type_text(text).await?;
            }
            WorkflowStep::WaitForSelector { selector, timeout_ms } => {
                let policy = match timeout_ms {
                    Some(ms) => self.config.step.with_timeout_ms(*ms),
                    None => self.config.step,
                };
                self.wait_present(session, selector, step_name, policy).await?;
            }
            WorkflowStep::SelectOption { selector, value } => {
                self.wait_present(session, selector, step_name, self.config.step).await?;
                session.select_option(selector, value).await?;
            }
            WorkflowStep::WaitForDownload { timeout_ms } => {
                let policy = match timeout_ms {
                    Some(ms) => self.config.download.with_timeout_ms(*ms),
                    None => self.config.download,
                };
                let mut probe = DownloadProbe {
                    session,
                    found: None,
                };
                await_condition(&mut probe, step_name, policy, |p| {
                    Box::pin(async move {
                        match p.session.take_download().await? {
                            Some(download) => {
                                p.found = Some(download);
                                Ok(true)
                            }
                            None => Ok(false),
                        }
                    })
                })
                .await?;
                if let Some(download) = &probe.found {
                    info!("Download received: {}", download.suggested_filename);
                }
                return Ok(probe.found);
            }
        }
        Ok(None)
    }

    /// Wait until the target (including its `nth` index) is on the page
    async fn wait_present<S: Session + ?Sized>(
        &self,
        session: &mut S,
        target: &Locator,
        condition: &str,
        policy: WaitPolicy,
    ) -> E2eResult<()> {
        let target = target.clone();
        let needed = target.nth.unwrap_or(0);
        await_condition(session, condition, policy, move |s| {
            let target = target.clone();
            Box::pin(async move { Ok(s.count(&target).await? > needed) })
        })
        .await
    }
}
