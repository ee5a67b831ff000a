//! The site under test: attach to a running one or spawn it, then poll it healthy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::wait::{await_condition, WaitPolicy};

/// Grace period between SIGTERM and a hard kill
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Configuration for reaching (and optionally starting) the site under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Site URL, without the admin path
    pub base_url: String,

    /// Command that starts the site; `None` attaches to a running one
    pub command: Option<Vec<String>>,

    /// Working directory for `command`
    pub working_dir: Option<PathBuf>,

    /// Path polled until it answers with a success status
    pub health_path: String,

    /// Timeout for the site to become healthy
    pub startup_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2368".to_string(),
            command: None,
            working_dir: None,
            health_path: "/ghost/api/admin/site/".to_string(),
            startup_timeout_ms: 60_000,
        }
    }
}

/// Health endpoint state carried across polls
struct HealthCheck {
    client: reqwest::Client,
    url: String,
    attempts: usize,
}

impl HealthCheck {
    async fn poll(&mut self) -> bool {
        self.attempts += 1;
        match self.client.get(&self.url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                debug!("Health check {} returned {}", self.url, resp.status());
                false
            }
            // Refused connections are normal while the site boots
            Err(e) if e.is_connect() => false,
            Err(e) => {
                warn!("Health check error: {}", e);
                false
            }
        }
    }
}

/// The site under test; owns its process when this harness started it
pub struct AppHandle {
    child: Option<Child>,
}

impl AppHandle {
    /// Start the site if configured to, then wait until it is healthy
    pub async fn start(config: &AppConfig) -> E2eResult<Self> {
        let child = match &config.command {
            Some(command) => Some(spawn(command, config)?),
            None => {
                info!("Attaching to running site at {}", config.base_url);
                None
            }
        };
        let mut handle = AppHandle { child };

        let mut check = HealthCheck {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()?,
            url: format!("{}{}", config.base_url.trim_end_matches('/'), config.health_path),
            attempts: 0,
        };
        let policy = WaitPolicy {
            timeout_ms: config.startup_timeout_ms,
            poll_interval_ms: 100,
        };

        info!("Waiting for site at {} ...", check.url);
        let healthy = await_condition(&mut check, "site healthy", policy, |c| {
            Box::pin(async move { Ok(c.poll().await) })
        })
        .await;

        match healthy {
            Ok(()) => {
                info!("Site is healthy after {} check(s)", check.attempts);
                Ok(handle)
            }
            Err(E2eError::StepTimeout { .. }) => {
                handle.stop().await?;
                Err(E2eError::AppHealthCheck(check.attempts))
            }
            Err(e) => {
                handle.stop().await?;
                Err(e)
            }
        }
    }

    /// Whether this handle owns a process that has not exited yet
    pub fn is_running(&mut self) -> bool {
        match &mut self.child {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Stop the site if this handle started it: SIGTERM, then kill after a grace period
    pub async fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                info!("Stopping site (pid: {})", pid);
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                    if let Ok(status) = tokio::time::timeout(STOP_GRACE, child.wait()).await {
                        debug!("Site exited: {:?}", status?);
                        return Ok(());
                    }
                    warn!("Site ignored SIGTERM for {:?}, killing", STOP_GRACE);
                }
            }
        }

        child.kill().await?;
        Ok(())
    }
}

impl Drop for AppHandle {
    fn drop(&mut self) {
        // No runtime to await on here; `kill_on_drop` reaps the rest
        if let Some(child) = &mut self.child {
            let _ = child.start_kill();
        }
    }
}

fn spawn(command: &[String], config: &AppConfig) -> E2eResult<Child> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| E2eError::AppStartup("empty start command".to_string()))?;

    info!("Starting site: {}", command.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    cmd.spawn()
        .map_err(|e| E2eError::AppStartup(format!("Failed to spawn {}: {}", program, e)))
}
