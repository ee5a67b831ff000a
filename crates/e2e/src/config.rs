//! Suite configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::app::AppConfig;
use crate::error::{E2eError, E2eResult};
use crate::fixture::load_members;
use crate::members::Credentials;
use crate::playwright::PlaywrightConfig;
use crate::runner::RunnerConfig;
use crate::scenarios::ScenarioFixtures;

/// Everything a suite run needs, loadable from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Site to test and how to reach it
    pub app: AppConfig,

    /// Browser settings
    pub playwright: PlaywrightConfig,

    /// Step and download wait budgets; `base_url` follows `app.base_url`
    pub runner: RunnerConfig,

    /// Staff login used when no saved storage state is configured
    pub credentials: Option<Credentials>,

    /// Inputs for the built-in scenarios
    pub fixtures: ScenarioFixtures,

    /// YAML list of members to seed for the export scenarios, replacing the defaults
    pub members_file: Option<PathBuf>,

    /// Directory of extra YAML workflows to run after the built-ins
    pub workflows_dir: Option<PathBuf>,

    /// Where results and failure screenshots go
    pub output_dir: PathBuf,

    /// Stop the suite at the first failed scenario
    pub fail_fast: bool,
}

impl SuiteConfig {
    /// Parse a config from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.normalize();
        Ok(config)
    }

    /// Parse a config from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Replace the export fixtures with the records in `members_file`, if set
    pub fn load_members_file(&mut self) -> E2eResult<()> {
        if let Some(path) = &self.members_file {
            let members = load_members(path)?;
            if members.is_empty() {
                return Err(E2eError::SpecParse(format!(
                    "{}: no members to seed",
                    path.display()
                )));
            }
            self.fixtures.export_members = members;
        }
        Ok(())
    }

    /// Keep derived settings consistent after overrides
    pub fn normalize(&mut self) {
        self.runner.base_url = self.app.base_url.clone();
        if self.output_dir.as_os_str().is_empty() {
            self.output_dir = PathBuf::from("test-results");
        }
    }
}
