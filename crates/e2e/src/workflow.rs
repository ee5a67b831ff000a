//! Declarative workflow definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// An ordered sequence of UI steps representing one user-facing task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique name for this workflow
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering workflows
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<WorkflowStep>,
}

/// Addresses one element on the page, optionally inside an iframe
///
/// In YAML a locator is either a bare selector string or a map with
/// `selector`, `frame` and `nth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocatorRepr")]
pub struct Locator {
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocatorRepr {
    Bare(String),
    Full {
        selector: String,
        #[serde(default)]
        frame: Option<String>,
        #[serde(default)]
        nth: Option<usize>,
    },
}

impl From<LocatorRepr> for Locator {
    fn from(repr: LocatorRepr) -> Self {
        match repr {
            LocatorRepr::Bare(selector) => Locator::css(selector),
            LocatorRepr::Full { selector, frame, nth } => Locator { selector, frame, nth },
        }
    }
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            frame: None,
            nth: None,
        }
    }

    /// Button located by its ARIA role and accessible name
    pub fn role_button(name: &str) -> Self {
        Self::css(format!("role=button[name=\"{}\"]", name))
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    pub fn in_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(frame) = &self.frame {
            write!(f, "{} |> ", frame)?;
        }
        write!(f, "{}", self.selector)?;
        if let Some(n) = self.nth {
            write!(f, " [{}]", n)?;
        }
        Ok(())
    }
}

/// A single step in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkflowStep {
    /// Navigate to a URL (relative to base)
    Navigate { url: String },

    /// Click an element once it is present
    Click { selector: Locator },

    /// Fill an input field once it is present
    Fill { selector: Locator, value: String },

    /// Press a key on the focused element
    PressKey { key: String },

    /// Type text into the focused element
    TypeText { text: String },

    /// Wait for an element to appear
    WaitForSelector {
        selector: Locator,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Select an option from a dropdown once it is present
    SelectOption { selector: Locator, value: String },

    /// Wait for a download to be delivered to the session
    WaitForDownload {
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
}

impl WorkflowStep {
    /// Short name used in logs, reports and timeout conditions
    pub fn describe(&self) -> String {
        match self {
            WorkflowStep::Navigate { url } => format!("navigate:{}", url),
            WorkflowStep::Click { selector } => format!("click:{}", selector),
            WorkflowStep::Fill { selector, .. } => format!("fill:{}", selector),
            WorkflowStep::PressKey { key } => format!("press:{}", key),
            WorkflowStep::TypeText { text } => {
                format!("type:{}", text.chars().take(30).collect::<String>())
            }
            WorkflowStep::WaitForSelector { selector, .. } => format!("wait:{}", selector),
            WorkflowStep::SelectOption { selector, value } => {
                format!("select:{}={}", selector, value)
            }
            WorkflowStep::WaitForDownload { .. } => "wait:download".to_string(),
        }
    }
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn navigate(self, url: impl Into<String>) -> Self {
        self.step(WorkflowStep::Navigate { url: url.into() })
    }

    pub fn click(self, selector: Locator) -> Self {
        self.step(WorkflowStep::Click { selector })
    }

    pub fn fill(self, selector: Locator, value: impl Into<String>) -> Self {
        self.step(WorkflowStep::Fill {
            selector,
            value: value.into(),
        })
    }

    pub fn press_key(self, key: impl Into<String>) -> Self {
        self.step(WorkflowStep::PressKey { key: key.into() })
    }

    pub fn type_text(self, text: impl Into<String>) -> Self {
        self.step(WorkflowStep::TypeText { text: text.into() })
    }

    pub fn wait_for(self, selector: Locator) -> Self {
        self.step(WorkflowStep::WaitForSelector {
            selector,
            timeout_ms: None,
        })
    }

    pub fn select_option(self, selector: Locator, value: impl Into<String>) -> Self {
        self.step(WorkflowStep::SelectOption {
            selector,
            value: value.into(),
        })
    }

    pub fn wait_for_download(self) -> Self {
        self.step(WorkflowStep::WaitForDownload { timeout_ms: None })
    }

    /// Append all steps of another workflow
    pub fn then(mut self, other: Workflow) -> Self {
        self.steps.extend(other.steps);
        self
    }

    /// Parse a workflow from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let workflow: Self = serde_yaml::from_str(yaml)?;
        if workflow.steps.is_empty() {
            return Err(E2eError::SpecParse(format!(
                "workflow '{}' has no steps",
                workflow.name
            )));
        }
        Ok(workflow)
    }

    /// Parse a workflow from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all workflows from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut workflows = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            workflows.push(Self::from_file(entry.path())?);
        }

        Ok(workflows)
    }
}
