//! Assertion layer: pure comparisons of observed UI state

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{E2eError, E2eResult};

/// A value read from the page after a workflow completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ObservedValue {
    Text(String),
    Count(usize),
    Filename(String),
}

impl fmt::Display for ObservedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservedValue::Text(s) | ObservedValue::Filename(s) => write!(f, "{}", s),
            ObservedValue::Count(n) => write!(f, "{}", n),
        }
    }
}

/// A named snapshot of one property of the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedState {
    pub property: String,
    pub value: ObservedValue,
}

impl ObservedState {
    pub fn new(property: impl Into<String>, value: ObservedValue) -> Self {
        Self {
            property: property.into(),
            value,
        }
    }

    fn fail(&self, expected: impl fmt::Display) -> E2eError {
        E2eError::AssertionFailure {
            property: self.property.clone(),
            expected: expected.to_string(),
            observed: self.value.to_string(),
        }
    }
}

/// Observed text must equal `expected` exactly
pub fn expect_text(observed: &ObservedState, expected: &str) -> E2eResult<()> {
    match &observed.value {
        ObservedValue::Text(s) | ObservedValue::Filename(s) if s == expected => Ok(()),
        _ => Err(observed.fail(expected)),
    }
}

/// Observed element count must equal `expected`
pub fn expect_count(observed: &ObservedState, expected: usize) -> E2eResult<()> {
    match observed.value {
        ObservedValue::Count(n) if n == expected => Ok(()),
        _ => Err(observed.fail(expected)),
    }
}

/// At least one element must be present
pub fn expect_present(observed: &ObservedState) -> E2eResult<()> {
    match observed.value {
        ObservedValue::Count(n) if n > 0 => Ok(()),
        _ => Err(observed.fail("at least 1")),
    }
}

/// Observed text must contain `needle`
pub fn expect_contains(observed: &ObservedState, needle: &str) -> E2eResult<()> {
    match &observed.value {
        ObservedValue::Text(s) | ObservedValue::Filename(s) if s.contains(needle) => Ok(()),
        _ => Err(observed.fail(format!("contains {:?}", needle))),
    }
}

/// Observed filename must match a shell-style glob such as `*.csv`
pub fn expect_filename_matches(observed: &ObservedState, pattern: &str) -> E2eResult<()> {
    let glob = glob::Pattern::new(pattern)
        .map_err(|e| E2eError::SpecParse(format!("bad filename pattern {}: {}", pattern, e)))?;
    match &observed.value {
        ObservedValue::Filename(s) | ObservedValue::Text(s) if glob.matches(s) => Ok(()),
        _ => Err(observed.fail(format!("matches {}", pattern))),
    }
}

/// Extract N from an export label such as "Export selected members (3)"
pub fn parse_export_count(label: &str) -> Option<usize> {
    let re = Regex::new(r"\((\d+)\)\s*$").ok()?;
    re.captures(label.trim())?.get(1)?.as_str().parse().ok()
}
