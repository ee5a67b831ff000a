//! Typed member fixtures

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::E2eResult;

/// Input for one run of the create-member workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub name: String,
    pub email: String,
    pub note: String,
    pub label: String,
}

impl MemberRecord {
    pub fn new(name: &str, email: &str, note: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            note: note.to_string(),
            label: label.to_string(),
        }
    }
}

/// Replacement values for the edit-member workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEdit {
    pub name: String,
    pub email: String,
    pub note: String,

    /// Remove the first label with Backspace
    #[serde(default = "default_true")]
    pub clear_label: bool,

    /// Flip the newsletter subscription toggle
    #[serde(default = "default_true")]
    pub toggle_subscription: bool,
}

fn default_true() -> bool {
    true
}

/// The single member created by the create scenario
pub fn test_member() -> MemberRecord {
    MemberRecord::new(
        "Test Member",
        "tester@testmember.com",
        "This is a test member",
        "Test Label",
    )
}

/// The values the edit scenario writes over [`test_member`]
pub fn edited_member() -> MemberEdit {
    MemberEdit {
        name: "Test Member Edited".to_string(),
        email: "tester.edited@example.com".to_string(),
        note: "This is an edited test member".to_string(),
        clear_label: true,
        toggle_subscription: true,
    }
}

/// Members seeded before the export scenarios
pub fn export_members() -> Vec<MemberRecord> {
    (1..=3)
        .map(|i| {
            MemberRecord::new(
                &format!("Test Member {}", i),
                &format!("test@member{}.com", i),
                "This is a test member",
                "Test Label",
            )
        })
        .collect()
}

/// Load a list of member records from a YAML file
pub fn load_members(path: &Path) -> E2eResult<Vec<MemberRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}
