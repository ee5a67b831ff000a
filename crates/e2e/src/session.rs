//! The browser session seam
//!
//! Everything the harness knows about a browser goes through [`Session`].
//! Waiting is not part of this trait: sessions answer instantly and the
//! runner polls them (see [`crate::wait`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::E2eResult;
use crate::workflow::Locator;

/// A file download delivered to the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub suggested_filename: String,
}

/// One open page and its application state
#[async_trait]
pub trait Session: Send {
    /// Navigate to an absolute URL
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    async fn click(&mut self, target: &Locator) -> E2eResult<()>;

    async fn fill(&mut self, target: &Locator, value: &str) -> E2eResult<()>;

    /// Press a key on whatever element has focus
    async fn press_key(&mut self, key: &str) -> E2eResult<()>;

    /// Type text into whatever element has focus
    async fn type_text(&mut self, text: &str) -> E2eResult<()>;

    async fn select_option(&mut self, target: &Locator, value: &str) -> E2eResult<()>;

    /// Number of elements currently matching the target
    async fn count(&mut self, target: &Locator) -> E2eResult<usize>;

    async fn inner_text(&mut self, target: &Locator) -> E2eResult<String>;

    async fn input_value(&mut self, target: &Locator) -> E2eResult<String>;

    /// Pop the oldest download that has not been taken yet
    async fn take_download(&mut self) -> E2eResult<Option<Download>>;

    async fn current_url(&mut self) -> E2eResult<String>;

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()>;

    async fn close(&mut self) -> E2eResult<()>;
}

/// Opens fresh, isolated sessions
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: Session;

    async fn open(&self) -> E2eResult<Self::Session>;
}
