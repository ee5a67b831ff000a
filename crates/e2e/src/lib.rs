//! Ghost admin members E2E harness
//!
//! This crate drives the members section of the Ghost admin in a real
//! browser and checks member-management workflows end to end:
//! - Drives Playwright through a long-lived Node driver process
//! - Runs ordered workflows of UI steps, waiting cooperatively on the page
//! - Seeds typed member fixtures through the same UI workflows
//! - Compares observed page state against expected literals
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  SuiteRunner<SessionFactory>                 │
//! │    ├── start_app() -> AppHandle (health check)              │
//! │    ├── per scenario: factory.open() -> Session              │
//! │    │     ├── sign_in (optional)                              │
//! │    │     └── ScenarioDriver::run(scenario)                   │
//! │    │           ├── FixtureSeeder::seed(records)              │
//! │    │           ├── WorkflowRunner::run(workflow)             │
//! │    │           ├── observe::* -> ObservedState               │
//! │    │           └── assert::expect_* (AssertionFailure)       │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Workflow (YAML or builders in `members`)                   │
//! │    └── steps: [WorkflowStep]                                │
//! │          navigate | click | fill | press_key | type_text    │
//! │          wait_for_selector | select_option                  │
//! │          wait_for_download                                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod assert;
pub mod config;
pub mod error;
pub mod fixture;
pub mod members;
pub mod observe;
pub mod playwright;
pub mod runner;
pub mod scenarios;
pub mod seeder;
pub mod session;
pub mod suite;
pub mod wait;
pub mod workflow;

pub use config::SuiteConfig;
pub use error::{E2eError, E2eResult};
pub use fixture::MemberRecord;
pub use runner::{WorkflowReport, WorkflowRunner};
pub use session::{Session, SessionFactory};
pub use suite::SuiteRunner;
pub use workflow::{Locator, Workflow, WorkflowStep};
