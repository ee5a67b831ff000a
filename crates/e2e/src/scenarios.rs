//! Member-management scenarios
//!
//! Every built-in scenario begins by loading the admin root in its own
//! session. Backend state is not reset between scenarios: edit, impersonate
//! and delete act on the member the create scenario left behind, so the
//! suite runs them in [`MembersScenario::ALL`] order.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assert::{self, ObservedState};
use crate::error::{E2eError, E2eResult};
use crate::fixture::{self, MemberEdit, MemberRecord};
use crate::members::{self, selectors, PORTAL_SIGNED_IN_HEADING};
use crate::observe;
use crate::runner::{WorkflowReport, WorkflowRunner};
use crate::seeder::FixtureSeeder;
use crate::session::Session;
use crate::workflow::{Locator, Workflow};

/// The built-in member scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MembersScenario {
    Create,
    Edit,
    Impersonate,
    Delete,
    ExportAll,
    ExportFiltered,
}

impl MembersScenario {
    /// Declaration order, which is also the required run order
    pub const ALL: [MembersScenario; 6] = [
        MembersScenario::Create,
        MembersScenario::Edit,
        MembersScenario::Impersonate,
        MembersScenario::Delete,
        MembersScenario::ExportAll,
        MembersScenario::ExportFiltered,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MembersScenario::Create => "a-member-can-be-created",
            MembersScenario::Edit => "a-member-can-be-edited",
            MembersScenario::Impersonate => "a-member-can-be-impersonated",
            MembersScenario::Delete => "a-member-can-be-deleted",
            MembersScenario::ExportAll => "all-members-can-be-exported",
            MembersScenario::ExportFiltered => "a-filtered-list-of-members-can-be-exported",
        }
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            MembersScenario::Create | MembersScenario::Edit | MembersScenario::Delete => {
                &["members", "crud"]
            }
            MembersScenario::Impersonate => &["members", "portal"],
            MembersScenario::ExportAll | MembersScenario::ExportFiltered => &["members", "export"],
        }
    }
}

/// Inputs shared by the built-in scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioFixtures {
    pub member: MemberRecord,
    pub edit: MemberEdit,
    pub export_members: Vec<MemberRecord>,

    /// Filter applied before the filtered export
    pub export_filter: String,

    /// Members expected to match `export_filter`; defaults to all seeded ones
    pub expected_filtered: Option<usize>,
}

impl Default for ScenarioFixtures {
    fn default() -> Self {
        Self {
            member: fixture::test_member(),
            edit: fixture::edited_member(),
            export_members: fixture::export_members(),
            export_filter: "subscribed".to_string(),
            expected_filtered: None,
        }
    }
}

/// A runnable scenario: built-in or loaded from YAML
#[derive(Debug, Clone)]
pub enum Scenario {
    Members(MembersScenario),
    Workflow(Workflow),
}

impl Scenario {
    pub fn name(&self) -> &str {
        match self {
            Scenario::Members(s) => s.name(),
            Scenario::Workflow(w) => &w.name,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        match self {
            Scenario::Members(s) => s.tags().contains(&tag),
            Scenario::Workflow(w) => w.tags.iter().any(|t| t == tag),
        }
    }

    /// All built-in scenarios followed by the given declarative workflows
    pub fn catalog(workflows: Vec<Workflow>) -> Vec<Scenario> {
        MembersScenario::ALL
            .iter()
            .copied()
            .map(Scenario::Members)
            .chain(workflows.into_iter().map(Scenario::Workflow))
            .collect()
    }

    /// Look up a scenario by name
    pub fn find(catalog: &[Scenario], name: &str) -> E2eResult<Scenario> {
        catalog
            .iter()
            .find(|s| s.name() == name)
            .cloned()
            .ok_or_else(|| E2eError::ScenarioNotFound(name.to_string()))
    }
}

/// Workflows run and values observed by one scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioTrace {
    pub workflows: Vec<WorkflowReport>,
    pub observations: Vec<ObservedState>,
}

impl ScenarioTrace {
    fn observed(&mut self, state: ObservedState) -> &ObservedState {
        let index = self.observations.len();
        self.observations.push(state);
        &self.observations[index]
    }
}

/// Runs scenario bodies against a session
pub struct ScenarioDriver<'r> {
    runner: &'r WorkflowRunner,
    fixtures: &'r ScenarioFixtures,
}

impl<'r> ScenarioDriver<'r> {
    pub fn new(runner: &'r WorkflowRunner, fixtures: &'r ScenarioFixtures) -> Self {
        Self { runner, fixtures }
    }

    /// Run one scenario. The first failure ends it.
    pub async fn run<S: Session + ?Sized>(
        &self,
        scenario: &Scenario,
        session: &mut S,
        trace: &mut ScenarioTrace,
    ) -> E2eResult<()> {
        info!("Scenario '{}'", scenario.name());

        match scenario {
            Scenario::Workflow(workflow) => {
                let report = self.runner.run(session, workflow).await?;
                trace.workflows.push(report);
                Ok(())
            }
            Scenario::Members(members_scenario) => {
                self.step(session, trace, &members::open_admin()).await?;
                match members_scenario {
                    MembersScenario::Create => self.create(session, trace).await,
                    MembersScenario::Edit => self.edit(session, trace).await,
                    MembersScenario::Impersonate => self.impersonate(session, trace).await,
                    MembersScenario::Delete => self.delete(session, trace).await,
                    MembersScenario::ExportAll => self.export_all(session, trace).await,
                    MembersScenario::ExportFiltered => self.export_filtered(session, trace).await,
                }
            }
        }
    }

    async fn step<S: Session + ?Sized>(
        &self,
        session: &mut S,
        trace: &mut ScenarioTrace,
        workflow: &Workflow,
    ) -> E2eResult<()> {
        let report = self.runner.run(session, workflow).await?;
        trace.workflows.push(report);
        Ok(())
    }

    /// The list must show exactly one row with this name and email
    async fn expect_single_row<S: Session + ?Sized>(
        &self,
        session: &mut S,
        trace: &mut ScenarioTrace,
        name: &str,
        email: &str,
    ) -> E2eResult<()> {
        self.step(session, trace, &members::open_members_list()).await?;

        let rows = Locator::css(selectors::ROWS);
        let policy = self.runner.config().step;
        let count = observe::settled_count(session, &rows, "member rows", 1, policy).await?;
        assert::expect_count(trace.observed(count), 1)?;

        let row_name = observe::text(session, &Locator::css(selectors::ROW_NAME).nth(0), "row name").await?;
        assert::expect_text(trace.observed(row_name), name)?;

        let row_email =
            observe::text(session, &Locator::css(selectors::ROW_EMAIL).nth(0), "row email").await?;
        assert::expect_text(trace.observed(row_email), email)
    }

    async fn create<S: Session + ?Sized>(&self, session: &mut S, trace: &mut ScenarioTrace) -> E2eResult<()> {
        let member = &self.fixtures.member;
        self.step(session, trace, &members::create_member(member)).await?;
        self.expect_single_row(session, trace, &member.name, &member.email).await
    }

    async fn edit<S: Session + ?Sized>(&self, session: &mut S, trace: &mut ScenarioTrace) -> E2eResult<()> {
        let edit = &self.fixtures.edit;
        self.step(session, trace, &members::edit_member(edit)).await?;
        self.expect_single_row(session, trace, &edit.name, &edit.email).await
    }

    async fn impersonate<S: Session + ?Sized>(
        &self,
        session: &mut S,
        trace: &mut ScenarioTrace,
    ) -> E2eResult<()> {
        self.step(session, trace, &members::reveal_impersonation_link()).await?;

        // The clipboard is unavailable headless; the input carries the same link
        let link = observe::input_value(
            session,
            &Locator::css(selectors::SIGNIN_URL_INPUT),
            "impersonation link",
        )
        .await?;
        let link = trace.observed(link).clone();
        assert::expect_contains(&link, "http")?;

        self.step(session, trace, &members::open_portal_as_member(&link.value.to_string()))
            .await?;

        let heading = Locator::css(selectors::PORTAL_HEADING).in_frame(selectors::PORTAL_POPUP_FRAME);
        let title = observe::text(session, &heading, "portal heading").await?;
        assert::expect_text(trace.observed(title), PORTAL_SIGNED_IN_HEADING)
    }

    async fn delete<S: Session + ?Sized>(&self, session: &mut S, trace: &mut ScenarioTrace) -> E2eResult<()> {
        let workflow = members::delete_member().wait_for(Locator::css(selectors::EMPTY_STATE));
        self.step(session, trace, &workflow).await?;

        let empty = observe::count(session, &Locator::css(selectors::EMPTY_STATE), "empty state").await?;
        assert::expect_present(trace.observed(empty))?;

        let rows = observe::count(session, &Locator::css(selectors::ROWS), "member rows").await?;
        assert::expect_count(trace.observed(rows), 0)
    }

    async fn export_all<S: Session + ?Sized>(
        &self,
        session: &mut S,
        trace: &mut ScenarioTrace,
    ) -> E2eResult<()> {
        let records = &self.fixtures.export_members;
        let reports = FixtureSeeder::new(self.runner).seed(session, records).await?;
        trace.workflows.extend(reports);

        self.step(session, trace, &members::open_members_list()).await?;
        let rows = Locator::css(selectors::ROWS);
        let policy = self.runner.config().step;
        let count = observe::settled_count(session, &rows, "member rows", records.len(), policy).await?;
        assert::expect_count(trace.observed(count), records.len())?;

        let workflow = members::open_list_actions().then(members::export_members());
        self.export(session, trace, workflow).await
    }

    async fn export_filtered<S: Session + ?Sized>(
        &self,
        session: &mut S,
        trace: &mut ScenarioTrace,
    ) -> E2eResult<()> {
        let filter = &self.fixtures.export_filter;
        self.step(session, trace, &members::apply_filter(filter)).await?;

        let expected = self
            .fixtures
            .expected_filtered
            .unwrap_or(self.fixtures.export_members.len());
        // The label re-renders with the filtered count after the filter applies
        let label = observe::settled_text(
            session,
            &Locator::css(selectors::EXPORT_LABEL),
            "export label",
            self.runner.config().step,
            move |label: &str| assert::parse_export_count(label) == Some(expected),
        )
        .await?;
        assert::expect_text(
            trace.observed(label),
            &format!("Export selected members ({})", expected),
        )?;
        info!("Export label reports {} filtered member(s)", expected);

        self.export(session, trace, members::export_members()).await
    }

    async fn export<S: Session + ?Sized>(
        &self,
        session: &mut S,
        trace: &mut ScenarioTrace,
        workflow: Workflow,
    ) -> E2eResult<()> {
        let report = self.runner.run(session, &workflow).await?;
        let filename = observe::download(&report, "export filename")?;
        trace.workflows.push(report);
        assert::expect_filename_matches(trace.observed(filename), "*.csv")
    }
}
