//! Fixture seeding through the create-member workflow

use tracing::info;

use crate::error::E2eResult;
use crate::fixture::MemberRecord;
use crate::members;
use crate::runner::{WorkflowReport, WorkflowRunner};
use crate::session::Session;

/// Creates members one at a time through the admin UI
pub struct FixtureSeeder<'r> {
    runner: &'r WorkflowRunner,
}

impl<'r> FixtureSeeder<'r> {
    pub fn new(runner: &'r WorkflowRunner) -> Self {
        Self { runner }
    }

    /// Run the create workflow once per record, in order.
    ///
    /// Stops at the first failed creation; records after it are not created.
    pub async fn seed<S: Session + ?Sized>(
        &self,
        session: &mut S,
        records: &[MemberRecord],
    ) -> E2eResult<Vec<WorkflowReport>> {
        info!("Seeding {} member(s)", records.len());

        let mut reports = Vec::with_capacity(records.len());
        for record in records {
            let report = self.runner.run(session, &members::create_member(record)).await?;
            reports.push(report);
        }

        Ok(reports)
    }
}
