//! Snapshots of rendered state, taken after a workflow completes

use tracing::debug;

use crate::assert::{ObservedState, ObservedValue};
use crate::error::{E2eError, E2eResult};
use crate::runner::WorkflowReport;
use crate::session::Session;
use crate::wait::{await_condition, WaitPolicy};
use crate::workflow::Locator;

/// Number of elements matching `target`
pub async fn count<S: Session + ?Sized>(
    session: &mut S,
    target: &Locator,
    property: &str,
) -> E2eResult<ObservedState> {
    let n = session.count(target).await?;
    debug!("observed {} = {}", property, n);
    Ok(ObservedState::new(property, ObservedValue::Count(n)))
}

/// Element count once it has settled on `expected`, or the last count seen.
///
/// Lists render asynchronously after navigation, so a count taken right
/// away can be stale. A count that never settles is returned as observed
/// and left for the assertion to reject.
pub async fn settled_count<S: Session + ?Sized>(
    session: &mut S,
    target: &Locator,
    property: &str,
    expected: usize,
    policy: WaitPolicy,
) -> E2eResult<ObservedState> {
    let probe_target = target.clone();
    let condition = format!("{} == {}", property, expected);
    match await_condition(session, &condition, policy, move |s| {
        let target = probe_target.clone();
        Box::pin(async move { Ok(s.count(&target).await? == expected) })
    })
    .await
    {
        Ok(()) | Err(E2eError::StepTimeout { .. }) => count(session, target, property).await,
        Err(e) => Err(e),
    }
}

/// Trimmed inner text of `target` once `settled` accepts it, or the last text seen.
///
/// Labels re-render after the state they describe changes. Until the target
/// exists a probe counts as unsettled rather than failing the wait.
pub async fn settled_text<S, P>(
    session: &mut S,
    target: &Locator,
    property: &str,
    policy: WaitPolicy,
    settled: P,
) -> E2eResult<ObservedState>
where
    S: Session + ?Sized,
    P: Fn(&str) -> bool + Clone + Send + 'static,
{
    let probe_target = target.clone();
    let condition = format!("{} settled", property);
    match await_condition(session, &condition, policy, move |s| {
        let target = probe_target.clone();
        let settled = settled.clone();
        Box::pin(async move {
            if s.count(&target).await? == 0 {
                return Ok(false);
            }
            let text = s.inner_text(&target).await?;
            Ok(settled(text.trim()))
        })
    })
    .await
    {
        Ok(()) | Err(E2eError::StepTimeout { .. }) => text(session, target, property).await,
        Err(e) => Err(e),
    }
}

/// Trimmed inner text of `target`
pub async fn text<S: Session + ?Sized>(
    session: &mut S,
    target: &Locator,
    property: &str,
) -> E2eResult<ObservedState> {
    let text = session.inner_text(target).await?.trim().to_string();
    debug!("observed {} = {:?}", property, text);
    Ok(ObservedState::new(property, ObservedValue::Text(text)))
}

/// Current value of the input at `target`
pub async fn input_value<S: Session + ?Sized>(
    session: &mut S,
    target: &Locator,
    property: &str,
) -> E2eResult<ObservedState> {
    let value = session.input_value(target).await?;
    debug!("observed {} = {:?}", property, value);
    Ok(ObservedState::new(property, ObservedValue::Text(value)))
}

/// Suggested filename of the last download a workflow received
pub fn download(report: &WorkflowReport, property: &str) -> E2eResult<ObservedState> {
    let download = report.downloads.last().ok_or_else(|| E2eError::AssertionFailure {
        property: property.to_string(),
        expected: "a download".to_string(),
        observed: format!("no download in workflow '{}'", report.name),
    })?;
    Ok(ObservedState::new(
        property,
        ObservedValue::Filename(download.suggested_filename.clone()),
    ))
}
