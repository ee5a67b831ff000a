//! Cooperative waiting on remote UI conditions

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};

/// Future returned by a condition probe, borrowing the polled subject
pub type Probe<'a> = Pin<Box<dyn Future<Output = E2eResult<bool>> + Send + 'a>>;

/// Timeout budget and polling cadence for one wait
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaitPolicy {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            poll_interval_ms: 50,
        }
    }
}

impl WaitPolicy {
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        Self { timeout_ms, ..self }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Poll `probe` until it reports `true` or the policy's budget runs out.
///
/// The probe is evaluated at least once. A probe that hangs is cut off at
/// the deadline. Probe errors are returned as-is and end the wait.
pub async fn await_condition<S, F>(
    subject: &mut S,
    condition: &str,
    policy: WaitPolicy,
    mut probe: F,
) -> E2eResult<()>
where
    S: ?Sized + Send,
    F: for<'a> FnMut(&'a mut S) -> Probe<'a>,
{
    let budget = policy.timeout();
    let deadline = Instant::now() + budget;
    let mut polls = 0u32;

    loop {
        polls += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());

        match timeout(remaining, probe(subject)).await {
            Ok(Ok(true)) => {
                debug!("Condition met after {} poll(s): {}", polls, condition);
                return Ok(());
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => break,
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(policy.poll_interval().min(deadline - now)).await;
    }

    warn!(
        "Condition not met within {} ms ({} polls): {}",
        policy.timeout_ms, polls, condition
    );
    Err(E2eError::StepTimeout {
        condition: condition.to_string(),
        timeout_ms: policy.timeout_ms,
    })
}
