//! Bounded retry planning.
//!
//! Attempts against one target form a short ladder: refresh the page in
//! place first, tear the whole driver down on every later failure, and
//! stop dead once the attempt budget is spent. The planner is a pure
//! function of the attempt number so the ladder can be tested without a
//! browser in sight.

use std::time::Duration;

/// Escalation rung for a follow-up attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationTier {
    /// Reload the current page, keeping the session alive.
    Refresh,
    /// Replace the driver with a freshly created one.
    Restart,
}

/// What the session does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Retry {
        tier: EscalationTier,
        backoff: Duration,
    },
    /// Budget exhausted; the target is recorded as aborted, never errored.
    Abort,
}

/// Retry budget for one target.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts allowed in total, the first try included.
    pub max_attempts: u32,
    /// Linear backoff unit; the sleep before attempt n+1 is n units.
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff_unit,
        }
    }
}

/// Plan the follow-up to failed attempt number `attempt` (1-based).
///
/// The first failure earns an in-place refresh; every later failure a
/// driver restart. `max_attempts` is a hard ceiling: once reached the plan
/// is always [`NextStep::Abort`], so the ladder cannot loop.
#[must_use]
pub fn plan_retry(attempt: u32, policy: &RetryPolicy) -> NextStep {
    if attempt >= policy.max_attempts {
        return NextStep::Abort;
    }
    let tier = if attempt == 1 {
        EscalationTier::Refresh
    } else {
        EscalationTier::Restart
    };
    NextStep::Retry {
        tier,
        backoff: policy.backoff_unit * attempt,
    }
}
