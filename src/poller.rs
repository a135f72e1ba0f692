//! Async Job Poller
//!
//! Drives the submit → poll → terminal lifecycle shared by every
//! asynchronous provider, decoupling cadence and timeout policy from
//! each adapter's wire format. Adapters supply a `fetch_status` closure
//! that performs one status request and translates the provider's raw
//! vocabulary into the shared [`JobStatus`]; the poller owns the
//! waiting, the attempt budget and the terminal-stop invariant.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::{Result, UnmarkError};
use crate::types::Job;
use crate::utils::CancelHandle;

/// Poll cadence configuration.
///
/// Each adapter supplies its own values matching the backend's
/// documented SLA; the poller imposes none of its own.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Wait before each status check, including the first: remote
    /// job queues are never ready instantly and providers rate-limit
    /// eager pollers.
    pub interval: Duration,
    /// Maximum number of status checks before giving up.
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Poll a job until its first terminal status.
///
/// Calls `fetch_status` up to `policy.max_attempts` times, waiting
/// `policy.interval` before each call. Returns the job snapshot on the
/// first Succeeded/Failed observation and never checks again. An
/// exhausted budget with only non-terminal observations yields
/// [`UnmarkError::TimeoutError`]; the caller surfaces it as-is; the
/// poller never retries past its budget. A `fetch_status` error
/// propagates immediately, and cancellation observed during an interval
/// wait stops the loop without another request.
pub async fn poll_until_terminal<F, Fut>(
    policy: &PollPolicy,
    cancel: &CancelHandle,
    mut fetch_status: F,
) -> Result<Job>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Job>>,
{
    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            _ = cancel.cancelled() => return Err(UnmarkError::Cancelled),
            _ = sleep(policy.interval) => {}
        }

        let job = cancel.guard(fetch_status()).await?;
        if job.status.is_terminal() {
            debug!(
                job_id = %job.id,
                status = ?job.status,
                attempt,
                "job reached terminal status"
            );
            return Ok(job);
        }
        debug!(job_id = %job.id, status = ?job.status, attempt, "job still pending");
    }

    Err(UnmarkError::TimeoutError(format!(
        "job not finished after {} checks at {:?} intervals",
        policy.max_attempts, policy.interval
    )))
}
