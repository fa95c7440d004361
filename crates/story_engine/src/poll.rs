use std::time::Duration;

use story_logging::{story_debug, story_info, story_warn};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{GenerationJob, GenerationResult, MediaClient};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Polling cadence and budget.
///
/// The budget is a wall-clock timeout; the number of fetches it allows is
/// derived from it so that both call sites bound polling the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2_000),
            timeout: Duration::from_millis(300_000),
        }
    }
}

impl PollSettings {
    pub fn with_max_attempts(interval: Duration, attempts: u32) -> Self {
        Self {
            interval,
            timeout: interval * attempts.max(1),
        }
    }

    /// Number of ticks that fit in the timeout; never less than one.
    pub fn max_attempts(&self) -> u32 {
        let interval = self.interval.max(MIN_INTERVAL).as_millis();
        let attempts = self.timeout.as_millis() / interval;
        attempts.clamp(1, u128::from(u32::MAX)) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("no ready result after {attempts} attempts in {elapsed:?}")]
    Timeout { attempts: u32, elapsed: Duration },
    #[error("polling cancelled")]
    Cancelled,
}

/// Polls `job` until its result is ready, the budget runs out, or `cancel` fires.
///
/// The first fetch happens one interval after the call. Only one fetch is in
/// flight at a time; a failed fetch counts as a non-ready tick. The timeout is a
/// deadline: it also cuts short a tick wait or a fetch that would overrun it.
/// The timer is owned by this future and stops with it.
pub async fn poll(
    client: &dyn MediaClient,
    job: &GenerationJob,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> Result<GenerationResult, PollError> {
    let max_attempts = settings.max_attempts();
    let period = settings.interval.max(MIN_INTERVAL);
    let started = Instant::now();
    let deadline = started + settings.timeout;
    story_info!(
        "Polling {} job {} every {:?} for up to {:?} ({} attempts)",
        job.kind,
        job.id,
        period,
        settings.timeout,
        max_attempts
    );

    let mut ticker = time::interval_at(started + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts = 0u32;
    loop {
        // A tick landing exactly on the deadline still gets its fetch.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                story_debug!("Polling job {} cancelled after {} attempts", job.id, attempts);
                return Err(PollError::Cancelled);
            }
            _ = ticker.tick() => {}
            _ = time::sleep_until(deadline) => {
                return Err(timed_out(job, attempts, started));
            }
        }

        attempts += 1;
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                story_debug!("Polling job {} cancelled during fetch {}", job.id, attempts);
                return Err(PollError::Cancelled);
            }
            fetched = client.fetch(job.kind, &job.id) => fetched,
            _ = time::sleep_until(deadline) => {
                story_debug!("Fetch {} for job {} still running at the deadline", attempts, job.id);
                return Err(timed_out(job, attempts, started));
            }
        };

        match fetched {
            Ok(result) if result.is_ready(job.kind) => {
                story_info!(
                    "Job {} ready after {} attempts ({:?})",
                    job.id,
                    attempts,
                    started.elapsed()
                );
                return Ok(result);
            }
            Ok(_) => story_debug!(
                "Job {} not ready (attempt {}/{})",
                job.id,
                attempts,
                max_attempts
            ),
            Err(err) => story_warn!(
                "Fetching job {} failed (attempt {}/{}): {}",
                job.id,
                attempts,
                max_attempts,
                err
            ),
        }

        if attempts >= max_attempts {
            return Err(timed_out(job, attempts, started));
        }
    }
}

fn timed_out(job: &GenerationJob, attempts: u32, started: Instant) -> PollError {
    let elapsed = started.elapsed();
    story_warn!("Job {} timed out after {} attempts ({:?})", job.id, attempts, elapsed);
    PollError::Timeout { attempts, elapsed }
}
