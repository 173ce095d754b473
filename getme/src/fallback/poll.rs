//! Poll loops with optional deadline and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{FallbackError, FallbackResult, Stage};

/// Longest uninterrupted sleep, so cancellation is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// How often to poll, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between two checks.
    pub interval: Duration,
    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    /// Poll at `interval` with no upper bound.
    pub const fn every(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Shared cancellation signal for a fallback run.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Call `check` until it returns `true`, sleeping `policy.interval` between
/// calls.
///
/// Errors from `check` end the loop unchanged.
pub(crate) fn poll_until<F>(
    stage: Stage,
    policy: &PollPolicy,
    cancel: &CancelFlag,
    mut check: F,
) -> FallbackResult<()>
where
    F: FnMut() -> FallbackResult<bool>,
{
    let started = Instant::now();
    let mut attempts = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Err(FallbackError::Cancelled { stage });
        }

        attempts += 1;
        if check()? {
            debug!(stage = %stage, attempts, "Poll condition met");
            return Ok(());
        }

        let mut pause = policy.interval;
        if let Some(timeout) = policy.timeout {
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(FallbackError::PollTimeout { stage, waited });
            }
            pause = pause.min(timeout - waited);
        }

        sleep(pause, cancel);
    }
}

fn sleep(duration: Duration, cancel: &CancelFlag) {
    let deadline = Instant::now() + duration;
    loop {
        let now = Instant::now();
        if now >= deadline || cancel.is_cancelled() {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}
