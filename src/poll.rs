use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;

/// Nominal poll cadence.
pub const POLL_STEP_MS: u64 = 5000;

/// How long each iteration sleeps before re-checking the deadline. Bounds
/// CPU usage; the cadence can slip by at most one slice.
const SLICE: Duration = Duration::from_millis(10);

/// Work performed by the loop. `pump` services the broker connection and
/// is fatal on error; `tick` runs one publish/reset pass and handles its
/// own recoverable failures.
pub trait PollDriver {
    fn pump(&mut self) -> Result<()>;
    fn tick(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Drives the fixed 5-second cadence. Cancellation is observed only at
/// iteration boundaries, never inside a running tick.
pub struct PollLoop {
    state: LoopState,
    cancel: Arc<AtomicBool>,
    started: Instant,
}

impl PollLoop {
    pub fn new(cancel: Arc<AtomicBool>) -> Self {
        Self {
            state: LoopState::Idle,
            cancel,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Monotonic milliseconds since the loop was created.
    fn jiffies(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn run(&mut self, driver: &mut impl PollDriver) -> Result<()> {
        self.state = LoopState::Running;
        let mut deadline = self.jiffies();

        while self.state == LoopState::Running {
            if self.cancel.load(Ordering::Relaxed) {
                debug!("cancellation observed, stopping poll loop");
                break;
            }

            if let Err(err) = driver.pump() {
                self.state = LoopState::Stopped;
                return Err(err);
            }

            let now = self.jiffies();
            if now >= deadline {
                deadline = advance_deadline(deadline, now);
                driver.tick();
            }

            thread::sleep(SLICE);
        }

        self.state = LoopState::Stopped;
        Ok(())
    }
}

/// Next tick deadline. A deadline that would still lie in the past is
/// rebased to `now`, so a long-blocking tick cannot queue a burst of
/// stale ticks.
fn advance_deadline(deadline: u64, now: u64) -> u64 {
    let next = deadline + POLL_STEP_MS;
    if next <= now { now + POLL_STEP_MS } else { next }
}
