use tracing::info;

use crate::error::Result;
use crate::transport::Transport;

/// Decides, once per calendar day at the configured hour, whether the
/// meter's resettable energy counter gets cleared.
#[derive(Debug)]
pub struct ResetState {
    last_reset_day: u32,
    reset_hour: u32,
    reset_minute: u32,
}

impl ResetState {
    /// `today` seeds the last-reset day so a freshly started daemon does
    /// not clear the counter immediately.
    pub fn new(reset_hour: u32, reset_minute: u32, today: u32) -> Self {
        Self {
            last_reset_day: today,
            reset_hour,
            reset_minute,
        }
    }

    /// True only on a new day, in the configured hour, at or past the
    /// configured minute. The minute is a lower bound so a delayed poll
    /// tick within the same hour still fires.
    pub fn should_reset(&self, today: u32, hour: u32, minute: u32) -> bool {
        today != self.last_reset_day && hour == self.reset_hour && minute >= self.reset_minute
    }

    /// Trigger the reset when due. Records the day before touching the
    /// wire, so the counter is cleared at most once per day however often
    /// this is polled within the matching minute window.
    pub fn check(
        &mut self,
        transport: Option<&mut dyn Transport>,
        today: u32,
        hour: u32,
        minute: u32,
    ) -> Result<bool> {
        if !self.should_reset(today, hour, minute) {
            return Ok(false);
        }
        self.last_reset_day = today;
        if let Some(transport) = transport {
            transport.reset_energy_counter()?;
        }
        info!(day = today, "energy counter reset triggered");
        Ok(true)
    }
}
