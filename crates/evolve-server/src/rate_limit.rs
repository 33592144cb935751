//! Cooldown between generation requests.

use evolve_util::SharedClock;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Returned when a request arrives before the cooldown has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownActive {
    /// Time left until the next request will be accepted.
    pub retry_after: Duration,
}

/// A single process-wide gate that accepts at most one request per cooldown.
///
/// The check and the update of the last accepted time happen under one lock.
pub struct CooldownGuard {
    clock: SharedClock,
    cooldown: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl CooldownGuard {
    pub fn new(clock: SharedClock, cooldown: Duration) -> Self {
        Self {
            clock,
            cooldown,
            last_accepted: Mutex::new(None),
        }
    }

    /// Report the remaining wait without starting a new cooldown.
    pub fn check(&self) -> Result<(), CooldownActive> {
        let last = self.last_accepted.lock().unwrap_or_else(|e| e.into_inner());
        self.remaining(*last, self.clock.now())
    }

    /// Accept the request and start a new cooldown, or report the remaining wait.
    pub fn try_acquire(&self) -> Result<(), CooldownActive> {
        let now = self.clock.now();
        let mut last = self.last_accepted.lock().unwrap_or_else(|e| e.into_inner());
        self.remaining(*last, now)?;
        *last = Some(now);
        Ok(())
    }

    fn remaining(&self, last: Option<Instant>, now: Instant) -> Result<(), CooldownActive> {
        match last {
            Some(previous) => {
                let elapsed = now.saturating_duration_since(previous);
                if elapsed < self.cooldown {
                    Err(CooldownActive {
                        retry_after: self.cooldown - elapsed,
                    })
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }
}
