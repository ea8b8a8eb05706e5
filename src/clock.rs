//! Wall-clock time as seconds since the Unix epoch.
//!
//! The logger stamps captured messages and arms its silence deadlines from
//! a [`Clock`], injected so the session state machine can be tested against
//! a fixed or scripted time source.

use std::time::{SystemTime, UNIX_EPOCH};

/// A source of epoch seconds.
pub trait Clock {
    fn now(&self) -> u64;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // A system clock before the epoch is treated as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
