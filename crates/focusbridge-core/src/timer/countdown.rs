//! One-second countdown.
//!
//! Knows nothing about phases, sessions or tasks. The focus machine arms it
//! for each interval and performs the transition when [`Countdown::tick`]
//! reports that the last second was consumed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    time_left_secs: u64,
    running: bool,
}

impl Countdown {
    pub fn time_left_secs(&self) -> u64 {
        self.time_left_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Load a fresh interval.
    pub fn arm(&mut self, secs: u64, running: bool) {
        self.time_left_secs = secs;
        self.running = running;
    }

    /// Reload the remaining time, keeping the running flag.
    pub fn rearm(&mut self, secs: u64) {
        self.time_left_secs = secs;
    }

    /// Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        if !self.running || self.time_left_secs == 0 {
            return false;
        }
        self.running = false;
        true
    }

    /// Returns whether anything changed.
    pub fn resume(&mut self) -> bool {
        if self.running || self.time_left_secs == 0 {
            return false;
        }
        self.running = true;
        true
    }

    /// Advance by one second. No-op while stopped or at zero.
    ///
    /// Returns `true` if this tick consumed the last second.
    pub fn tick(&mut self) -> bool {
        if !self.running || self.time_left_secs == 0 {
            return false;
        }
        self.time_left_secs -= 1;
        self.time_left_secs == 0
    }
}
