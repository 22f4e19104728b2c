//! Monotonic version clock.
//!
//! Record versions are nanosecond-resolution wall-clock timestamps, nudged
//! forward when the OS clock stalls or steps backwards so that two appends
//! in the same nanosecond (or across an NTP adjustment) still get distinct,
//! increasing versions.

use std::time::{SystemTime, UNIX_EPOCH};

/// Hands out strictly increasing nanosecond timestamps.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: u64,
}

impl VersionClock {
    /// Creates a clock that has issued no versions yet.
    #[must_use]
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// Returns the next version: `max(now_ns, last + 1)`.
    pub fn next(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.last = now.max(self.last + 1);
        self.last
    }

    /// The most recently issued version (0 if none yet).
    #[must_use]
    pub fn last(&self) -> u64 {
        self.last
    }
}
