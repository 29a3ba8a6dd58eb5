// src/clock.rs
//! Millisecond wall-clock derived from the tokio monotonic clock.
//!
//! The epoch base is captured once with `chrono`; every later reading adds the
//! elapsed `tokio::time::Instant` delta. Readings never go backwards, and
//! paused-time tests see timestamps advance together with their timers.

use chrono::Utc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Clock {
    base_ms: i64,
    started: Instant,
}

impl Clock {
    pub(crate) fn new() -> Self {
        Self {
            base_ms: Utc::now().timestamp_millis(),
            started: Instant::now(),
        }
    }

    /// Current time in milliseconds since the Unix epoch.
    pub(crate) fn now_ms(&self) -> i64 {
        let elapsed = self.started.elapsed().as_millis();
        self.base_ms
            .saturating_add(i64::try_from(elapsed).unwrap_or(i64::MAX))
    }
}
