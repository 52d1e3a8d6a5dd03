//! Wall-clock budget for one build.

use std::time::{Duration, Instant};

/// Build deadline checked between phases and by prepare workers.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    /// Deadline that never expires.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.start.elapsed() > limit)
    }

    /// `Err(elapsed)` once the budget is exceeded.
    pub fn check(&self) -> Result<(), Duration> {
        if self.is_expired() {
            Err(self.elapsed())
        } else {
            Ok(())
        }
    }
}
