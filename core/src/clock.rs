//! Clock abstraction so time-dependent logic stays testable.

use chrono::{DateTime, Utc};

/// Provides the current time to components that stamp or compare dates.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
