//! Injected current-date source.
//!
//! "Today" is resolved as a civil date in one fixed reference time zone, not
//! UTC, so scheduled runs near local midnight land on the day the
//! organization actually experiences. Everything that needs the current date
//! takes a [`Clock`] rather than calling into the system directly.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

/// Reference time zone for resolving "today".
pub const REFERENCE_TZ: Tz = chrono_tz::Europe::Paris;

/// Single-method current-date source.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Production clock pinned to [`REFERENCE_TZ`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&REFERENCE_TZ).date_naive()
    }
}

/// Test clock that always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
