//! Clock boundary.
//!
//! Domain code never reads the system time directly; it asks a `Clock`. This
//! keeps booking rules (e.g. past-date rejection) deterministic under test.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Source of the current instant and the clinic's current calendar date.
pub trait Clock: Send + Sync {
    /// Current instant, used for audit timestamps.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date at the clinic.
    fn today(&self) -> NaiveDate;
}

/// Wall clock of the host machine.
///
/// The clinic's date is taken from the host's local timezone (single-site
/// deployment).
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock frozen at a single instant. Intended for tests.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Clock frozen at `date` + `time`, interpreted as UTC.
    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        Self::new(NaiveDateTime::new(date, time).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

impl<C> Clock for Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}
