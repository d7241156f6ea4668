//! Clinic opening hours and the bookable slot grid.
//!
//! The grid is a pure function of the configuration: every time `t` with
//! `open <= t < close` that lies a whole number of granularity steps after
//! `open`. A trailing partial slot is never offered.

use std::collections::BTreeSet;
use std::iter::FusedIterator;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use medibook_core::{DomainError, DomainResult, ValueObject};

const SECS_PER_MINUTE: u32 = 60;

/// Opening hours of the clinic and the booking granularity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClinicHours", into = "RawClinicHours")]
pub struct ClinicHours {
    open: NaiveTime,
    close: NaiveTime,
    granularity_minutes: u32,
}

impl ValueObject for ClinicHours {}

impl ClinicHours {
    pub fn new(open: NaiveTime, close: NaiveTime, granularity_minutes: u32) -> DomainResult<Self> {
        if granularity_minutes == 0 {
            return Err(DomainError::invalid_config(
                "slot granularity must be a positive number of minutes",
            ));
        }
        if open >= close {
            return Err(DomainError::invalid_config(format!(
                "opening time {open} must be before closing time {close}"
            )));
        }
        if open.nanosecond() != 0 || close.nanosecond() != 0 {
            return Err(DomainError::invalid_config(
                "opening hours must be whole seconds",
            ));
        }

        Ok(Self {
            open,
            close,
            granularity_minutes,
        })
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    pub fn granularity_minutes(&self) -> u32 {
        self.granularity_minutes
    }

    fn step_secs(&self) -> u32 {
        self.granularity_minutes.saturating_mul(SECS_PER_MINUTE)
    }

    /// Iterate the full candidate grid in ascending order.
    pub fn slots(&self) -> Slots {
        Slots {
            cursor: self.open.num_seconds_from_midnight(),
            close: self.close.num_seconds_from_midnight(),
            step: self.step_secs(),
        }
    }

    /// The full candidate grid, ascending.
    pub fn grid(&self) -> Vec<NaiveTime> {
        self.slots().collect()
    }

    /// Number of slots in the grid: `ceil((close - open) / granularity)`.
    pub fn slot_count(&self) -> usize {
        let span = self.close.num_seconds_from_midnight() - self.open.num_seconds_from_midnight();
        span.div_ceil(self.step_secs()) as usize
    }

    /// Whether `time` is a member of the grid.
    pub fn is_aligned(&self, time: NaiveTime) -> bool {
        if time.nanosecond() != 0 || time < self.open || time >= self.close {
            return false;
        }
        let offset = time.num_seconds_from_midnight() - self.open.num_seconds_from_midnight();
        offset % self.step_secs() == 0
    }

    /// The grid minus `booked`, ascending order preserved.
    pub fn available(&self, booked: &BTreeSet<NaiveTime>) -> Vec<NaiveTime> {
        self.slots().filter(|t| !booked.contains(t)).collect()
    }
}

impl Default for ClinicHours {
    /// 09:00 to 18:00 in 15 minute steps.
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            granularity_minutes: 15,
        }
    }
}

/// Serialized form; goes through [`ClinicHours::new`] on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawClinicHours {
    open: NaiveTime,
    close: NaiveTime,
    granularity_minutes: u32,
}

impl TryFrom<RawClinicHours> for ClinicHours {
    type Error = DomainError;

    fn try_from(raw: RawClinicHours) -> Result<Self, Self::Error> {
        ClinicHours::new(raw.open, raw.close, raw.granularity_minutes)
    }
}

impl From<ClinicHours> for RawClinicHours {
    fn from(hours: ClinicHours) -> Self {
        Self {
            open: hours.open,
            close: hours.close,
            granularity_minutes: hours.granularity_minutes,
        }
    }
}

/// Ascending iterator over a clinic day's slot grid.
///
/// Restartable: call [`ClinicHours::slots`] again for a fresh pass.
#[derive(Debug, Clone)]
pub struct Slots {
    cursor: u32,
    close: u32,
    step: u32,
}

impl Iterator for Slots {
    type Item = NaiveTime;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.close {
            return None;
        }
        let slot = NaiveTime::from_num_seconds_from_midnight_opt(self.cursor, 0)?;
        self.cursor = self.cursor.saturating_add(self.step);
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.close.saturating_sub(self.cursor).div_ceil(self.step) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slots {}

impl FusedIterator for Slots {}
