//! Clinic configuration loaded from the environment.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medibook_core::DomainError;
use medibook_scheduling::ClinicHours;

pub const OPEN_TIME_VAR: &str = "MEDIBOOK_OPEN_TIME";
pub const CLOSE_TIME_VAR: &str = "MEDIBOOK_CLOSE_TIME";
pub const SLOT_MINUTES_VAR: &str = "MEDIBOOK_SLOT_MINUTES";
pub const REJECT_PAST_DATES_VAR: &str = "MEDIBOOK_REJECT_PAST_DATES";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected {expected}, got '{value}'")]
    Malformed {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Booking policy for one clinic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicConfig {
    pub hours: ClinicHours,
    /// Refuse bookings dated before today.
    pub reject_past_dates: bool,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            hours: ClinicHours::default(),
            reject_past_dates: true,
        }
    }
}

impl ClinicConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ClinicConfig::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let open = match get(OPEN_TIME_VAR) {
            Some(v) => parse_time(OPEN_TIME_VAR, &v)?,
            None => defaults.hours.open(),
        };
        let close = match get(CLOSE_TIME_VAR) {
            Some(v) => parse_time(CLOSE_TIME_VAR, &v)?,
            None => defaults.hours.close(),
        };
        let granularity = match get(SLOT_MINUTES_VAR) {
            Some(v) => v.trim().parse::<u32>().map_err(|_| ConfigError::Malformed {
                var: SLOT_MINUTES_VAR,
                expected: "a whole number of minutes",
                value: v.clone(),
            })?,
            None => defaults.hours.granularity_minutes(),
        };
        let reject_past_dates = match get(REJECT_PAST_DATES_VAR) {
            Some(v) => parse_bool(REJECT_PAST_DATES_VAR, &v)?,
            None => defaults.reject_past_dates,
        };

        Ok(Self {
            hours: ClinicHours::new(open, close, granularity)?,
            reject_past_dates,
        })
    }
}

fn parse_time(var: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ConfigError::Malformed {
            var,
            expected: "HH:MM",
            value: value.to_string(),
        })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Malformed {
            var,
            expected: "true or false",
            value: value.to_string(),
        }),
    }
}
