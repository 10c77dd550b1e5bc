//! Alarm model

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schedule::Schedule;

/// Opaque, immutable identifier of an alarm owned by the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlarmId(Uuid);

impl AlarmId {
    /// Create a new random alarm ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the canonical hyphenated string form of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for AlarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlarmId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Lifecycle state reported by the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlarmState {
    /// Waiting for its alert time
    Scheduled,
    /// Currently alerting
    Ringing,
    /// Counting down (pre-alert, or snoozed into the repeat phase)
    Countdown,
    /// Countdown paused by the user
    Paused,
    /// Alert dismissed
    Stopped,
    /// Anything the bridge does not recognise
    #[default]
    Unknown,
}

impl AlarmState {
    /// Wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Ringing => "ringing",
            Self::Countdown => "countdown",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        }
    }

    /// Map a capability-side state name onto the known set.
    ///
    /// Unrecognised names become [`AlarmState::Unknown`] instead of failing, so
    /// newer capability versions never break encoding.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Self::Scheduled,
            "ringing" | "alerting" => Self::Ringing,
            "countdown" | "snoozed" => Self::Countdown,
            "paused" => Self::Paused,
            "stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Countdown durations the capability keeps for countdown-style alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CountdownDuration {
    pub pre_alert: Duration,
    /// Zero means the alarm has no repeat phase
    pub post_alert: Duration,
}

impl CountdownDuration {
    #[must_use]
    pub const fn has_repeat(&self) -> bool {
        !self.post_alert.is_zero()
    }
}

/// An alarm as last observed from the capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    /// `None` for countdown-only alarms
    pub schedule: Option<Schedule>,
    pub countdown: Option<CountdownDuration>,
    pub state: AlarmState,
    pub label: Option<String>,
}

impl Alarm {
    /// Next wall-clock instant this alarm is expected to alert, relative to `now`.
    ///
    /// Fixed schedules return their instant. Relative schedules resolve the time
    /// of day against today's local date, as the platform does when presenting
    /// upcoming alarms. Countdown-only alarms have no alerting time.
    #[must_use]
    pub fn alerting_time(&self, now: DateTime<Local>) -> Option<DateTime<Utc>> {
        match self.schedule.as_ref()? {
            Schedule::Fixed { instant } => Some(*instant),
            Schedule::Relative { hour, minute, .. } => {
                let time = NaiveTime::from_hms_opt(u32::from(*hour), u32::from(*minute), 0)?;
                let local = now.date_naive().and_time(time);
                Local
                    .from_local_datetime(&local)
                    .earliest()
                    .map(|value| value.with_timezone(&Utc))
            }
        }
    }

    /// Whether stopping this alarm keeps it registered for a later occurrence.
    #[must_use]
    pub fn repeats(&self) -> bool {
        matches!(
            &self.schedule,
            Some(Schedule::Relative { recurrence, .. }) if recurrence.is_repeating()
        )
    }
}
