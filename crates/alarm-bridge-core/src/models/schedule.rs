//! Schedule variants

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Day of the week, ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Bit of this day in a weekday mask (bit 0 = Monday).
    #[must_use]
    pub const fn mask_bit(self) -> u8 {
        1 << (self as u8)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|day| day.as_str() == needle)
            .ok_or_else(|| format!("unknown weekday '{}'", s.trim()))
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        Self::ALL[value.num_days_from_monday() as usize]
    }
}

/// How a relative schedule repeats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Recurrence {
    /// Alerts once at the next matching time of day
    #[default]
    Never,
    /// Alerts on each of the given days. An empty set never recurs by weekday.
    Weekly(BTreeSet<Weekday>),
}

impl Recurrence {
    pub fn weekly(days: impl IntoIterator<Item = Weekday>) -> Self {
        Self::Weekly(days.into_iter().collect())
    }

    /// Expand a weekday mask (bit 0 = Monday, bit 6 = Sunday).
    ///
    /// Bits above bit 6 are ignored here; callers validate the mask range.
    #[must_use]
    pub fn from_mask(mask: u8) -> Self {
        Self::weekly(
            Weekday::ALL
                .into_iter()
                .filter(|day| mask & day.mask_bit() != 0),
        )
    }

    /// Collapse back into a weekday mask. `Never` has mask zero.
    #[must_use]
    pub fn mask(&self) -> u8 {
        match self {
            Self::Never => 0,
            Self::Weekly(days) => days.iter().fold(0, |mask, day| mask | day.mask_bit()),
        }
    }

    #[must_use]
    pub fn is_repeating(&self) -> bool {
        matches!(self, Self::Weekly(days) if !days.is_empty())
    }
}

/// Schedule attached to an alarm observed from the capability.
///
/// Countdown-only alarms carry no schedule at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Schedule {
    Fixed {
        instant: DateTime<Utc>,
    },
    Relative {
        hour: u8,
        minute: u8,
        recurrence: Recurrence,
    },
}

/// Schedule requested when creating an alarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleKind {
    Fixed {
        instant: DateTime<Utc>,
    },
    Relative {
        hour: u8,
        minute: u8,
        recurrence: Recurrence,
    },
    Countdown {
        pre_alert: Duration,
        /// Zero means no repeat phase
        post_alert: Duration,
    },
}

impl ScheduleKind {
    /// Wire discriminator of the variant.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Fixed { .. } => "fixed",
            Self::Relative { .. } => "relative",
            Self::Countdown { .. } => "countdown",
        }
    }

    /// The alarm-side schedule this request produces, if any.
    #[must_use]
    pub fn to_schedule(&self) -> Option<Schedule> {
        match self {
            Self::Fixed { instant } => Some(Schedule::Fixed { instant: *instant }),
            Self::Relative {
                hour,
                minute,
                recurrence,
            } => Some(Schedule::Relative {
                hour: *hour,
                minute: *minute,
                recurrence: recurrence.clone(),
            }),
            Self::Countdown { .. } => None,
        }
    }
}
