//! Alarm change events

use super::alarm::{Alarm, AlarmId};

/// One transition produced by a diff pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEvent {
    Added(Alarm),
    Updated(Alarm),
    Removed(AlarmId),
}

impl AlarmEvent {
    #[must_use]
    pub const fn id(&self) -> AlarmId {
        match self {
            Self::Added(alarm) | Self::Updated(alarm) => alarm.id,
            Self::Removed(id) => *id,
        }
    }

    /// Wire name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "add",
            Self::Updated(_) => "update",
            Self::Removed(_) => "remove",
        }
    }
}
