//! Data models for alarm-bridge

mod alarm;
mod authorization;
mod event;
mod schedule;

pub use alarm::{Alarm, AlarmId, AlarmState, CountdownDuration};
pub use authorization::AuthorizationState;
pub use event::AlarmEvent;
pub use schedule::{Recurrence, Schedule, ScheduleKind, Weekday};
