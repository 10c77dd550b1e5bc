//! Wire codec.
//!
//! Single mapping between the domain model and the flat key/value records that
//! cross the command and event channels. Both `listAlarms` results and
//! `alarmUpdates` events go through [`encode_alarm`], so the two channels can
//! never drift apart.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::builder::{ScheduleConfig, TintColor, ARG_LABEL, ARG_TINT_COLOR};
use crate::error::ValidationError;
use crate::models::{Alarm, AlarmEvent, Recurrence, Schedule, ScheduleKind, Weekday};

/// Flat key/value record exchanged with the consumer.
pub type Record = Map<String, Value>;

pub const KEY_ID: &str = "id";
pub const KEY_EVENT: &str = "event";
pub const KEY_ALARM: &str = "alarm";
pub const KEY_SCHEDULE: &str = "schedule";
pub const KEY_STATE: &str = "state";
pub const KEY_LABEL: &str = "label";
pub const KEY_TYPE: &str = "type";
pub const KEY_TIMESTAMP: &str = "timestamp";
pub const KEY_HOUR: &str = "hour";
pub const KEY_MINUTE: &str = "minute";
pub const KEY_WEEKDAYS: &str = "weekdays";
pub const KEY_PRE_ALERT: &str = "preAlertDuration";
pub const KEY_POST_ALERT: &str = "postAlertDuration";

const TYPE_FIXED: &str = "fixed";
const TYPE_RELATIVE: &str = "relative";
const TYPE_COUNTDOWN: &str = "countdown";

/// Encode an observed alarm.
///
/// Countdown-only alarms carry no `schedule` key at all; their kind shows only
/// through `state`.
#[must_use]
pub fn encode_alarm(alarm: &Alarm) -> Record {
    let mut record = Record::new();
    record.insert(KEY_ID.to_string(), Value::String(alarm.id.as_str()));
    if let Some(schedule) = &alarm.schedule {
        record.insert(
            KEY_SCHEDULE.to_string(),
            Value::Object(encode_alarm_schedule(schedule)),
        );
    }
    record.insert(
        KEY_STATE.to_string(),
        Value::String(alarm.state.as_str().to_string()),
    );
    if let Some(label) = &alarm.label {
        record.insert(KEY_LABEL.to_string(), Value::String(label.clone()));
    }
    record
}

fn encode_alarm_schedule(schedule: &Schedule) -> Record {
    let mut record = Record::new();
    match schedule {
        Schedule::Fixed { instant } => {
            record.insert(KEY_TYPE.to_string(), TYPE_FIXED.into());
            record.insert(KEY_TIMESTAMP.to_string(), instant.timestamp_millis().into());
        }
        Schedule::Relative { hour, minute, .. } => {
            record.insert(KEY_TYPE.to_string(), TYPE_RELATIVE.into());
            record.insert(KEY_HOUR.to_string(), (*hour).into());
            record.insert(KEY_MINUTE.to_string(), (*minute).into());
        }
    }
    record
}

/// Encode an event as `{id, event, alarm?}`; `alarm` is omitted on removal.
#[must_use]
pub fn encode_event(event: &AlarmEvent) -> Record {
    let mut record = Record::new();
    record.insert(KEY_ID.to_string(), Value::String(event.id().as_str()));
    record.insert(KEY_EVENT.to_string(), event.kind().into());
    match event {
        AlarmEvent::Added(alarm) | AlarmEvent::Updated(alarm) => {
            record.insert(KEY_ALARM.to_string(), Value::Object(encode_alarm(alarm)));
        }
        AlarmEvent::Removed(_) => {}
    }
    record
}

/// Encode a schedule request with an explicit variant tag.
#[must_use]
pub fn encode_schedule_request(config: &ScheduleConfig) -> Record {
    let mut schedule = Record::new();
    schedule.insert(KEY_TYPE.to_string(), config.schedule.type_name().into());
    match &config.schedule {
        ScheduleKind::Fixed { instant } => {
            schedule.insert(KEY_TIMESTAMP.to_string(), instant.timestamp_millis().into());
        }
        ScheduleKind::Relative {
            hour,
            minute,
            recurrence,
        } => {
            schedule.insert(KEY_HOUR.to_string(), (*hour).into());
            schedule.insert(KEY_MINUTE.to_string(), (*minute).into());
            if let Recurrence::Weekly(days) = recurrence {
                let days = days.iter().map(|day| Value::from(day.as_str())).collect();
                schedule.insert(KEY_WEEKDAYS.to_string(), Value::Array(days));
            }
        }
        ScheduleKind::Countdown {
            pre_alert,
            post_alert,
        } => {
            schedule.insert(KEY_PRE_ALERT.to_string(), pre_alert.as_secs().into());
            schedule.insert(KEY_POST_ALERT.to_string(), post_alert.as_secs().into());
        }
    }

    let mut record = Record::new();
    record.insert(KEY_SCHEDULE.to_string(), Value::Object(schedule));
    record.insert(ARG_LABEL.to_string(), config.label().into());
    record.insert(
        ARG_TINT_COLOR.to_string(),
        config.presentation.tint_color.to_hex().into(),
    );
    record
}

/// Decode a record produced by [`encode_schedule_request`].
///
/// The variant comes from `schedule.type` only, never from which fields happen
/// to be present.
pub fn decode_schedule_request(record: &Record) -> Result<ScheduleConfig, ValidationError> {
    let schedule = match present(record, KEY_SCHEDULE) {
        Some(Value::Object(schedule)) => schedule,
        Some(_) => return Err(ValidationError::invalid(KEY_SCHEDULE, "must be a record")),
        None => return Err(ValidationError::missing(KEY_SCHEDULE)),
    };

    let kind = match read_string(schedule, KEY_TYPE).as_deref() {
        Some(TYPE_FIXED) => ScheduleKind::Fixed {
            instant: read_timestamp(schedule, KEY_TIMESTAMP)?,
        },
        Some(TYPE_RELATIVE) => ScheduleKind::Relative {
            hour: read_bounded(schedule, KEY_HOUR, 23)?,
            minute: read_bounded(schedule, KEY_MINUTE, 59)?,
            recurrence: read_weekdays(schedule)?,
        },
        Some(TYPE_COUNTDOWN) => ScheduleKind::Countdown {
            pre_alert: read_seconds(schedule, KEY_PRE_ALERT)?,
            post_alert: read_seconds(schedule, KEY_POST_ALERT)?,
        },
        Some(other) => {
            return Err(ValidationError::invalid(
                KEY_TYPE,
                format!("unknown schedule type '{other}'"),
            ))
        }
        None => return Err(ValidationError::missing(KEY_TYPE)),
    };

    let label =
        read_string(record, ARG_LABEL).ok_or_else(|| ValidationError::missing(ARG_LABEL))?;
    let tint = read_string(record, ARG_TINT_COLOR)
        .ok_or_else(|| ValidationError::missing(ARG_TINT_COLOR))?;
    let tint = TintColor::parse(&tint)
        .ok_or_else(|| ValidationError::invalid(ARG_TINT_COLOR, "expected #RRGGBB"))?;

    Ok(ScheduleConfig::new(kind, label, tint))
}

fn read_weekdays(record: &Record) -> Result<Recurrence, ValidationError> {
    let Some(value) = present(record, KEY_WEEKDAYS) else {
        return Ok(Recurrence::Never);
    };
    let Value::Array(items) = value else {
        return Err(ValidationError::invalid(KEY_WEEKDAYS, "must be a list"));
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| ValidationError::invalid(KEY_WEEKDAYS, "entries must be strings"))
                .and_then(|name| {
                    name.parse::<Weekday>()
                        .map_err(|reason| ValidationError::invalid(KEY_WEEKDAYS, reason))
                })
        })
        .collect::<Result<_, _>>()
        .map(Recurrence::Weekly)
}

fn read_seconds(record: &Record, key: &str) -> Result<Duration, ValidationError> {
    read_unsigned(record, key)?
        .map(Duration::from_secs)
        .ok_or_else(|| ValidationError::missing(key))
}

// ---------------------------------------------------------------------------
// Field readers shared with the builder and dispatcher
// ---------------------------------------------------------------------------

/// Value at `key`, treating explicit `null` as absent.
pub(crate) fn present<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|value| !value.is_null())
}

/// String at `key`; non-string values are ignored.
pub(crate) fn read_string(record: &Record, key: &str) -> Option<String> {
    present(record, key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Non-negative whole number at `key`.
///
/// `Ok(None)` when absent. Negative, fractional or non-numeric values are
/// rejected.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(crate) fn read_unsigned(record: &Record, key: &str) -> Result<Option<u64>, ValidationError> {
    let Some(value) = present(record, key) else {
        return Ok(None);
    };
    if let Some(number) = value.as_u64() {
        return Ok(Some(number));
    }
    if value.as_i64().is_some() {
        return Err(ValidationError::invalid(key, "must not be negative"));
    }
    match value.as_f64() {
        Some(number) if number < 0.0 => {
            Err(ValidationError::invalid(key, "must not be negative"))
        }
        Some(number) if number.fract() == 0.0 && number <= u64::MAX as f64 => {
            Ok(Some(number as u64))
        }
        Some(_) => Err(ValidationError::invalid(key, "must be a whole number")),
        None => Err(ValidationError::invalid(key, "must be a number")),
    }
}

/// Required whole number in `0..=max`.
pub(crate) fn read_bounded(record: &Record, key: &str, max: u8) -> Result<u8, ValidationError> {
    let value = read_unsigned(record, key)?.ok_or_else(|| ValidationError::missing(key))?;
    u8::try_from(value)
        .ok()
        .filter(|value| *value <= max)
        .ok_or_else(|| ValidationError::invalid(key, format!("must be between 0 and {max}")))
}

/// Milliseconds since the Unix epoch at `key`.
///
/// A missing or non-numeric value is reported as a missing field.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn read_timestamp(record: &Record, key: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = present(record, key).ok_or_else(|| ValidationError::missing(key))?;
    let millis = match (value.as_i64(), value.as_f64()) {
        (Some(millis), _) => millis,
        (None, Some(millis)) if millis.is_finite() => millis.trunc() as i64,
        _ => return Err(ValidationError::missing(key)),
    };
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ValidationError::invalid(key, "timestamp out of range"))
}
