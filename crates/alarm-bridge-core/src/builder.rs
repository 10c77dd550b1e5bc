//! Schedule configuration builder.
//!
//! Turns the flat argument record of a schedule command into a
//! [`ScheduleConfig`]: one schedule variant plus the presentation metadata the
//! capability shows when the alarm alerts.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::codec::{self, Record};
use crate::config::BridgeConfig;
use crate::error::ValidationError;
use crate::models::{Recurrence, ScheduleKind};

pub const ARG_TIMESTAMP: &str = "timestamp";
pub const ARG_COUNTDOWN_SECONDS: &str = "countdownDurationInSeconds";
pub const ARG_REPEAT_SECONDS: &str = "repeatDurationInSeconds";
pub const ARG_WEEKDAY_MASK: &str = "weekdayMask";
pub const ARG_HOUR: &str = "hour";
pub const ARG_MINUTE: &str = "minute";
pub const ARG_LABEL: &str = "label";
pub const ARG_TINT_COLOR: &str = "tintColor";

const WEEKDAY_MASK_MAX: u64 = 0b111_1111;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?([0-9A-Fa-f]{6})$").expect("Invalid regex"));

/// RGB tint applied to the alarm's presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TintColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl TintColor {
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parse `RRGGBB` or `#RRGGBB`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let captures = HEX_COLOR.captures(raw.trim())?;
        let value = u32::from_str_radix(&captures[1], 16).ok()?;
        let [_, red, green, blue] = value.to_be_bytes();
        Some(Self::new(red, green, blue))
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

/// System blue.
impl Default for TintColor {
    fn default() -> Self {
        Self::new(0x00, 0x7A, 0xFF)
    }
}

impl fmt::Display for TintColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A button shown on the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmButton {
    pub text: &'static str,
    pub system_image_name: &'static str,
}

impl AlarmButton {
    pub const STOP: Self = Self {
        text: "Done",
        system_image_name: "stop.circle",
    };
    pub const REPEAT: Self = Self {
        text: "Repeat",
        system_image_name: "repeat.circle",
    };
    pub const PAUSE: Self = Self {
        text: "Pause",
        system_image_name: "pause.fill",
    };
    pub const RESUME: Self = Self {
        text: "Start",
        system_image_name: "play.fill",
    };
}

/// What the alert's secondary button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondaryAction {
    /// Restart the countdown for the repeat duration
    Repeat,
}

impl SecondaryAction {
    #[must_use]
    pub const fn button(self) -> AlarmButton {
        match self {
            Self::Repeat => AlarmButton::REPEAT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Presentation {
    pub title: String,
    pub stop_button: AlarmButton,
    pub secondary_action: Option<SecondaryAction>,
    /// Pause/resume pair shown while counting down
    pub countdown_buttons: Option<(AlarmButton, AlarmButton)>,
    pub tint_color: TintColor,
}

/// Everything the capability needs to schedule one alarm.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduleConfig {
    pub schedule: ScheduleKind,
    pub presentation: Presentation,
}

impl ScheduleConfig {
    /// Assemble a config, deriving the button set from the schedule variant.
    pub fn new(schedule: ScheduleKind, label: impl Into<String>, tint_color: TintColor) -> Self {
        let (secondary_action, countdown_buttons) = match &schedule {
            ScheduleKind::Countdown { post_alert, .. } => (
                (!post_alert.is_zero()).then_some(SecondaryAction::Repeat),
                Some((AlarmButton::PAUSE, AlarmButton::RESUME)),
            ),
            ScheduleKind::Fixed { .. } | ScheduleKind::Relative { .. } => (None, None),
        };

        Self {
            schedule,
            presentation: Presentation {
                title: label.into(),
                stop_button: AlarmButton::STOP,
                secondary_action,
                countdown_buttons,
                tint_color,
            },
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.presentation.title
    }
}

/// Which schedule command the arguments belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleCommand {
    OneShot,
    Countdown,
    Recurring,
}

/// Build a [`ScheduleConfig`] from schedule command arguments.
///
/// A missing `label` falls back to the configured placeholder; a present one is
/// kept verbatim, whitespace included. A missing or
/// malformed `tintColor` falls back to the configured tint and is not an error.
pub fn build(
    command: ScheduleCommand,
    args: &Record,
    config: &BridgeConfig,
) -> Result<ScheduleConfig, ValidationError> {
    let schedule = match command {
        ScheduleCommand::OneShot => build_one_shot(args)?,
        ScheduleCommand::Countdown => build_countdown(args)?,
        ScheduleCommand::Recurring => build_recurring(args)?,
    };

    let label =
        codec::read_string(args, ARG_LABEL).unwrap_or_else(|| config.default_label.clone());
    let tint_color = resolve_tint(codec::read_string(args, ARG_TINT_COLOR).as_deref(), config);

    Ok(ScheduleConfig::new(schedule, label, tint_color))
}

fn build_one_shot(args: &Record) -> Result<ScheduleKind, ValidationError> {
    let instant = codec::read_timestamp(args, ARG_TIMESTAMP)?;
    Ok(ScheduleKind::Fixed { instant })
}

fn build_countdown(args: &Record) -> Result<ScheduleKind, ValidationError> {
    let pre_alert = require_seconds(args, ARG_COUNTDOWN_SECONDS)?;
    let post_alert = require_seconds(args, ARG_REPEAT_SECONDS)?;
    Ok(ScheduleKind::Countdown {
        pre_alert,
        post_alert,
    })
}

fn require_seconds(args: &Record, key: &str) -> Result<Duration, ValidationError> {
    codec::read_unsigned(args, key)?
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ValidationError::invalid(key, "a non-negative whole number of seconds is required")
        })
}

fn build_recurring(args: &Record) -> Result<ScheduleKind, ValidationError> {
    let mask = codec::read_unsigned(args, ARG_WEEKDAY_MASK)?
        .ok_or_else(|| ValidationError::missing(ARG_WEEKDAY_MASK))?;
    let mask = u8::try_from(mask)
        .ok()
        .filter(|mask| u64::from(*mask) <= WEEKDAY_MASK_MAX)
        .ok_or_else(|| {
            ValidationError::invalid(ARG_WEEKDAY_MASK, "must fit in 7 bits (Monday..Sunday)")
        })?;

    let hour = codec::read_bounded(args, ARG_HOUR, 23)?;
    let minute = codec::read_bounded(args, ARG_MINUTE, 59)?;

    // A zero mask is accepted and yields a schedule that never recurs by weekday.
    Ok(ScheduleKind::Relative {
        hour,
        minute,
        recurrence: Recurrence::from_mask(mask),
    })
}

fn resolve_tint(raw: Option<&str>, config: &BridgeConfig) -> TintColor {
    let Some(raw) = raw else {
        return config.default_tint();
    };
    TintColor::parse(raw).unwrap_or_else(|| {
        tracing::debug!("Ignoring malformed tint color {:?}, using default", raw);
        config.default_tint()
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::models::Weekday;

    fn args(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn build_with_defaults(
        command: ScheduleCommand,
        value: serde_json::Value,
    ) -> Result<ScheduleConfig, ValidationError> {
        build(command, &args(value), &BridgeConfig::default())
    }

    #[test]
    fn one_shot_uses_timestamp_and_label() {
        let config = build_with_defaults(
            ScheduleCommand::OneShot,
            json!({ "timestamp": 1_700_000_000_000_i64, "label": "Wake" }),
        )
        .unwrap();

        assert_eq!(
            config.schedule,
            ScheduleKind::Fixed {
                instant: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
            }
        );
        assert_eq!(config.label(), "Wake");
        assert_eq!(config.presentation.secondary_action, None);
    }

    #[test]
    fn one_shot_accepts_floating_point_timestamp() {
        let config = build_with_defaults(
            ScheduleCommand::OneShot,
            json!({ "timestamp": 1_700_000_000_000.0 }),
        )
        .unwrap();
        assert_eq!(config.schedule.type_name(), "fixed");
    }

    #[test]
    fn one_shot_requires_numeric_timestamp() {
        let missing = build_with_defaults(ScheduleCommand::OneShot, json!({})).unwrap_err();
        assert_eq!(missing, ValidationError::missing("timestamp"));

        let text = build_with_defaults(ScheduleCommand::OneShot, json!({ "timestamp": "soon" }))
            .unwrap_err();
        assert_eq!(text, ValidationError::missing("timestamp"));
    }

    #[test]
    fn label_defaults_to_placeholder_only_when_absent() {
        let missing = build_with_defaults(ScheduleCommand::OneShot, json!({ "timestamp": 0 }))
            .unwrap();
        assert_eq!(missing.label(), "Alarm");

        let null = build_with_defaults(
            ScheduleCommand::OneShot,
            json!({ "timestamp": 0, "label": null }),
        )
        .unwrap();
        assert_eq!(null.label(), "Alarm");
    }

    #[test]
    fn present_label_is_kept_verbatim() {
        let padded = build_with_defaults(
            ScheduleCommand::OneShot,
            json!({ "timestamp": 0, "label": "  Wake  " }),
        )
        .unwrap();
        assert_eq!(padded.label(), "  Wake  ");

        let empty = build_with_defaults(
            ScheduleCommand::OneShot,
            json!({ "timestamp": 0, "label": "" }),
        )
        .unwrap();
        assert_eq!(empty.label(), "");
    }

    #[test]
    fn countdown_requires_both_durations() {
        let config = build_with_defaults(
            ScheduleCommand::Countdown,
            json!({ "countdownDurationInSeconds": 300, "repeatDurationInSeconds": 60 }),
        )
        .unwrap();
        assert_eq!(
            config.schedule,
            ScheduleKind::Countdown {
                pre_alert: Duration::from_secs(300),
                post_alert: Duration::from_secs(60),
            }
        );
        assert_eq!(
            config.presentation.secondary_action,
            Some(SecondaryAction::Repeat)
        );

        let missing = build_with_defaults(
            ScheduleCommand::Countdown,
            json!({ "countdownDurationInSeconds": 300 }),
        )
        .unwrap_err();
        assert_eq!(missing.field(), "repeatDurationInSeconds");
        assert!(matches!(missing, ValidationError::InvalidField { .. }));

        let negative = build_with_defaults(
            ScheduleCommand::Countdown,
            json!({ "countdownDurationInSeconds": -5, "repeatDurationInSeconds": 0 }),
        )
        .unwrap_err();
        assert_eq!(negative.field(), "countdownDurationInSeconds");
        assert!(matches!(negative, ValidationError::InvalidField { .. }));
    }

    #[test]
    fn countdown_without_repeat_has_no_secondary_button() {
        let config = build_with_defaults(
            ScheduleCommand::Countdown,
            json!({ "countdownDurationInSeconds": 10, "repeatDurationInSeconds": 0 }),
        )
        .unwrap();
        assert_eq!(config.presentation.secondary_action, None);
        assert_eq!(
            config.presentation.countdown_buttons,
            Some((AlarmButton::PAUSE, AlarmButton::RESUME))
        );
    }

    #[test]
    fn recurring_expands_weekday_mask() {
        let config = build_with_defaults(
            ScheduleCommand::Recurring,
            json!({ "weekdayMask": 0b000_0011, "hour": 7, "minute": 30 }),
        )
        .unwrap();
        assert_eq!(
            config.schedule,
            ScheduleKind::Relative {
                hour: 7,
                minute: 30,
                recurrence: Recurrence::weekly([Weekday::Monday, Weekday::Tuesday]),
            }
        );
    }

    #[test]
    fn recurring_accepts_zero_mask() {
        let config = build_with_defaults(
            ScheduleCommand::Recurring,
            json!({ "weekdayMask": 0, "hour": 0, "minute": 0 }),
        )
        .unwrap();
        assert!(matches!(
            config.schedule,
            ScheduleKind::Relative { ref recurrence, .. } if !recurrence.is_repeating()
        ));
    }

    #[test]
    fn recurring_rejects_out_of_range_values() {
        let hour = build_with_defaults(
            ScheduleCommand::Recurring,
            json!({ "weekdayMask": 1, "hour": 24, "minute": 0 }),
        )
        .unwrap_err();
        assert!(matches!(hour, ValidationError::InvalidField { ref field, .. } if field == "hour"));

        let minute = build_with_defaults(
            ScheduleCommand::Recurring,
            json!({ "weekdayMask": 1, "hour": 5, "minute": 60 }),
        )
        .unwrap_err();
        assert_eq!(minute.field(), "minute");

        let mask = build_with_defaults(
            ScheduleCommand::Recurring,
            json!({ "weekdayMask": 128, "hour": 5, "minute": 0 }),
        )
        .unwrap_err();
        assert_eq!(mask.field(), "weekdayMask");

        let missing = build_with_defaults(
            ScheduleCommand::Recurring,
            json!({ "weekdayMask": 1, "minute": 0 }),
        )
        .unwrap_err();
        assert_eq!(missing, ValidationError::missing("hour"));
    }

    #[test]
    fn tint_color_parses_with_or_without_hash() {
        assert_eq!(TintColor::parse("#FF8800"), Some(TintColor::new(0xFF, 0x88, 0x00)));
        assert_eq!(TintColor::parse("00ff00"), Some(TintColor::new(0, 0xFF, 0)));
        assert_eq!(TintColor::parse("#FFF"), None);
        assert_eq!(TintColor::parse("#GG0000"), None);
        assert_eq!(TintColor::new(1, 2, 3).to_hex(), "#010203");
    }

    #[test]
    fn malformed_tint_falls_back_to_default() {
        let config = build_with_defaults(
            ScheduleCommand::OneShot,
            json!({ "timestamp": 0, "tintColor": "not-a-color" }),
        )
        .unwrap();
        assert_eq!(config.presentation.tint_color, TintColor::default());

        let custom = build_with_defaults(
            ScheduleCommand::OneShot,
            json!({ "timestamp": 0, "tintColor": "#112233" }),
        )
        .unwrap();
        assert_eq!(
            custom.presentation.tint_color,
            TintColor::new(0x11, 0x22, 0x33)
        );
    }

    #[test]
    fn configured_defaults_apply() {
        let bridge_config = BridgeConfig {
            default_label: "Reveille".to_string(),
            default_tint_color: "#AA0000".to_string(),
            ..BridgeConfig::default()
        };
        let config = build(
            ScheduleCommand::OneShot,
            &args(json!({ "timestamp": 0 })),
            &bridge_config,
        )
        .unwrap();
        assert_eq!(config.label(), "Reveille");
        assert_eq!(config.presentation.tint_color, TintColor::new(0xAA, 0, 0));
    }
}
