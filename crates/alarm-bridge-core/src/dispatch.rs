//! Command dispatcher.
//!
//! Takes a named command with its argument record, validates the arguments,
//! runs the authorization gate for anything that changes alarms, calls the
//! capability and encodes the result. Every failure leaves here as an
//! [`ErrorPayload`]; unknown command names leave as [`Reply::NotImplemented`]
//! so callers can tell "not supported" apart from "failed".

use std::sync::Arc;

use serde_json::Value;

use crate::auth::{AuthorizationGate, GateOutcome};
use crate::builder::{self, ScheduleCommand, ScheduleConfig};
use crate::capability::AlarmCapability;
use crate::codec::{self, Record, KEY_ID};
use crate::config::BridgeConfig;
use crate::error::{Error, ErrorPayload, Operation, Result, ValidationError};
use crate::models::AlarmId;

pub const METHOD_REQUEST_AUTHORIZATION: &str = "requestAuthorization";
pub const METHOD_SCHEDULE_ONE_SHOT: &str = "scheduleOneShot";
pub const METHOD_SCHEDULE_COUNTDOWN: &str = "scheduleCountdown";
pub const METHOD_SCHEDULE_RECURRING: &str = "scheduleRecurring";
pub const METHOD_LIST_ALARMS: &str = "listAlarms";
pub const METHOD_CANCEL: &str = "cancel";
pub const METHOD_ADVANCE_COUNTDOWN: &str = "advanceCountdown";
pub const METHOD_PAUSE: &str = "pause";
pub const METHOD_RESUME: &str = "resume";
pub const METHOD_STOP: &str = "stop";
pub const METHOD_PLATFORM_VERSION: &str = "getPlatformVersion";

/// Name used by early plugin versions for `scheduleOneShot`.
const METHOD_SCHEDULE_ONE_SHOT_LEGACY: &str = "scheduleOneShotAlarm";

const DENIED_MESSAGE: &str =
    "Alarm authorization denied or restricted. Please enable alarms for this app in Settings.";

/// Per-alarm operations that only need an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmAction {
    Cancel,
    AdvanceCountdown,
    Pause,
    Resume,
    Stop,
}

impl AlarmAction {
    #[must_use]
    pub const fn operation(self) -> Operation {
        match self {
            Self::Cancel => Operation::Cancel,
            Self::AdvanceCountdown => Operation::AdvanceCountdown,
            Self::Pause => Operation::Pause,
            Self::Resume => Operation::Resume,
            Self::Stop => Operation::Stop,
        }
    }
}

/// A validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RequestAuthorization,
    PlatformVersion,
    Schedule(ScheduleConfig),
    ListAlarms,
    Alarm { action: AlarmAction, id: AlarmId },
}

impl Command {
    /// Validate `args` for `method`.
    ///
    /// Returns `Ok(None)` for a method name the bridge does not know.
    pub fn parse(
        method: &str,
        args: &Record,
        config: &BridgeConfig,
    ) -> std::result::Result<Option<Self>, ValidationError> {
        let schedule = |command| builder::build(command, args, config).map(Self::Schedule);
        let alarm = |action| parse_id(args).map(|id| Self::Alarm { action, id });

        let command = match method {
            METHOD_REQUEST_AUTHORIZATION => Self::RequestAuthorization,
            METHOD_PLATFORM_VERSION => Self::PlatformVersion,
            METHOD_SCHEDULE_ONE_SHOT | METHOD_SCHEDULE_ONE_SHOT_LEGACY => {
                schedule(ScheduleCommand::OneShot)?
            }
            METHOD_SCHEDULE_COUNTDOWN => schedule(ScheduleCommand::Countdown)?,
            METHOD_SCHEDULE_RECURRING => schedule(ScheduleCommand::Recurring)?,
            METHOD_LIST_ALARMS => Self::ListAlarms,
            METHOD_CANCEL => alarm(AlarmAction::Cancel)?,
            METHOD_ADVANCE_COUNTDOWN => alarm(AlarmAction::AdvanceCountdown)?,
            METHOD_PAUSE => alarm(AlarmAction::Pause)?,
            METHOD_RESUME => alarm(AlarmAction::Resume)?,
            METHOD_STOP => alarm(AlarmAction::Stop)?,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    /// Whether the command changes alarms and so needs authorization first.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(self, Self::Schedule(_) | Self::Alarm { .. })
    }
}

fn parse_id(args: &Record) -> std::result::Result<AlarmId, ValidationError> {
    let raw = codec::read_string(args, KEY_ID).ok_or_else(|| ValidationError::missing(KEY_ID))?;
    raw.parse()
        .map_err(|_| ValidationError::invalid(KEY_ID, format!("'{raw}' is not a valid alarm id")))
}

/// Outcome of one command, ready to hand back over the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success(Value),
    Error(ErrorPayload),
    /// The command name is not supported
    NotImplemented,
}

pub struct CommandDispatcher<C: AlarmCapability> {
    capability: Arc<C>,
    gate: AuthorizationGate<C>,
    config: BridgeConfig,
}

impl<C: AlarmCapability> CommandDispatcher<C> {
    pub fn new(capability: Arc<C>, config: BridgeConfig) -> Self {
        Self {
            gate: AuthorizationGate::new(Arc::clone(&capability)),
            capability,
            config,
        }
    }

    pub const fn gate(&self) -> &AuthorizationGate<C> {
        &self.gate
    }

    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Run `method` and fold the result into a [`Reply`].
    pub async fn dispatch(&self, method: &str, args: &Record) -> Reply {
        match self.execute(method, args).await {
            Ok(value) => Reply::Success(value),
            Err(Error::UnsupportedCommand(name)) => {
                tracing::debug!("Unsupported command: {}", name);
                Reply::NotImplemented
            }
            Err(error) => {
                tracing::warn!(code = error.code(), "Command {} failed: {}", method, error);
                Reply::Error(error.to_payload())
            }
        }
    }

    /// Parse and run `method`, keeping the typed error.
    pub async fn execute(&self, method: &str, args: &Record) -> Result<Value> {
        let command = Command::parse(method, args, &self.config)?
            .ok_or_else(|| Error::UnsupportedCommand(method.to_string()))?;
        self.run(command).await
    }

    pub async fn run(&self, command: Command) -> Result<Value> {
        if command.is_mutating() {
            self.authorize().await?;
        }

        match command {
            Command::RequestAuthorization => match self.gate.ensure_authorized().await {
                GateOutcome::Authorized => Ok(Value::Bool(true)),
                GateOutcome::Denied => Ok(Value::Bool(false)),
                GateOutcome::PromptFailed(reason) => Err(Error::Authorization(reason)),
            },
            Command::PlatformVersion => Ok(Value::String(self.capability.platform_version())),
            Command::Schedule(config) => {
                let id = AlarmId::new();
                let alarm = self
                    .capability
                    .schedule(id, config)
                    .await
                    .map_err(|error| Error::capability(Operation::Schedule, error))?;
                tracing::info!("Scheduled alarm {}", alarm.id);
                Ok(Value::String(alarm.id.as_str()))
            }
            Command::ListAlarms => {
                let alarms = self
                    .capability
                    .list_alarms()
                    .await
                    .map_err(|error| Error::capability(Operation::List, error))?;
                Ok(Value::Array(
                    alarms
                        .iter()
                        .map(|alarm| Value::Object(codec::encode_alarm(alarm)))
                        .collect(),
                ))
            }
            Command::Alarm { action, id } => {
                self.perform(action, id)
                    .await
                    .map_err(|error| Error::capability(action.operation(), error))?;
                tracing::debug!("{:?} applied to alarm {}", action, id);
                Ok(Value::Bool(true))
            }
        }
    }

    async fn authorize(&self) -> Result<()> {
        match self.gate.ensure_authorized().await {
            GateOutcome::Authorized => Ok(()),
            GateOutcome::Denied => Err(Error::NotAuthorized(DENIED_MESSAGE.to_string())),
            GateOutcome::PromptFailed(reason) => Err(Error::Authorization(reason)),
        }
    }

    async fn perform(
        &self,
        action: AlarmAction,
        id: AlarmId,
    ) -> crate::error::CapabilityResult<()> {
        match action {
            AlarmAction::Cancel => self.capability.cancel(id).await,
            AlarmAction::AdvanceCountdown => self.capability.advance_countdown(id).await,
            AlarmAction::Pause => self.capability.pause(id).await,
            AlarmAction::Resume => self.capability.resume(id).await,
            AlarmAction::Stop => self.capability.stop(id).await,
        }
    }
}
