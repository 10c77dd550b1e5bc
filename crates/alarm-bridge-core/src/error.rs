//! Error types for alarm-bridge-core

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AlarmId;

/// Result type alias using alarm-bridge-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Malformed or missing command arguments. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required argument '{0}'")]
    MissingField(String),

    #[error("Invalid argument '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending argument
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField(field) | Self::InvalidField { field, .. } => field,
        }
    }
}

/// Failure reported by the external alarm capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("No alarm with id {0}")]
    UnknownAlarm(AlarmId),

    #[error("{0}")]
    Rejected(String),

    #[error("Alarm service unavailable: {0}")]
    Unavailable(String),
}

pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Capability call that failed, used to pick the wire error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Authorize,
    Schedule,
    List,
    Cancel,
    AdvanceCountdown,
    Pause,
    Resume,
    Stop,
}

impl Operation {
    #[must_use]
    pub const fn error_code(self) -> &'static str {
        match self {
            Self::Authorize => "AUTH_ERROR",
            Self::Schedule => "SCHEDULE_ERROR",
            Self::List => "LIST_ERROR",
            Self::Cancel => "CANCEL_ERROR",
            Self::AdvanceCountdown => "COUNTDOWN_ERROR",
            Self::Pause => "PAUSE_ERROR",
            Self::Resume => "RESUME_ERROR",
            Self::Stop => "STOP_ERROR",
        }
    }

    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Authorize => "request alarm authorization",
            Self::Schedule => "schedule alarm",
            Self::List => "list alarms",
            Self::Cancel => "cancel alarm",
            Self::AdvanceCountdown => "start alarm countdown",
            Self::Pause => "pause alarm",
            Self::Resume => "resume alarm",
            Self::Stop => "stop alarm",
        }
    }
}

/// Errors that can occur in alarm-bridge-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Bad command arguments
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The authorization prompt itself failed; the caller may retry
    #[error("Failed to request alarm authorization: {0}")]
    Authorization(String),

    /// Authorization was denied or declined
    #[error("{0}")]
    NotAuthorized(String),

    /// The capability rejected the command
    #[error("Failed to {}: {source}", operation.describe())]
    Capability {
        operation: Operation,
        #[source]
        source: CapabilityError,
    },

    /// Command name the bridge does not know
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),
}

impl Error {
    pub const fn capability(operation: Operation, source: CapabilityError) -> Self {
        Self::Capability { operation, source }
    }

    /// Stable wire code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "BAD_ARGS",
            Self::Authorization(_) => "AUTH_ERROR",
            Self::NotAuthorized(_) => "NOT_AUTHORIZED",
            Self::Capability { operation, .. } => operation.error_code(),
            Self::UnsupportedCommand(_) => "UNIMPLEMENTED",
        }
    }

    #[must_use]
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Uniform `(code, message)` pair handed back over the command channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl From<&Error> for ErrorPayload {
    fn from(error: &Error) -> Self {
        error.to_payload()
    }
}
