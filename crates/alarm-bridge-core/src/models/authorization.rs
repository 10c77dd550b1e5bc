//! Authorization state model

use serde::{Deserialize, Serialize};

/// Whether the user has allowed this app to schedule alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationState {
    /// Never asked
    #[default]
    NotDetermined,
    Authorized,
    /// Terminal until the user changes it outside the app
    Denied,
}

impl AuthorizationState {
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotDetermined => "notDetermined",
            Self::Authorized => "authorized",
            Self::Denied => "denied",
        }
    }
}
