//! Boundary to the external alarm capability.
//!
//! The capability owns the real timers, notifications and alert presentation.
//! The bridge only talks to it through this trait, so hosts plug in the
//! platform service and tests plug in [`crate::memory::InMemoryCapability`].

use std::future::Future;

use tokio::sync::mpsc;

use crate::builder::ScheduleConfig;
use crate::error::CapabilityResult;
use crate::models::{Alarm, AlarmId, AuthorizationState};

/// Stream of full alarm snapshots, one per change on the capability side.
///
/// The stream may never end. When it does, the capability has gone away.
pub type AlarmUpdates = mpsc::Receiver<Vec<Alarm>>;

pub trait AlarmCapability: Send + Sync + 'static {
    /// Ask the user for permission to schedule alarms.
    ///
    /// Shows at most one prompt per call. Returns the resulting state without
    /// prompting when the state is already decided.
    fn request_authorization(
        &self,
    ) -> impl Future<Output = CapabilityResult<AuthorizationState>> + Send;

    /// Current authorization state. Never prompts.
    fn current_authorization_state(&self) -> AuthorizationState;

    fn schedule(
        &self,
        id: AlarmId,
        config: ScheduleConfig,
    ) -> impl Future<Output = CapabilityResult<Alarm>> + Send;

    fn cancel(&self, id: AlarmId) -> impl Future<Output = CapabilityResult<()>> + Send;

    fn pause(&self, id: AlarmId) -> impl Future<Output = CapabilityResult<()>> + Send;

    fn resume(&self, id: AlarmId) -> impl Future<Output = CapabilityResult<()>> + Send;

    fn stop(&self, id: AlarmId) -> impl Future<Output = CapabilityResult<()>> + Send;

    /// Restart the countdown phase of an alerting alarm.
    fn advance_countdown(&self, id: AlarmId) -> impl Future<Output = CapabilityResult<()>> + Send;

    fn list_alarms(&self) -> impl Future<Output = CapabilityResult<Vec<Alarm>>> + Send;

    /// Subscribe to full-state snapshots.
    fn alarm_updates(&self) -> AlarmUpdates;

    /// Human-readable platform description, e.g. `iOS 26.0`.
    fn platform_version(&self) -> String;
}
