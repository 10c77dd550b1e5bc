//! In-process alarm capability.
//!
//! Keeps alarms in memory and behaves like the platform service closely
//! enough to drive the bridge end to end: it prompts (with a scripted answer),
//! applies the countdown state machine, and pushes a full snapshot to every
//! update stream after each change. The CLI harness and the tests run against
//! it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::builder::ScheduleConfig;
use crate::capability::{AlarmCapability, AlarmUpdates};
use crate::config::BridgeConfig;
use crate::error::{CapabilityError, CapabilityResult};
use crate::models::{
    Alarm, AlarmId, AlarmState, AuthorizationState, CountdownDuration, ScheduleKind,
};
use crate::util::lock;

const DEFAULT_PLATFORM_VERSION: &str = "in-memory 1.0";

/// How the scripted user answers the authorization prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptAnswer {
    #[default]
    Authorize,
    Deny,
    /// Dismiss without deciding; the state stays `NotDetermined`
    Dismiss,
    /// The prompt mechanism itself errors
    Fail,
}

#[derive(Debug, Default)]
struct Inner {
    alarms: Vec<Alarm>,
    authorization: AuthorizationState,
    prompt_answer: PromptAnswer,
    subscribers: Vec<mpsc::Sender<Vec<Alarm>>>,
}

impl Inner {
    fn position(&self, id: AlarmId) -> CapabilityResult<usize> {
        self.alarms
            .iter()
            .position(|alarm| alarm.id == id)
            .ok_or(CapabilityError::UnknownAlarm(id))
    }

    fn alarm_mut(&mut self, id: AlarmId) -> CapabilityResult<&mut Alarm> {
        let position = self.position(id)?;
        Ok(&mut self.alarms[position])
    }
}

#[derive(Debug)]
pub struct InMemoryCapability {
    inner: Mutex<Inner>,
    /// Serializes mutate-then-broadcast so snapshots arrive in change order
    broadcast: tokio::sync::Mutex<()>,
    prompt_invocations: AtomicUsize,
    prompt_delay: Duration,
    update_buffer: usize,
    platform_version: String,
}

impl Default for InMemoryCapability {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCapability {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&BridgeConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &BridgeConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            broadcast: tokio::sync::Mutex::new(()),
            prompt_invocations: AtomicUsize::new(0),
            prompt_delay: Duration::ZERO,
            update_buffer: config.update_buffer.max(1),
            platform_version: config
                .platform_version
                .clone()
                .unwrap_or_else(|| DEFAULT_PLATFORM_VERSION.to_string()),
        }
    }

    #[must_use]
    pub fn with_prompt_answer(self, answer: PromptAnswer) -> Self {
        self.set_prompt_answer(answer);
        self
    }

    /// Make every prompt take `delay` before it is answered.
    #[must_use]
    pub const fn with_prompt_delay(mut self, delay: Duration) -> Self {
        self.prompt_delay = delay;
        self
    }

    #[must_use]
    pub fn with_authorization(self, state: AuthorizationState) -> Self {
        self.set_authorization_state(state);
        self
    }

    pub fn set_prompt_answer(&self, answer: PromptAnswer) {
        lock(&self.inner).prompt_answer = answer;
    }

    /// Change the authorization state out of band, as a settings change would.
    pub fn set_authorization_state(&self, state: AuthorizationState) {
        lock(&self.inner).authorization = state;
    }

    /// How many times `request_authorization` has been called.
    pub fn prompt_invocations(&self) -> usize {
        self.prompt_invocations.load(Ordering::SeqCst)
    }

    /// Number of live update streams.
    pub fn subscriber_count(&self) -> usize {
        let mut inner = lock(&self.inner);
        inner.subscribers.retain(|sender| !sender.is_closed());
        inner.subscribers.len()
    }

    /// Insert an alarm directly, bypassing scheduling. An alarm with the
    /// same id is replaced in place.
    pub async fn insert(&self, alarm: Alarm) -> CapabilityResult<()> {
        self.mutate(move |inner| {
            match inner.position(alarm.id) {
                Ok(position) => inner.alarms[position] = alarm,
                Err(_) => inner.alarms.push(alarm),
            }
            Ok(())
        })
        .await
    }

    /// Move an alarm into the alerting state.
    pub async fn fire(&self, id: AlarmId) -> CapabilityResult<()> {
        self.set_state(id, AlarmState::Ringing).await
    }

    /// Force an alarm into `state`.
    pub async fn set_state(&self, id: AlarmId, state: AlarmState) -> CapabilityResult<()> {
        self.mutate(move |inner| {
            inner.alarm_mut(id)?.state = state;
            Ok(())
        })
        .await
    }

    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Inner) -> CapabilityResult<T>,
    ) -> CapabilityResult<T> {
        let _serial = self.broadcast.lock().await;
        let (result, snapshot, subscribers) = {
            let mut inner = lock(&self.inner);
            let result = change(&mut inner)?;
            (result, inner.alarms.clone(), inner.subscribers.clone())
        };

        let mut closed = 0usize;
        for subscriber in &subscribers {
            if subscriber.send(snapshot.clone()).await.is_err() {
                closed += 1;
            }
        }
        if closed > 0 {
            lock(&self.inner)
                .subscribers
                .retain(|sender| !sender.is_closed());
        }

        Ok(result)
    }
}

impl AlarmCapability for InMemoryCapability {
    async fn request_authorization(&self) -> CapabilityResult<AuthorizationState> {
        self.prompt_invocations.fetch_add(1, Ordering::SeqCst);
        if !self.prompt_delay.is_zero() {
            tokio::time::sleep(self.prompt_delay).await;
        }

        let mut inner = lock(&self.inner);
        if inner.authorization != AuthorizationState::NotDetermined {
            return Ok(inner.authorization);
        }

        match inner.prompt_answer {
            PromptAnswer::Authorize => inner.authorization = AuthorizationState::Authorized,
            PromptAnswer::Deny => inner.authorization = AuthorizationState::Denied,
            PromptAnswer::Dismiss => {}
            PromptAnswer::Fail => {
                return Err(CapabilityError::Unavailable(
                    "authorization prompt could not be shown".to_string(),
                ))
            }
        }
        Ok(inner.authorization)
    }

    fn current_authorization_state(&self) -> AuthorizationState {
        lock(&self.inner).authorization
    }

    async fn schedule(&self, id: AlarmId, config: ScheduleConfig) -> CapabilityResult<Alarm> {
        self.mutate(move |inner| {
            if inner.position(id).is_ok() {
                return Err(CapabilityError::Rejected(format!(
                    "an alarm with id {id} already exists"
                )));
            }

            let (countdown, state) = match &config.schedule {
                ScheduleKind::Countdown {
                    pre_alert,
                    post_alert,
                } => (
                    Some(CountdownDuration {
                        pre_alert: *pre_alert,
                        post_alert: *post_alert,
                    }),
                    AlarmState::Countdown,
                ),
                ScheduleKind::Fixed { .. } | ScheduleKind::Relative { .. } => {
                    (None, AlarmState::Scheduled)
                }
            };

            let alarm = Alarm {
                id,
                schedule: config.schedule.to_schedule(),
                countdown,
                state,
                label: Some(config.presentation.title),
            };
            inner.alarms.push(alarm.clone());
            Ok(alarm)
        })
        .await
    }

    async fn cancel(&self, id: AlarmId) -> CapabilityResult<()> {
        self.mutate(move |inner| {
            let position = inner.position(id)?;
            inner.alarms.remove(position);
            Ok(())
        })
        .await
    }

    async fn pause(&self, id: AlarmId) -> CapabilityResult<()> {
        self.mutate(move |inner| {
            let alarm = inner.alarm_mut(id)?;
            if alarm.state != AlarmState::Countdown {
                return Err(CapabilityError::Rejected(format!(
                    "alarm {id} is {} and cannot be paused",
                    alarm.state
                )));
            }
            alarm.state = AlarmState::Paused;
            Ok(())
        })
        .await
    }

    async fn resume(&self, id: AlarmId) -> CapabilityResult<()> {
        self.mutate(move |inner| {
            let alarm = inner.alarm_mut(id)?;
            if alarm.state != AlarmState::Paused {
                return Err(CapabilityError::Rejected(format!(
                    "alarm {id} is {} and cannot be resumed",
                    alarm.state
                )));
            }
            alarm.state = AlarmState::Countdown;
            Ok(())
        })
        .await
    }

    async fn stop(&self, id: AlarmId) -> CapabilityResult<()> {
        self.mutate(move |inner| {
            let position = inner.position(id)?;
            if inner.alarms[position].repeats() {
                inner.alarms[position].state = AlarmState::Scheduled;
            } else {
                inner.alarms.remove(position);
            }
            Ok(())
        })
        .await
    }

    async fn advance_countdown(&self, id: AlarmId) -> CapabilityResult<()> {
        self.mutate(move |inner| {
            let alarm = inner.alarm_mut(id)?;
            if alarm.countdown.is_none() {
                return Err(CapabilityError::Rejected(format!(
                    "alarm {id} has no countdown"
                )));
            }
            alarm.state = AlarmState::Countdown;
            Ok(())
        })
        .await
    }

    async fn list_alarms(&self) -> CapabilityResult<Vec<Alarm>> {
        Ok(lock(&self.inner).alarms.clone())
    }

    fn alarm_updates(&self) -> AlarmUpdates {
        let (sender, receiver) = mpsc::channel(self.update_buffer);
        let mut inner = lock(&self.inner);
        // A fresh channel always has room for the initial snapshot.
        let _ = sender.try_send(inner.alarms.clone());
        inner.subscribers.push(sender);
        receiver
    }

    fn platform_version(&self) -> String {
        self.platform_version.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;
    use crate::builder::TintColor;
    use crate::models::{Recurrence, Weekday};

    fn countdown_config(post_alert: u64) -> ScheduleConfig {
        ScheduleConfig::new(
            ScheduleKind::Countdown {
                pre_alert: Duration::from_secs(60),
                post_alert: Duration::from_secs(post_alert),
            },
            "Tea",
            TintColor::default(),
        )
    }

    fn fixed_config() -> ScheduleConfig {
        ScheduleConfig::new(
            ScheduleKind::Fixed {
                instant: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            },
            "Wake",
            TintColor::default(),
        )
    }

    #[tokio::test]
    async fn prompt_follows_scripted_answer() {
        let capability = InMemoryCapability::new().with_prompt_answer(PromptAnswer::Deny);
        assert_eq!(
            capability.request_authorization().await,
            Ok(AuthorizationState::Denied)
        );
        assert_eq!(capability.current_authorization_state(), AuthorizationState::Denied);

        // Decided state is returned as-is.
        capability.set_prompt_answer(PromptAnswer::Authorize);
        assert_eq!(
            capability.request_authorization().await,
            Ok(AuthorizationState::Denied)
        );
        assert_eq!(capability.prompt_invocations(), 2);
    }

    #[tokio::test]
    async fn failed_or_dismissed_prompt_stays_undetermined() {
        let capability = InMemoryCapability::new().with_prompt_answer(PromptAnswer::Fail);
        assert!(capability.request_authorization().await.is_err());
        assert_eq!(
            capability.current_authorization_state(),
            AuthorizationState::NotDetermined
        );

        capability.set_prompt_answer(PromptAnswer::Dismiss);
        assert_eq!(
            capability.request_authorization().await,
            Ok(AuthorizationState::NotDetermined)
        );
    }

    #[tokio::test]
    async fn schedule_countdown_starts_counting_down() {
        let capability = InMemoryCapability::new();
        let id = AlarmId::new();
        let alarm = capability.schedule(id, countdown_config(30)).await.unwrap();
        assert_eq!(alarm.state, AlarmState::Countdown);
        assert_eq!(alarm.schedule, None);
        assert_eq!(alarm.label.as_deref(), Some("Tea"));

        let duplicate = capability.schedule(id, countdown_config(30)).await;
        assert!(matches!(duplicate, Err(CapabilityError::Rejected(_))));
    }

    #[tokio::test]
    async fn pause_and_resume_follow_countdown_state() {
        let capability = InMemoryCapability::new();
        let id = AlarmId::new();
        capability.schedule(id, countdown_config(0)).await.unwrap();

        capability.pause(id).await.unwrap();
        assert!(capability.pause(id).await.is_err());
        capability.resume(id).await.unwrap();
        assert!(capability.resume(id).await.is_err());

        let alarms = capability.list_alarms().await.unwrap();
        assert_eq!(alarms[0].state, AlarmState::Countdown);
    }

    #[tokio::test]
    async fn stop_removes_one_shot_but_keeps_repeating() {
        let capability = InMemoryCapability::new();
        let once = AlarmId::new();
        capability.schedule(once, fixed_config()).await.unwrap();

        let weekly = AlarmId::new();
        let weekly_config = ScheduleConfig::new(
            ScheduleKind::Relative {
                hour: 7,
                minute: 0,
                recurrence: Recurrence::weekly([Weekday::Monday]),
            },
            "Gym",
            TintColor::default(),
        );
        capability.schedule(weekly, weekly_config).await.unwrap();

        capability.fire(once).await.unwrap();
        capability.fire(weekly).await.unwrap();
        capability.stop(once).await.unwrap();
        capability.stop(weekly).await.unwrap();

        let alarms = capability.list_alarms().await.unwrap();
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].id, weekly);
        assert_eq!(alarms[0].state, AlarmState::Scheduled);
    }

    #[tokio::test]
    async fn advance_countdown_requires_countdown_durations() {
        let capability = InMemoryCapability::new();
        let fixed = AlarmId::new();
        capability.schedule(fixed, fixed_config()).await.unwrap();
        assert!(capability.advance_countdown(fixed).await.is_err());

        let timer = AlarmId::new();
        capability.schedule(timer, countdown_config(120)).await.unwrap();
        capability.fire(timer).await.unwrap();
        capability.advance_countdown(timer).await.unwrap();
        let alarms = capability.list_alarms().await.unwrap();
        assert_eq!(alarms[1].state, AlarmState::Countdown);
    }

    #[tokio::test]
    async fn unknown_ids_are_rejected() {
        let capability = InMemoryCapability::new();
        let id = AlarmId::new();
        assert_eq!(
            capability.cancel(id).await,
            Err(CapabilityError::UnknownAlarm(id))
        );
        assert_eq!(
            capability.stop(id).await,
            Err(CapabilityError::UnknownAlarm(id))
        );
    }

    #[tokio::test]
    async fn updates_start_with_current_snapshot_then_follow_changes() {
        let capability = InMemoryCapability::new();
        let first = AlarmId::new();
        capability.schedule(first, fixed_config()).await.unwrap();

        let mut updates = capability.alarm_updates();
        assert_eq!(updates.recv().await.map(|alarms| alarms.len()), Some(1));

        capability.cancel(first).await.unwrap();
        assert_eq!(updates.recv().await.map(|alarms| alarms.len()), Some(0));
    }

    #[tokio::test]
    async fn dropped_streams_are_pruned() {
        let capability = InMemoryCapability::new();
        let updates = capability.alarm_updates();
        assert_eq!(capability.subscriber_count(), 1);
        drop(updates);

        capability.schedule(AlarmId::new(), fixed_config()).await.unwrap();
        assert_eq!(capability.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn insert_replaces_alarm_with_same_id_and_broadcasts() {
        let capability = InMemoryCapability::new();
        let id = AlarmId::from_uuid(Uuid::from_u128(0x5eed));
        let mut alarm = Alarm {
            id,
            schedule: None,
            countdown: None,
            state: AlarmState::Scheduled,
            label: Some("Imported".to_string()),
        };
        capability.insert(alarm.clone()).await.unwrap();
        let mut updates = capability.alarm_updates();
        assert_eq!(updates.recv().await, Some(vec![alarm.clone()]));

        alarm.state = AlarmState::Ringing;
        capability.insert(alarm.clone()).await.unwrap();
        assert_eq!(updates.recv().await, Some(vec![alarm]));
        assert_eq!(
            capability.list_alarms().await.unwrap()[0].id.as_str(),
            "00000000-0000-0000-0000-000000005eed"
        );
    }
}
