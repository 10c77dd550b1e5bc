//! Authorization gate in front of every mutating command.
//!
//! The capability is the source of truth for the authorization state. The gate
//! only decides whether a prompt is needed and makes sure at most one prompt
//! is in flight: callers that arrive while a prompt is pending wait for that
//! prompt's outcome instead of starting another.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::capability::AlarmCapability;
use crate::models::AuthorizationState;
use crate::util::lock;

/// Result of [`AuthorizationGate::ensure_authorized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Authorized,
    /// Denied now or earlier, or the prompt was dismissed without a decision
    Denied,
    /// The prompt mechanism failed; the state is unchanged and a later call
    /// may prompt again
    PromptFailed(String),
}

type PendingPrompt = watch::Receiver<Option<GateOutcome>>;
type PromptSlot = Arc<Mutex<Option<PendingPrompt>>>;

enum Ticket {
    /// The state was settled by the time the slot was checked
    Settled(GateOutcome),
    Waiting(PendingPrompt),
}

/// Publishes a prompt's outcome. Dropping it unpublished, because the prompt
/// task panicked or was aborted, still empties the slot so a dead prompt is
/// never joined.
struct PromptPublisher {
    slot: PromptSlot,
    sender: Option<watch::Sender<Option<GateOutcome>>>,
}

impl PromptPublisher {
    /// Empty the slot, then wake the waiters, so a caller arriving after
    /// this point starts from the capability's updated state.
    fn publish(mut self, outcome: GateOutcome) {
        lock(&self.slot).take();
        if let Some(sender) = self.sender.take() {
            sender.send_replace(Some(outcome));
        }
    }
}

impl Drop for PromptPublisher {
    fn drop(&mut self) {
        if self.sender.is_some() {
            lock(&self.slot).take();
        }
    }
}

pub struct AuthorizationGate<C: AlarmCapability> {
    capability: Arc<C>,
    pending: PromptSlot,
}

impl<C: AlarmCapability> AuthorizationGate<C> {
    pub fn new(capability: Arc<C>) -> Self {
        Self {
            capability,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Current state as reported by the capability. Never prompts.
    pub fn state(&self) -> AuthorizationState {
        self.capability.current_authorization_state()
    }

    /// Whether a prompt is currently in flight.
    pub fn is_prompting(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Make sure the app may schedule alarms, prompting only when undecided.
    ///
    /// Must be called from within a Tokio runtime; the prompt runs on its own
    /// task so that a caller giving up does not strand the others.
    pub async fn ensure_authorized(&self) -> GateOutcome {
        if let Some(outcome) = settled(self.state()) {
            return outcome;
        }

        let mut pending = match self.join_or_start_prompt() {
            Ticket::Settled(outcome) => return outcome,
            Ticket::Waiting(pending) => pending,
        };
        let outcome = pending
            .wait_for(Option::is_some)
            .await
            .map(|outcome| outcome.clone());
        match outcome {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                GateOutcome::PromptFailed("authorization prompt produced no outcome".to_string())
            }
            Err(_) => GateOutcome::PromptFailed("authorization prompt was abandoned".to_string()),
        }
    }

    fn join_or_start_prompt(&self) -> Ticket {
        let mut pending = lock(&self.pending);
        if let Some(receiver) = pending.as_ref() {
            tracing::debug!("Joining in-flight authorization prompt");
            return Ticket::Waiting(receiver.clone());
        }

        // A prompt may have finished between the caller's state read and
        // taking the slot lock.
        if let Some(outcome) = settled(self.state()) {
            return Ticket::Settled(outcome);
        }

        let (sender, receiver) = watch::channel(None);
        *pending = Some(receiver.clone());
        drop(pending);

        let capability = Arc::clone(&self.capability);
        let publisher = PromptPublisher {
            slot: Arc::clone(&self.pending),
            sender: Some(sender),
        };
        tokio::spawn(async move {
            tracing::info!("Requesting alarm authorization");
            let outcome = match capability.request_authorization().await {
                Ok(AuthorizationState::Authorized) => GateOutcome::Authorized,
                Ok(state) => {
                    tracing::info!("Alarm authorization not granted ({})", state.as_str());
                    GateOutcome::Denied
                }
                Err(error) => {
                    tracing::warn!("Alarm authorization prompt failed: {}", error);
                    GateOutcome::PromptFailed(error.to_string())
                }
            };
            publisher.publish(outcome);
        });

        Ticket::Waiting(receiver)
    }
}

const fn settled(state: AuthorizationState) -> Option<GateOutcome> {
    match state {
        AuthorizationState::Authorized => Some(GateOutcome::Authorized),
        AuthorizationState::Denied => Some(GateOutcome::Denied),
        AuthorizationState::NotDetermined => None,
    }
}
