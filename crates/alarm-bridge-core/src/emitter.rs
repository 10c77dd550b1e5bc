//! Event stream from capability snapshots to a host subscriber.
//!
//! One worker task per subscription reads snapshots, diffs them against its
//! own registry and hands each event to the sink as a flat record. Only one
//! subscription is live at a time; subscribing again replaces the previous
//! one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::capability::{AlarmCapability, AlarmUpdates};
use crate::codec::{self, Record};
use crate::registry::AlarmRegistry;
use crate::util::lock;

/// Receives encoded alarm events.
///
/// `deliver` is called from the subscription's worker task while that
/// subscription's sink lock is held, and a whole snapshot's batch goes out
/// under one acquisition. [`EventEmitter::cancel`] and
/// [`EventEmitter::subscribe`] wait for that lock, so calling either from
/// inside `deliver` deadlocks. Hand the event off instead of blocking.
pub trait EventSink: Send + Sync + 'static {
    fn deliver(&self, event: Record);
}

impl EventSink for mpsc::UnboundedSender<Record> {
    fn deliver(&self, event: Record) {
        if self.send(event).is_err() {
            tracing::debug!("Event receiver dropped, discarding alarm event");
        }
    }
}

/// Identifies one call to [`EventEmitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
}

type SinkSlot = Arc<Mutex<Option<Arc<dyn EventSink>>>>;

struct ActiveSubscription {
    id: u64,
    slot: SinkSlot,
    task: JoinHandle<()>,
}

impl ActiveSubscription {
    /// Detach the sink before aborting so that no event is delivered after
    /// this returns, even if the worker is mid-batch on another thread.
    fn shutdown(self) {
        lock(&self.slot).take();
        self.task.abort();
    }
}

pub struct EventEmitter<C: AlarmCapability> {
    capability: Arc<C>,
    active: Mutex<Option<ActiveSubscription>>,
    next_id: AtomicU64,
}

impl<C: AlarmCapability> EventEmitter<C> {
    pub fn new(capability: Arc<C>) -> Self {
        Self {
            capability,
            active: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start forwarding events to `sink`, replacing any current subscriber.
    ///
    /// The new subscriber first receives `add` for every alarm that already
    /// exists. Must be called from within a Tokio runtime.
    pub fn subscribe(&self, sink: impl EventSink) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let sink: Arc<dyn EventSink> = Arc::new(sink);
        let slot: SinkSlot = Arc::new(Mutex::new(Some(sink)));

        let mut active = lock(&self.active);
        if let Some(previous) = active.take() {
            tracing::info!("Replacing alarm event subscription {}", previous.id);
            previous.shutdown();
        }

        let updates = self.capability.alarm_updates();
        let task = tokio::spawn(drain(updates, Arc::clone(&slot), id));
        *active = Some(ActiveSubscription { id, slot, task });
        tracing::debug!("Alarm event subscription {} started", id);

        SubscriptionHandle { id }
    }

    /// Stop the subscription behind `handle`.
    ///
    /// A batch already being delivered finishes first; nothing reaches the
    /// sink once this returns. Returns `false` when `handle` was already
    /// replaced or cancelled.
    pub fn cancel(&self, handle: SubscriptionHandle) -> bool {
        let mut active = lock(&self.active);
        match active.take() {
            Some(current) if current.id == handle.id => {
                current.shutdown();
                tracing::debug!("Alarm event subscription {} cancelled", handle.id);
                true
            }
            other => {
                *active = other;
                false
            }
        }
    }

    /// Whether a subscriber is attached and its stream is still open.
    pub fn is_active(&self) -> bool {
        lock(&self.active)
            .as_ref()
            .is_some_and(|current| lock(&current.slot).is_some())
    }
}

impl<C: AlarmCapability> Drop for EventEmitter<C> {
    fn drop(&mut self) {
        if let Some(current) = lock(&self.active).take() {
            current.shutdown();
        }
    }
}

async fn drain(mut updates: AlarmUpdates, slot: SinkSlot, id: u64) {
    let mut registry = AlarmRegistry::new();

    while let Some(alarms) = updates.recv().await {
        let events = registry.apply(alarms);
        if events.is_empty() {
            continue;
        }

        let sink = lock(&slot);
        let Some(sink) = sink.as_ref() else {
            return;
        };
        for event in &events {
            sink.deliver(codec::encode_event(event));
        }
    }

    tracing::info!("Alarm update stream ended for subscription {}", id);
    lock(&slot).take();
}
