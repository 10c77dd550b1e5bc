//! Alarm registry and snapshot diffing.
//!
//! The capability only ever pushes complete snapshots. [`AlarmRegistry`] keeps
//! the last one it saw and turns each new snapshot into an ordered list of
//! [`AlarmEvent`]s: every removal first, then every addition, then an update for
//! every alarm present in both snapshots.
//!
//! Updates are emitted unconditionally. Consumers ignore updates that change
//! nothing; a field-by-field comparison that missed a change would lose data.

use std::collections::HashMap;

use crate::models::{Alarm, AlarmEvent, AlarmId};

/// Immutable view of every alarm known at one point in time, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    alarms: Vec<Alarm>,
    index: HashMap<AlarmId, usize>,
}

impl RegistrySnapshot {
    /// Collect alarms into a snapshot.
    ///
    /// A repeated id keeps the position of its first occurrence and the value
    /// of its last one.
    pub fn from_alarms(alarms: impl IntoIterator<Item = Alarm>) -> Self {
        let mut snapshot = Self::default();
        for alarm in alarms {
            if let Some(&position) = snapshot.index.get(&alarm.id) {
                snapshot.alarms[position] = alarm;
            } else {
                snapshot.index.insert(alarm.id, snapshot.alarms.len());
                snapshot.alarms.push(alarm);
            }
        }
        snapshot
    }

    #[must_use]
    pub fn get(&self, id: &AlarmId) -> Option<&Alarm> {
        self.index.get(id).map(|&position| &self.alarms[position])
    }

    #[must_use]
    pub fn contains(&self, id: &AlarmId) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alarm> {
        self.alarms.iter()
    }
}

impl FromIterator<Alarm> for RegistrySnapshot {
    fn from_iter<T: IntoIterator<Item = Alarm>>(iter: T) -> Self {
        Self::from_alarms(iter)
    }
}

/// Compare two snapshots without touching either.
///
/// Output order is all `Removed` (in `previous` order), then all `Added`, then
/// all `Updated` (both in `current` order).
#[must_use]
pub fn diff(previous: &RegistrySnapshot, current: &RegistrySnapshot) -> Vec<AlarmEvent> {
    let removed = previous
        .iter()
        .filter(|alarm| !current.contains(&alarm.id))
        .map(|alarm| AlarmEvent::Removed(alarm.id));

    let added = current
        .iter()
        .filter(|alarm| !previous.contains(&alarm.id))
        .map(|alarm| AlarmEvent::Added(alarm.clone()));

    let updated = current
        .iter()
        .filter(|alarm| previous.contains(&alarm.id))
        .map(|alarm| AlarmEvent::Updated(alarm.clone()));

    removed.chain(added).chain(updated).collect()
}

/// Holds the last observed snapshot. Owned by exactly one worker.
#[derive(Debug, Default)]
pub struct AlarmRegistry {
    snapshot: RegistrySnapshot,
}

impl AlarmRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff `alarms` against the stored snapshot, then replace the stored
    /// snapshot with `alarms` wholesale.
    pub fn apply(&mut self, alarms: impl IntoIterator<Item = Alarm>) -> Vec<AlarmEvent> {
        let current = RegistrySnapshot::from_alarms(alarms);
        let events = diff(&self.snapshot, &current);
        tracing::debug!(
            previous = self.snapshot.len(),
            current = current.len(),
            events = events.len(),
            "Computed alarm diff"
        );
        self.snapshot = current;
        events
    }

    #[must_use]
    pub const fn snapshot(&self) -> &RegistrySnapshot {
        &self.snapshot
    }
}
