//! Per-field quiescence timers.
//!
//! Each field owns at most one pending entry. Observing a field again replaces
//! the pending value and pushes its deadline out, so only the last value seen
//! before the field goes quiet is ever emitted. Deadlines are plain
//! millisecond timestamps; the owner decides when to call
//! [`Debouncer::flush_ready`].

use std::collections::BTreeMap;

use crate::profile::model::FieldName;

/// Value that has stayed unchanged for a full quiescence window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableEdit {
    pub field: FieldName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEdit {
    value: String,
    deadline_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceStats {
    pub observed: u64,
    /// Observations that replaced a still-pending value.
    pub superseded: u64,
    pub emitted: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    pending: BTreeMap<FieldName, PendingEdit>,
    stats: DebounceStats,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `field` and (re)starts its timer.
    pub fn observe(&mut self, field: FieldName, value: impl Into<String>, now_ms: u64, window_ms: u64) {
        self.stats.observed = self.stats.observed.saturating_add(1);
        let next = PendingEdit {
            value: value.into(),
            deadline_ms: now_ms.saturating_add(window_ms),
        };
        if self.pending.insert(field, next).is_some() {
            self.stats.superseded = self.stats.superseded.saturating_add(1);
        }
    }

    /// Emits every entry whose deadline has passed, in field order.
    pub fn flush_ready(&mut self, now_ms: u64) -> Vec<StableEdit> {
        let ready: Vec<FieldName> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline_ms <= now_ms)
            .map(|(field, _)| *field)
            .collect();
        let mut stable = Vec::with_capacity(ready.len());
        for field in ready {
            if let Some(pending) = self.pending.remove(&field) {
                stable.push(StableEdit {
                    field,
                    value: pending.value,
                });
            }
        }
        self.stats.emitted = self.stats.emitted.saturating_add(stable.len() as u64);
        stable
    }

    /// Drops the pending entry for `field`. Returns the value it held.
    pub fn cancel(&mut self, field: FieldName) -> Option<String> {
        let removed = self.pending.remove(&field).map(|pending| pending.value);
        if removed.is_some() {
            self.stats.cancelled = self.stats.cancelled.saturating_add(1);
        }
        removed
    }

    /// Drops every pending entry. Used on teardown.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        self.stats.cancelled = self.stats.cancelled.saturating_add(count as u64);
        count
    }

    pub fn pending_value(&self, field: FieldName) -> Option<&str> {
        self.pending.get(&field).map(|pending| pending.value.as_str())
    }

    /// Earliest deadline among pending entries.
    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.values().map(|pending| pending.deadline_ms).min()
    }

    pub fn stats(&self) -> &DebounceStats {
        &self.stats
    }
}
