//! Append-only history log shared by audited entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single immutable record in an entity's history.
///
/// Serialized as `{"ts": .., "action": .., "payload": {..}}`; the action tag
/// and payload shape come from the event type `E`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<E> {
    /// When the entry was recorded.
    pub ts: DateTime<Utc>,
    /// What happened.
    #[serde(flatten)]
    pub event: E,
}

/// Ordered history of an entity.
///
/// Entries can only be appended through [`History::record`]; there is no way
/// to edit, reorder or drop an entry short of dropping the whole log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History<E> {
    entries: Vec<HistoryEntry<E>>,
}

impl<E> Default for History<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E> History<E> {
    /// Creates a history seeded with a single event.
    pub fn starting_with(event: E) -> Self {
        let mut history = Self::default();
        history.record(event);
        history
    }

    /// Appends an event stamped with the current time.
    pub fn record(&mut self, event: E) -> &HistoryEntry<E> {
        self.entries.push(HistoryEntry {
            ts: Utc::now(),
            event,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&HistoryEntry<E>> {
        self.entries.last()
    }

    /// Iterates entries in commit order.
    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry<E>> {
        self.entries.iter()
    }

    /// Borrows the entries as a slice.
    pub fn entries(&self) -> &[HistoryEntry<E>] {
        &self.entries
    }
}

impl<'a, E> IntoIterator for &'a History<E> {
    type Item = &'a HistoryEntry<E>;
    type IntoIter = std::slice::Iter<'a, HistoryEntry<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
