//! Bounded in-memory transcript cache with FIFO eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use log::*;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 100;

/// Fixed-capacity key/value store evicting the oldest inserted key first.
///
/// Eviction is strict FIFO: reading an entry does not protect it. Entries never
/// expire on their own; a transcript for a video and language is treated as
/// immutable for the lifetime of the process. Critical sections are a single map
/// operation, so readers never wait on a writer for long.
pub struct TranscriptCache {
    capacity: usize,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, String>,
    insertion_order: VecDeque<String>,
}

impl TranscriptCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.get(key).cloned()
    }

    /// Insert `value` under `key`, evicting the oldest key when over capacity.
    ///
    /// Replacing an existing key keeps its original insertion position.
    pub fn put(&self, key: String, value: String) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.entries.get_mut(&key) {
            *existing = value;
            return;
        }

        while inner.entries.len() >= self.capacity {
            match inner.insertion_order.pop_front() {
                Some(oldest) => {
                    trace!("Evicting transcript cache entry {oldest}");
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        inner.insertion_order.push_back(key.clone());
        inner.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TranscriptCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
