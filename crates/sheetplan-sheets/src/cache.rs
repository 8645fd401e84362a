//! Snapshot Cache
//!
//! Process-local TTL cache for range reads, keyed by spreadsheet id plus
//! the sorted range list. The lock is never held across an `.await`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_MAX_ENTRIES: usize = 256;

const KEY_SEPARATOR: &str = "::";

struct Entry<V> {
    value: V,
    stored_at: Instant,
    /// Insertion order; the smallest is evicted first
    seq: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    next_seq: u64,
}

pub struct SnapshotCache<V> {
    ttl: Duration,
    max_entries: usize,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> SnapshotCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Cache key for a read of `ranges`; range order does not matter.
    pub fn key(spreadsheet_id: &str, ranges: &[String]) -> String {
        let mut sorted: Vec<&str> = ranges.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        format!("{}{}{}", spreadsheet_id, KEY_SEPARATOR, sorted.join("|"))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`. An expired entry is removed on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => entry.stored_at.elapsed() >= self.ttl,
        };
        if expired {
            inner.entries.remove(key);
            return None;
        }
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value`. A new key on a full cache evicts the single oldest
    /// entry; overwriting an existing key evicts nothing and makes that
    /// entry the newest.
    pub fn put(&self, key: impl Into<String>, value: V) {
        if self.max_entries == 0 {
            return;
        }
        let key = key.into();
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
                seq,
            },
        );
    }

    /// Drop every entry of one spreadsheet; returns how many were removed.
    pub fn invalidate(&self, spreadsheet_id: &str) -> usize {
        let prefix = format!("{}{}", spreadsheet_id, KEY_SEPARATOR);
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(&prefix));
        before - inner.entries.len()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Stored entries, expired ones included until they are next touched.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for SnapshotCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}
