//! In-memory cache of normalized sheet rows.
//!
//! Freshness is tracked by a single process-wide clock rather than per key:
//! any `set` marks every key fresh and any `invalidate` marks every key stale.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::models::EventRecord;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sheet_id: String,
    pub tab_id: String,
}

impl CacheKey {
    pub fn new(sheet_id: &str, tab_id: &str) -> Self {
        Self {
            sheet_id: sheet_id.to_string(),
            tab_id: tab_id.to_string(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.sheet_id, self.tab_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub rows: Vec<EventRecord>,
    pub fetched_at: DateTime<Utc>,
    pub version: u64,
}

pub struct SheetCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    last_modified: Mutex<Option<Instant>>,
    next_version: AtomicU64,
    poll_interval: Duration,
}

impl Default for SheetCache {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl SheetCache {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            last_modified: Mutex::new(None),
            next_version: AtomicU64::new(1),
            poll_interval,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().expect("sheet cache poisoned")
    }

    fn clock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_modified.lock().expect("sheet cache clock poisoned")
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries().get(key).cloned()
    }

    /// Replaces the entry for `key` and returns its new version.
    pub fn set(&self, key: CacheKey, rows: Vec<EventRecord>) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry {
            rows,
            fetched_at: Utc::now(),
            version,
        };
        self.entries().insert(key, entry);
        *self.clock() = Some(Instant::now());
        version
    }

    pub fn invalidate(&self, key: &CacheKey) {
        self.entries().remove(key);
        *self.clock() = None;
    }

    /// True when nothing has been stored yet or the poll interval has
    /// elapsed since the last store, for every key alike.
    pub fn is_stale(&self) -> bool {
        let last = *self.clock();
        match last {
            Some(at) => at.elapsed() >= self.poll_interval,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries().clear();
        *self.clock() = None;
    }
}
