//! In-memory cache store for a single session
//!
//! A store lives for a fixed [`STORE_LIFETIME`] from construction. Once that
//! deadline has passed, every public operation clears all entries before doing
//! its work. The deadline itself is never pushed back.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::STORE_LIFETIME;
use crate::cache::clock::Clock;
use crate::cache::entry::CacheEntry;
use crate::cache::key::Matcher;

/// Keyed response cache with a wholesale expiry deadline
pub struct CacheStore {
    expires_at: DateTime<Utc>,
    entries: HashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    /// Create an empty store expiring [`STORE_LIFETIME`] from now
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_lifetime(clock, STORE_LIFETIME)
    }

    pub fn with_lifetime(clock: Arc<dyn Clock>, lifetime: Duration) -> Self {
        let now = clock.now();
        let expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            expires_at,
            entries: HashMap::new(),
            clock,
        }
    }

    /// Store `data` under `key`, replacing any previous entry
    pub fn set(&mut self, key: &str, data: Value) {
        self.wipe_if_expired();
        let now = self.clock.now();
        self.entries
            .insert(key.to_string(), CacheEntry::new(data, now));
    }

    /// Look up `key`, treating entries older than `ttl` as misses.
    ///
    /// Stale entries are left in place; only the generation wipe removes them.
    pub fn get(&mut self, key: &str, ttl: Option<Duration>) -> Option<Value> {
        self.wipe_if_expired();
        let entry = self.entries.get(key)?;

        if let Some(ttl) = ttl {
            let age = entry.age_millis(self.clock.now());
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            if age > ttl_ms {
                return None;
            }
        }
        Some(entry.data.clone())
    }

    /// Remove every entry whose key contains `needle`. Returns the number removed.
    pub fn delete_containing(&mut self, needle: &str) -> usize {
        self.wipe_if_expired();
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(needle));
        before - self.entries.len()
    }

    /// Remove every entry whose key `matcher` accepts. Returns the number removed.
    pub fn delete_matching(&mut self, matcher: &Matcher) -> usize {
        self.wipe_if_expired();
        let before = self.entries.len();
        self.entries.retain(|key, _| !matcher.is_match(key));
        before - self.entries.len()
    }

    /// Whether the wholesale deadline has passed
    pub fn is_expired(&self) -> bool {
        self.clock.now() > self.expires_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Number of stored entries, including individually stale ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn wipe_if_expired(&mut self) {
        if self.is_expired() && !self.entries.is_empty() {
            log::info!(
                "Cache generation expired at {}, dropping {} entries",
                self.expires_at,
                self.entries.len()
            );
            self.entries.clear();
        }
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("expires_at", &self.expires_at)
            .field("entries", &self.entries.len())
            .finish()
    }
}
