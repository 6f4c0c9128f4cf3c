//! Session-bound cache registry
//!
//! Holds at most one live [`CacheStore`]. Presenting a different session
//! identifier than the one the store was created for discards it and starts
//! a fresh store, so only the current session's data is ever served.

use std::sync::{Arc, Mutex};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::store::CacheStore;

struct LiveSession {
    session_id: String,
    store: CacheStore,
}

/// Shared owner of the single live cache store.
///
/// Construct once per host and hand an `Arc` to both cache interceptors.
pub struct SessionRegistry {
    live: Mutex<Option<LiveSession>>,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            live: Mutex::new(None),
            clock,
        }
    }

    /// Run `f` against the store bound to `session_id`, swapping stores if
    /// the identifier changed since the last access.
    pub fn with_store<R>(&self, session_id: &str, f: impl FnOnce(&mut CacheStore) -> R) -> R {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(old) = live.as_ref()
            && old.session_id != session_id
        {
            log::debug!(
                "Cache session changed, discarding store with {} entries",
                old.store.len()
            );
            *live = None;
        }

        let session = live.get_or_insert_with(|| LiveSession {
            session_id: session_id.to_string(),
            store: CacheStore::new(self.clock.clone()),
        });
        f(&mut session.store)
    }

    /// Identifier of the live session, if any
    pub fn current_session(&self) -> Option<String> {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.session_id.clone())
    }

    /// Drop the live store
    pub fn clear(&self) {
        *self.live.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
