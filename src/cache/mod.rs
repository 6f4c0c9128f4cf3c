//! Session-scoped response cache
//!
//! Responses to cacheable calls are kept in memory for the current session
//! only, each with its own time-to-live, and the whole store is wiped once its
//! one-hour lifetime runs out. Mutating calls invalidate matching entries.

pub mod clock;
pub mod entry;
pub mod interceptor;
pub mod key;
pub mod policy;
pub mod registry;
pub mod store;

use std::time::Duration;

/// How long a store keeps entries before wiping them all
pub const STORE_LIFETIME: Duration = Duration::from_secs(60 * 60); // 1 hr

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use interceptor::{
    CacheRequestInterceptor, CacheResponseInterceptor, SessionIdProvider, cache_interceptors,
    make_request_interceptor, make_response_interceptor,
};
pub use key::{KeyFn, Matcher, QueryParams, SerializeFn, default_request_id, serialize_params};
pub use policy::{CachePolicy, PartialPolicy, PolicySummary, UseCache, validate_policy};
pub use registry::SessionRegistry;
pub use store::CacheStore;
