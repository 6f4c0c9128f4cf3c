//! Cache interceptors for the HTTP pipeline
//!
//! The request interceptor serves cached responses for cacheable calls and
//! invalidates entries when a mutating call goes out. The response
//! interceptor stores fresh responses. Both resolve the effective policy the
//! same way: per-call options merged over the validated global policy, with
//! a fallback to the global policy if the merge does not validate.

use std::borrow::Cow;
use std::sync::Arc;

use crate::cache::key::{SerializeFn, serialize_params};
use crate::cache::policy::{CachePolicy, PartialPolicy, UseCache};
use crate::cache::registry::SessionRegistry;
use crate::client::{Call, Dispatch, RequestInterceptor, Response, ResponseInterceptor};
use crate::error::{InterceptorError, PolicyError, Result};

/// Supplies the identifier of the session the cache is bound to.
///
/// An empty string means there is no session.
pub type SessionIdProvider = Arc<dyn Fn() -> String + Send + Sync>;

/// Effective policy for `call`: its own options over `global`, or `global`
/// alone if there are none or they do not validate.
fn effective_policy<'a>(global: &'a CachePolicy, call: &Call) -> Cow<'a, CachePolicy> {
    match &call.cache_options {
        None => Cow::Borrowed(global),
        Some(options) => match global.overlay(options) {
            Ok(policy) => Cow::Owned(policy),
            Err(e) => {
                log::warn!("Ignoring cache options for {} {}: {}", call.method, call.url, e);
                Cow::Borrowed(global)
            }
        },
    }
}

/// Serves cached responses and invalidates on mutating calls
pub struct CacheRequestInterceptor {
    registry: Arc<SessionRegistry>,
    session_id: SessionIdProvider,
    global: CachePolicy,
    serialize: SerializeFn,
}

impl CacheRequestInterceptor {
    pub fn new(
        registry: Arc<SessionRegistry>,
        session_id: SessionIdProvider,
        global: &PartialPolicy,
    ) -> std::result::Result<Self, PolicyError> {
        Ok(Self {
            registry,
            session_id,
            global: CachePolicy::global(global)?,
            serialize: serialize_params,
        })
    }

    /// Use a different query serializer when deriving cache keys
    pub fn with_serializer(mut self, serialize: SerializeFn) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn global_policy(&self) -> &CachePolicy {
        &self.global
    }
}

impl RequestInterceptor for CacheRequestInterceptor {
    fn intercept_request(&self, call: Call) -> Result<Dispatch> {
        let policy = effective_policy(&self.global, &call);

        if policy.use_cache() == UseCache::Never {
            return Ok(Dispatch::Proceed(call));
        }

        let cache_id = policy.request_identification_fn().key(&call, self.serialize);
        let session_id = (self.session_id)();

        if !policy.is_cacheable(&call.method_name()) {
            let removed = self.registry.with_store(&session_id, |store| {
                let mut removed = store.delete_containing(&cache_id);
                for url in policy.invalidate_urls() {
                    removed += store.delete_containing(url);
                }
                if let Some(matcher) = policy.invalidate_urls_regex() {
                    removed += store.delete_matching(matcher);
                }
                removed
            });
            log::debug!("Cache invalidated by {} {}: {} entries", call.method, cache_id, removed);
            return Ok(Dispatch::Proceed(call));
        }

        let hit = self.registry.with_store(&session_id, |store| {
            store.get(&cache_id, Some(policy.time_to_live()))
        });

        match hit {
            Some(data) => {
                log::debug!("Cache hit: {}", cache_id);
                Ok(Dispatch::Resolved(Response::from_cache(call, data)))
            }
            None => {
                log::debug!("Cache miss: {}", cache_id);
                Ok(Dispatch::Proceed(call))
            }
        }
    }
}

/// Stores responses of cacheable calls
pub struct CacheResponseInterceptor {
    registry: Arc<SessionRegistry>,
    session_id: SessionIdProvider,
    global: CachePolicy,
    serialize: SerializeFn,
}

impl CacheResponseInterceptor {
    pub fn new(
        registry: Arc<SessionRegistry>,
        session_id: SessionIdProvider,
        global: &PartialPolicy,
    ) -> std::result::Result<Self, PolicyError> {
        Ok(Self {
            registry,
            session_id,
            global: CachePolicy::global(global)?,
            serialize: serialize_params,
        })
    }

    /// Use a different query serializer when deriving cache keys
    pub fn with_serializer(mut self, serialize: SerializeFn) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn global_policy(&self) -> &CachePolicy {
        &self.global
    }
}

impl ResponseInterceptor for CacheResponseInterceptor {
    fn intercept_response(&self, response: Response) -> Result<Response> {
        let policy = effective_policy(&self.global, &response.config);

        let session_id = (self.session_id)();
        if session_id.is_empty() {
            return Err(InterceptorError::MissingSessionIdentifier.into());
        }

        if response.from_cache || !policy.is_cache_active() {
            return Ok(response);
        }

        if policy.is_cacheable(&response.config.method_name()) {
            let cache_id = policy
                .request_identification_fn()
                .key(&response.config, self.serialize);
            log::debug!("Cache store: {}", cache_id);
            self.registry
                .with_store(&session_id, |store| store.set(&cache_id, response.data.clone()));
        }

        Ok(response)
    }
}

/// Build the request interceptor. Fails if `global` is not a valid global policy.
pub fn make_request_interceptor(
    registry: Arc<SessionRegistry>,
    session_id: SessionIdProvider,
    global: &PartialPolicy,
) -> std::result::Result<CacheRequestInterceptor, PolicyError> {
    CacheRequestInterceptor::new(registry, session_id, global)
}

/// Build the response interceptor. Fails if `global` is not a valid global policy.
pub fn make_response_interceptor(
    registry: Arc<SessionRegistry>,
    session_id: SessionIdProvider,
    global: &PartialPolicy,
) -> std::result::Result<CacheResponseInterceptor, PolicyError> {
    CacheResponseInterceptor::new(registry, session_id, global)
}

/// Build both interceptors over one registry and global policy
pub fn cache_interceptors(
    registry: Arc<SessionRegistry>,
    session_id: SessionIdProvider,
    global: &PartialPolicy,
) -> std::result::Result<(CacheRequestInterceptor, CacheResponseInterceptor), PolicyError> {
    Ok((
        make_request_interceptor(registry.clone(), session_id.clone(), global)?,
        make_response_interceptor(registry, session_id, global)?,
    ))
}
