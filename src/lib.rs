//! hawkcache - session-scoped TTL response cache for HTTP clients
//!
//! The cache plugs into an [`client::HttpPipeline`] as a pair of interceptors
//! sharing one [`cache::SessionRegistry`]:
//!
//! ```ignore
//! let registry = Arc::new(SessionRegistry::new());
//! let global = PartialPolicy::new().use_cache(UseCache::Always).time_to_live_ms(5000);
//! let (req, res) = cache_interceptors(registry, Arc::new(|| session_id()), &global)?;
//!
//! let pipeline = HttpPipeline::new(HttpTransport::new("https://api.example.com")?);
//! pipeline.add_request_interceptor(req);
//! pipeline.add_response_interceptor(res);
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;

pub use cache::{
    CachePolicy, PartialPolicy, SessionRegistry, UseCache, cache_interceptors,
    make_request_interceptor, make_response_interceptor,
};
pub use client::{Call, ErrorInterceptor, HttpPipeline, HttpTransport, Response, Transport};
pub use error::{Error, Result};
