//! HTTP call/response descriptors and the interceptor pipeline that carries them

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::cache::PartialPolicy;
use crate::error::{Error, Result};

pub mod http;
pub mod interceptors;
#[cfg(test)]
pub mod mock;
pub mod pipeline;

pub use http::HttpTransport;
pub use interceptors::AcceptLanguageInterceptor;
#[cfg(test)]
pub use mock::MockTransport;
pub use pipeline::HttpPipeline;

/// Outbound call descriptor
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,

    /// Path or absolute URL, as given by the caller
    pub url: String,

    /// Query parameters, in order
    pub params: Vec<(String, String)>,

    pub headers: HeaderMap,

    /// JSON request body
    pub body: Option<Value>,

    /// Per-call cache options merged over the global policy
    pub cache_options: Option<PartialPolicy>,
}

impl Call {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            cache_options: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add a header; invalid names or values are dropped with a warning
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => log::warn!("Ignoring invalid header {:?}", name),
        }
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn cache_options(mut self, options: PartialPolicy) -> Self {
        self.cache_options = Some(options);
        self
    }

    /// Lowercase method name, as compared against cache policy methods
    pub fn method_name(&self) -> String {
        self.method.as_str().to_ascii_lowercase()
    }
}

/// Completed call
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub data: Value,

    /// The call that produced this response
    pub config: Call,

    /// Set when the response was synthesized from the cache
    pub from_cache: bool,
}

impl Response {
    pub fn new(config: Call, status: StatusCode, data: Value) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: HeaderMap::new(),
            data,
            config,
            from_cache: false,
        }
    }

    /// Build a response served from the cache for `call`
    pub fn from_cache(call: Call, data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            status_text: "OK".to_string(),
            headers: call.headers.clone(),
            data,
            config: call,
            from_cache: true,
        }
    }
}

/// Outcome of the request stage
#[derive(Debug)]
pub enum Dispatch {
    /// Continue to the transport with this call
    Proceed(Call),
    /// Skip the transport; this response is final
    Resolved(Response),
}

/// Runs before a call reaches the transport
pub trait RequestInterceptor: Send + Sync {
    fn intercept_request(&self, call: Call) -> Result<Dispatch>;
}

/// Runs on each response after the transport (or a short-circuit) produced it
pub trait ResponseInterceptor: Send + Sync {
    fn intercept_response(&self, response: Response) -> Result<Response>;
}

impl<F> RequestInterceptor for F
where
    F: Fn(Call) -> Result<Dispatch> + Send + Sync,
{
    fn intercept_request(&self, call: Call) -> Result<Dispatch> {
        self(call)
    }
}

impl<F> ResponseInterceptor for F
where
    F: Fn(Response) -> Result<Response> + Send + Sync,
{
    fn intercept_response(&self, response: Response) -> Result<Response> {
        self(response)
    }
}

/// Observes a call that failed.
///
/// Error interceptors see the error before it is returned to the caller;
/// they cannot recover from it.
pub trait ErrorInterceptor: Send + Sync {
    fn intercept_error(&self, error: &Error);
}

impl<F> ErrorInterceptor for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn intercept_error(&self, error: &Error) {
        self(error)
    }
}

/// Issues calls over the network
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, call: &Call) -> Result<Response>;
}
