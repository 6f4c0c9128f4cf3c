//! Cache key derivation and key matching

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::client::Call;

/// Query parameters in the order they were supplied
pub type QueryParams = Vec<(String, String)>;

/// Serializes query parameters into a query string (without the leading `?`)
pub type SerializeFn = fn(&[(String, String)]) -> String;

/// Form-urlencode query parameters, preserving their order.
///
/// Returns an empty string when there are no parameters.
pub fn serialize_params(params: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in params {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

/// Default request identification: `url?params`, or just `url` without params.
pub fn default_request_id(call: &Call, serialize: SerializeFn) -> String {
    let serialized = serialize(&call.params);
    if serialized.is_empty() {
        call.url.clone()
    } else {
        format!("{}?{}", call.url, serialized)
    }
}

/// Derives the cache key for a call.
#[derive(Clone)]
pub struct KeyFn(Arc<dyn Fn(&Call, SerializeFn) -> String + Send + Sync>);

impl KeyFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Call, SerializeFn) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn key(&self, call: &Call, serialize: SerializeFn) -> String {
        (self.0)(call, serialize)
    }
}

impl Default for KeyFn {
    fn default() -> Self {
        Self::new(default_request_id)
    }
}

impl fmt::Debug for KeyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyFn(..)")
    }
}

/// Decides whether a cache key should be invalidated.
#[derive(Clone)]
pub struct Matcher {
    source: String,
    test: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl Matcher {
    /// Wrap an arbitrary predicate; `description` shows up in logs
    pub fn new<F>(description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            source: description.into(),
            test: Arc::new(f),
        }
    }

    /// Compile a regular expression (`(?i)` for case-insensitive matching)
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Regex::new(pattern)?.into())
    }

    pub fn is_match(&self, key: &str) -> bool {
        (self.test)(key)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl From<Regex> for Matcher {
    fn from(re: Regex) -> Self {
        let source = re.as_str().to_string();
        Self {
            source,
            test: Arc::new(move |key: &str| re.is_match(key)),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Matcher").field(&self.source).finish()
    }
}
