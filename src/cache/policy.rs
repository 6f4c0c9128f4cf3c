//! Cache policy validation and merging
//!
//! A [`PartialPolicy`] is what callers write: every field optional, either
//! built in code or parsed from a dynamic option bag (config files, per-call
//! options). [`validate_policy`] turns it into an immutable [`CachePolicy`]
//! with defaults filled in. Per-call options are merged over the validated
//! global policy with [`CachePolicy::overlay`], which re-runs validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::key::{KeyFn, Matcher};
use crate::error::PolicyError;

/// The only method whose responses may be cached
pub const CACHEABLE_METHOD: &str = "get";

/// Whether cached responses may be served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCache {
    Always,
    #[default]
    Never,
}

impl FromStr for UseCache {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(UseCache::Always),
            "never" => Ok(UseCache::Never),
            other => Err(PolicyError::InvalidUseCache(format!("{:?}", other))),
        }
    }
}

impl fmt::Display for UseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UseCache::Always => write!(f, "always"),
            UseCache::Never => write!(f, "never"),
        }
    }
}

/// Unvalidated cache options
#[derive(Debug, Clone, Default)]
pub struct PartialPolicy {
    pub use_cache: Option<UseCache>,
    pub methods: Option<Vec<String>>,
    /// Milliseconds
    pub time_to_live: Option<i64>,
    pub invalidate_urls: Option<Vec<String>>,
    pub invalidate_urls_regex: Option<Matcher>,
    pub request_identification_fn: Option<KeyFn>,
    errors: FieldErrors,
}

/// Per-field type errors from a dynamic bag.
///
/// Held back until [`validate_policy`] so they surface in rule order.
#[derive(Debug, Clone, Default)]
struct FieldErrors {
    use_cache: Option<PolicyError>,
    methods: Option<PolicyError>,
    time_to_live: Option<PolicyError>,
    invalidate_urls: Option<PolicyError>,
    invalidate_urls_regex: Option<PolicyError>,
    request_identification_fn: Option<PolicyError>,
}

impl PartialPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_cache(mut self, use_cache: UseCache) -> Self {
        self.use_cache = Some(use_cache);
        self.errors.use_cache = None;
        self
    }

    pub fn methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = Some(methods.into_iter().map(Into::into).collect());
        self.errors.methods = None;
        self
    }

    pub fn time_to_live(self, ttl: Duration) -> Self {
        self.time_to_live_ms(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
    }

    pub fn time_to_live_ms(mut self, ms: i64) -> Self {
        self.time_to_live = Some(ms);
        self.errors.time_to_live = None;
        self
    }

    pub fn invalidate_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invalidate_urls = Some(urls.into_iter().map(Into::into).collect());
        self.errors.invalidate_urls = None;
        self
    }

    pub fn invalidate_urls_regex(mut self, matcher: impl Into<Matcher>) -> Self {
        self.invalidate_urls_regex = Some(matcher.into());
        self.errors.invalidate_urls_regex = None;
        self
    }

    pub fn request_identification_fn(mut self, key_fn: KeyFn) -> Self {
        self.request_identification_fn = Some(key_fn);
        self.errors.request_identification_fn = None;
        self
    }

    /// Parse a dynamic option bag.
    ///
    /// Keys are camelCase (`useCache`, `timeToLive`, ...) with snake_case
    /// accepted too. `null` counts as absent everywhere; `false`, `0` and `""`
    /// count as absent for the optional invalidation and key fields.
    ///
    /// Only a non-object bag fails here. Badly typed fields are recorded and
    /// reported by [`validate_policy`], in the same order as every other rule.
    pub fn from_value(value: &Value) -> Result<Self, PolicyError> {
        let obj = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(obj) => obj,
            other => return Err(PolicyError::NotAnObject(other.to_string())),
        };
        let field = |camel: &str, snake: &str| {
            obj.get(camel)
                .or_else(|| obj.get(snake))
                .filter(|v| !v.is_null())
        };
        let mut partial = Self::default();

        match field("useCache", "use_cache") {
            None => {}
            Some(Value::String(s)) => match s.parse() {
                Ok(use_cache) => partial.use_cache = Some(use_cache),
                Err(e) => partial.errors.use_cache = Some(e),
            },
            Some(other) => {
                partial.errors.use_cache = Some(PolicyError::InvalidUseCache(other.to_string()))
            }
        }

        match field("methods", "methods") {
            None => {}
            Some(Value::Array(items)) => {
                partial.methods = Some(
                    items
                        .iter()
                        .map(|m| match m {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect(),
                )
            }
            Some(other) => {
                partial.errors.methods = Some(PolicyError::UnsupportedMethod(vec![other.to_string()]))
            }
        }

        if let Some(v) = field("timeToLive", "time_to_live") {
            match parse_millis(v) {
                Ok(ms) => partial.time_to_live = Some(ms),
                Err(e) => partial.errors.time_to_live = Some(e),
            }
        }

        if let Some(v) = field("invalidateUrls", "invalidate_urls")
            && is_truthy(v)
        {
            let urls = match v {
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>(),
                _ => None,
            };
            match urls {
                Some(urls) => partial.invalidate_urls = Some(urls),
                None => {
                    partial.errors.invalidate_urls =
                        Some(PolicyError::InvalidateUrlsType(v.to_string()))
                }
            }
        }

        if let Some(v) = field("invalidateUrlsRegex", "invalidate_urls_regex")
            && is_truthy(v)
        {
            let matcher = match v {
                Value::String(pattern) => Matcher::regex(pattern)
                    .map_err(|e| PolicyError::InvalidateUrlsRegexType(e.to_string())),
                other => Err(PolicyError::InvalidateUrlsRegexType(other.to_string())),
            };
            match matcher {
                Ok(matcher) => partial.invalidate_urls_regex = Some(matcher),
                Err(e) => partial.errors.invalidate_urls_regex = Some(e),
            }
        }

        // Data is never callable; any truthy value here is a type error
        if let Some(v) = field("requestIdentificationFn", "request_identification_fn")
            && is_truthy(v)
        {
            partial.errors.request_identification_fn =
                Some(PolicyError::InvalidIdentificationFn(v.to_string()));
        }

        Ok(partial)
    }

    /// Shallow overlay: fields set on `top`, or rejected while parsing `top`,
    /// replace those on `self`
    pub fn merged_with(mut self, top: &PartialPolicy) -> Self {
        if top.use_cache.is_some() || top.errors.use_cache.is_some() {
            self.use_cache = top.use_cache;
            self.errors.use_cache = top.errors.use_cache.clone();
        }
        if top.methods.is_some() || top.errors.methods.is_some() {
            self.methods = top.methods.clone();
            self.errors.methods = top.errors.methods.clone();
        }
        if top.time_to_live.is_some() || top.errors.time_to_live.is_some() {
            self.time_to_live = top.time_to_live;
            self.errors.time_to_live = top.errors.time_to_live.clone();
        }
        if top.invalidate_urls.is_some() || top.errors.invalidate_urls.is_some() {
            self.invalidate_urls = top.invalidate_urls.clone();
            self.errors.invalidate_urls = top.errors.invalidate_urls.clone();
        }
        if top.invalidate_urls_regex.is_some() || top.errors.invalidate_urls_regex.is_some() {
            self.invalidate_urls_regex = top.invalidate_urls_regex.clone();
            self.errors.invalidate_urls_regex = top.errors.invalidate_urls_regex.clone();
        }
        if top.request_identification_fn.is_some() || top.errors.request_identification_fn.is_some()
        {
            self.request_identification_fn = top.request_identification_fn.clone();
            self.errors.request_identification_fn = top.errors.request_identification_fn.clone();
        }
        self
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Integer milliseconds from a number or a string with a leading base-10 integer
fn parse_millis(value: &Value) -> Result<i64, PolicyError> {
    let invalid = || PolicyError::InvalidTimeToLive(value.to_string());
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end]
                .parse::<i64>()
                .map(|n| sign * n)
                .map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

/// Validated, immutable cache policy
#[derive(Debug, Clone)]
pub struct CachePolicy {
    use_cache: UseCache,
    methods: Vec<String>,
    time_to_live: Duration,
    invalidate_urls: Option<Vec<String>>,
    invalidate_urls_regex: Option<Matcher>,
    request_identification_fn: KeyFn,
}

/// Validate `partial` and fill in defaults.
///
/// Rules run in a fixed order and the first failure is returned: `useCache`,
/// `methods`, `timeToLive`, `invalidateUrls`, `invalidateUrlsRegex`,
/// `requestIdentificationFn`. Invalidation fields are only accepted on
/// per-call policies; that scope rule is checked before their type.
pub fn validate_policy(partial: &PartialPolicy, is_global: bool) -> Result<CachePolicy, PolicyError> {
    let errors = &partial.errors;

    if let Some(e) = &errors.use_cache {
        return Err(e.clone());
    }
    let use_cache = partial.use_cache.unwrap_or_default();

    if let Some(e) = &errors.methods {
        return Err(e.clone());
    }
    let methods = match &partial.methods {
        None => vec![CACHEABLE_METHOD.to_string()],
        Some(m) if m.len() == 1 && m[0].eq_ignore_ascii_case(CACHEABLE_METHOD) => {
            vec![CACHEABLE_METHOD.to_string()]
        }
        Some(m) => return Err(PolicyError::UnsupportedMethod(m.clone())),
    };

    if let Some(e) = &errors.time_to_live {
        return Err(e.clone());
    }
    let time_to_live = match partial.time_to_live {
        None => Duration::ZERO,
        Some(ms) if ms >= 0 => Duration::from_millis(ms as u64),
        Some(ms) => return Err(PolicyError::InvalidTimeToLive(ms.to_string())),
    };

    if partial.invalidate_urls.is_some() || errors.invalidate_urls.is_some() {
        if is_global {
            return Err(PolicyError::InvalidateUrlsScope);
        }
        if let Some(e) = &errors.invalidate_urls {
            return Err(e.clone());
        }
    }

    if partial.invalidate_urls_regex.is_some() || errors.invalidate_urls_regex.is_some() {
        if is_global {
            return Err(PolicyError::InvalidateUrlsRegexScope);
        }
        if let Some(e) = &errors.invalidate_urls_regex {
            return Err(e.clone());
        }
    }

    if let Some(e) = &errors.request_identification_fn {
        return Err(e.clone());
    }

    Ok(CachePolicy {
        use_cache,
        methods,
        time_to_live,
        invalidate_urls: partial.invalidate_urls.clone(),
        invalidate_urls_regex: partial.invalidate_urls_regex.clone(),
        request_identification_fn: partial.request_identification_fn.clone().unwrap_or_default(),
    })
}

impl CachePolicy {
    /// Validate a global policy (no invalidation fields allowed)
    pub fn global(partial: &PartialPolicy) -> Result<Self, PolicyError> {
        validate_policy(partial, true)
    }

    /// Merge per-call options over this policy and validate the result.
    ///
    /// On error `self` is untouched; callers fall back to it as-is.
    pub fn overlay(&self, per_call: &PartialPolicy) -> Result<Self, PolicyError> {
        let merged = self.to_partial().merged_with(per_call);
        validate_policy(&merged, false)
    }

    pub fn to_partial(&self) -> PartialPolicy {
        PartialPolicy {
            use_cache: Some(self.use_cache),
            methods: Some(self.methods.clone()),
            time_to_live: Some(i64::try_from(self.time_to_live.as_millis()).unwrap_or(i64::MAX)),
            invalidate_urls: self.invalidate_urls.clone(),
            invalidate_urls_regex: self.invalidate_urls_regex.clone(),
            request_identification_fn: Some(self.request_identification_fn.clone()),
            errors: FieldErrors::default(),
        }
    }

    pub fn use_cache(&self) -> UseCache {
        self.use_cache
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// Whether `method` is cacheable (case-insensitive)
    pub fn is_cacheable(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Responses are only stored when the TTL is positive
    pub fn is_cache_active(&self) -> bool {
        !self.time_to_live.is_zero()
    }

    pub fn invalidate_urls(&self) -> &[String] {
        self.invalidate_urls.as_deref().unwrap_or_default()
    }

    pub fn invalidate_urls_regex(&self) -> Option<&Matcher> {
        self.invalidate_urls_regex.as_ref()
    }

    pub fn request_identification_fn(&self) -> &KeyFn {
        &self.request_identification_fn
    }

    pub fn summary(&self) -> PolicySummary {
        PolicySummary {
            use_cache: self.use_cache,
            methods: self.methods.clone(),
            time_to_live_ms: self.time_to_live.as_millis() as u64,
            invalidate_urls: self.invalidate_urls.clone().unwrap_or_default(),
            invalidate_urls_regex: self.invalidate_urls_regex.as_ref().map(|m| m.as_str().to_string()),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        // The empty partial always validates
        Self {
            use_cache: UseCache::Never,
            methods: vec![CACHEABLE_METHOD.to_string()],
            time_to_live: Duration::ZERO,
            invalidate_urls: None,
            invalidate_urls_regex: None,
            request_identification_fn: KeyFn::default(),
        }
    }
}

/// Serializable view of a [`CachePolicy`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub use_cache: UseCache,
    pub methods: Vec<String>,
    pub time_to_live_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub invalidate_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub invalidate_urls_regex: Option<String>,
}
