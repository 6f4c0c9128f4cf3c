//! Error types for hawkcache

use std::time::Duration;
use thiserror::Error;

/// Result type alias for hawkcache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the library
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Interceptor(#[from] InterceptorError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Cache policy validation errors.
///
/// Each variant names the offending field and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Property `useCache` should be `always` or `never`, got {0}")]
    InvalidUseCache(String),

    #[error("Functionality to use cache on anything except \"get\" is not yet supported (got {0:?})")]
    UnsupportedMethod(Vec<String>),

    #[error("Property `timeToLive` must be a non-negative integer number of milliseconds, got {0}")]
    InvalidTimeToLive(String),

    #[error("Property `invalidateUrls` can be applied only to config per action (get, post etc)")]
    InvalidateUrlsScope,

    #[error("Property `invalidateUrls` must be a list of strings or falsy, got {0}")]
    InvalidateUrlsType(String),

    #[error("Property `invalidateUrlsRegex` can be applied only to config per action (get, post etc)")]
    InvalidateUrlsRegexScope,

    #[error("Property `invalidateUrlsRegex` must be a valid regular expression or falsy: {0}")]
    InvalidateUrlsRegexType(String),

    #[error("Property `requestIdentificationFn` must be of type `function` or `falsy`, got {0}")]
    InvalidIdentificationFn(String),

    #[error("Cache options must be an object, got {0}")]
    NotAnObject(String),
}

/// Runtime failures raised by the cache interceptors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterceptorError {
    #[error("getCacheIdentifier returns falsy: no session identifier to bind the cache to")]
    MissingSessionIdentifier,
}

/// Transport errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed for {0}")]
    Unauthorized(String),

    #[error("Access denied for {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
