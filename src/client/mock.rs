//! Mock transport for testing
//!
//! Serves canned responses keyed by URL and records every call it sees,
//! so tests can assert how often the network was actually used.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use super::{Call, Response, Transport};
use crate::error::{ApiError, Result};

/// In-memory transport.
///
/// # Example
/// ```ignore
/// let mock = MockTransport::new().with_response("/posts", json!([]));
/// let response = mock.send(&Call::get("/posts")).await?;
/// assert_eq!(mock.call_count(), 1);
/// ```
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Value>>,
    captured: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` for calls to `url`, whatever the method or params
    pub fn with_response(self, url: &str, data: Value) -> Self {
        self.set_response(url, data);
        self
    }

    /// Change the data served for `url`
    pub fn set_response(&self, url: &str, data: Value) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), data);
    }

    /// Total calls sent
    pub fn call_count(&self) -> usize {
        self.captured.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Calls sent to `url`
    pub fn calls_to(&self, url: &str) -> usize {
        self.captured
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.url == url)
            .count()
    }

    pub fn captured(&self) -> Vec<Call> {
        self.captured.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, call: &Call) -> Result<Response> {
        self.captured
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call.clone());

        let data = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&call.url)
            .cloned();

        match data {
            Some(data) => Ok(Response::new(call.clone(), StatusCode::OK, data)),
            None => Err(ApiError::NotFound(call.url.clone()).into()),
        }
    }
}
