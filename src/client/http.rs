//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;

use super::{Call, Response, Transport};
use crate::error::{ApiError, Result};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends calls over HTTP relative to a base URL
pub struct HttpTransport {
    http: HttpClient,
    base_url: String,
    json_prefix: Option<String>,
}

impl HttpTransport {
    /// Create a transport for `base_url` with the default 30s timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            json_prefix: None,
        })
    }

    /// Strip `prefix` from response bodies before parsing them as JSON.
    ///
    /// Some servers guard JSON responses with a prefix such as `)]}',`.
    pub fn with_json_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.json_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a call URL; absolute call URLs are used as-is
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }

    /// Parse a response body, falling back to the raw text as a JSON string
    fn parse_body(&self, text: &str) -> Value {
        let body = match &self.json_prefix {
            Some(prefix) => text.strip_prefix(prefix.as_str()).unwrap_or(text),
            None => text,
        };
        if body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, call: &Call) -> Result<Response> {
        let url = self.resolve(&call.url);
        log::debug!("{} {}", call.method, url);

        let mut request = self
            .http
            .request(call.method.clone(), &url)
            .headers(call.headers.clone());
        if !call.params.is_empty() {
            request = request.query(&call.params);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ApiError::from)?;

        let status = response.status();
        match status {
            status if status.is_success() => {
                let headers = response.headers().clone();
                let text = response.text().await.map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to read response: {}", e))
                })?;
                let mut out = Response::new(call.clone(), status, self.parse_body(&text));
                out.headers = headers;
                Ok(out)
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized(url).into()),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden(url).into()),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(url).into()),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(ApiError::RateLimit(Duration::from_secs(retry_after)).into())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest(error_msg).into())
            }
            status if status.is_server_error() => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Server error: {}", status));
                Err(ApiError::ServerError(error_msg).into())
            }
            _ => {
                let error_msg = format!("Unexpected status code: {}", status);
                Err(ApiError::InvalidResponse(error_msg).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use mockito::Matcher;
    use reqwest::Method;
    use serde_json::json;

    #[test]
    fn test_resolve() {
        let transport = HttpTransport::new("http://localhost:8080/api/").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080/api");
        assert_eq!(transport.resolve("/posts"), "http://localhost:8080/api/posts");
        assert_eq!(transport.resolve("posts"), "http://localhost:8080/api/posts");
        assert_eq!(transport.resolve("https://other.test/x"), "https://other.test/x");
    }

    #[test]
    fn test_parse_body() {
        let transport = HttpTransport::new("http://localhost").unwrap();
        assert_eq!(transport.parse_body(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(transport.parse_body("plain"), json!("plain"));
        assert_eq!(transport.parse_body(""), Value::Null);

        let transport = transport.with_json_prefix(")]}',\n");
        assert_eq!(transport.parse_body(")]}',\n[1,2]"), json!([1, 2]));
        assert_eq!(transport.parse_body("[3]"), json!([3]));
        assert_eq!(transport.parse_body(")]}',\nnot json"), json!("not json"));
    }

    #[tokio::test]
    async fn test_send_get_with_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/posts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "rust lang".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .match_header("x-id", "7")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":1}]"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(server.url()).unwrap();
        let call = Call::get("/posts")
            .param("q", "rust lang")
            .param("page", "2")
            .header("x-id", "7");
        let response = transport.send(&call).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.data, json!([{"id": 1}]));
        assert!(!response.from_cache);
        assert_eq!(response.config.url, "/posts");
    }

    #[tokio::test]
    async fn test_send_post_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/posts")
            .match_body(Matcher::Json(json!({"title": "hi"})))
            .with_status(201)
            .with_body(r#"{"id":5}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(server.url()).unwrap();
        let call = Call::new(Method::POST, "/posts").body(json!({"title": "hi"}));
        let response = transport.send(&call).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.data, json!({"id": 5}));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server.mock("GET", "/missing").with_status(404).create_async().await;
        let _limited = server
            .mock("GET", "/limited")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/broken")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let transport = HttpTransport::new(server.url()).unwrap();

        let err = transport.send(&Call::get("/missing")).await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::NotFound(_))));

        let err = transport.send(&Call::get("/limited")).await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::RateLimit(d)) if d == Duration::from_secs(7)));

        let err = transport.send(&Call::get("/broken")).await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::ServerError(ref m)) if m == "boom"));
    }
}
