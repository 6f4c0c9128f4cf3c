//! Interceptor pipeline around a transport
//!
//! Request interceptors run in registration order before the transport;
//! response interceptors run in registration order after it. A failure in the
//! request stage is reported to the request error interceptors, and a failure
//! in the transport or response stage to the response error interceptors,
//! before the error is returned. Each call works on a snapshot of all four
//! lists taken when it enters the pipeline.

use std::sync::{Arc, RwLock};

use reqwest::Method;
use serde_json::Value;

use super::{
    Call, Dispatch, ErrorInterceptor, RequestInterceptor, Response, ResponseInterceptor, Transport,
};
use crate::error::{Error, Result};

/// HTTP client with ordered request/response interceptors
pub struct HttpPipeline<T: Transport> {
    transport: T,
    request_interceptors: RwLock<Vec<Arc<dyn RequestInterceptor>>>,
    response_interceptors: RwLock<Vec<Arc<dyn ResponseInterceptor>>>,
    request_error_interceptors: RwLock<Vec<Arc<dyn ErrorInterceptor>>>,
    response_error_interceptors: RwLock<Vec<Arc<dyn ErrorInterceptor>>>,
}

fn snapshot<I: ?Sized>(list: &RwLock<Vec<Arc<I>>>) -> Vec<Arc<I>> {
    list.read().unwrap_or_else(|e| e.into_inner()).clone()
}

fn report(hooks: &[Arc<dyn ErrorInterceptor>], error: Error) -> Error {
    for hook in hooks {
        hook.intercept_error(&error);
    }
    error
}

impl<T: Transport> HttpPipeline<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            request_interceptors: RwLock::new(Vec::new()),
            response_interceptors: RwLock::new(Vec::new()),
            request_error_interceptors: RwLock::new(Vec::new()),
            response_error_interceptors: RwLock::new(Vec::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Append a request interceptor. Returns its index.
    pub fn add_request_interceptor(&self, interceptor: impl RequestInterceptor + 'static) -> usize {
        let mut list = self
            .request_interceptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        list.push(Arc::new(interceptor));
        list.len() - 1
    }

    /// Insert a request interceptor at `index`, clamped to the list length
    pub fn insert_request_interceptor(
        &self,
        index: usize,
        interceptor: impl RequestInterceptor + 'static,
    ) {
        let mut list = self
            .request_interceptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let index = index.min(list.len());
        list.insert(index, Arc::new(interceptor));
    }

    /// Remove the request interceptor at `index`. Returns false if there is none.
    pub fn remove_request_interceptor(&self, index: usize) -> bool {
        let mut list = self
            .request_interceptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if index < list.len() {
            list.remove(index);
            true
        } else {
            false
        }
    }

    /// Append a response interceptor. Returns its index.
    pub fn add_response_interceptor(
        &self,
        interceptor: impl ResponseInterceptor + 'static,
    ) -> usize {
        let mut list = self
            .response_interceptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        list.push(Arc::new(interceptor));
        list.len() - 1
    }

    /// Insert a response interceptor at `index`, clamped to the list length
    pub fn insert_response_interceptor(
        &self,
        index: usize,
        interceptor: impl ResponseInterceptor + 'static,
    ) {
        let mut list = self
            .response_interceptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let index = index.min(list.len());
        list.insert(index, Arc::new(interceptor));
    }

    /// Remove the response interceptor at `index`. Returns false if there is none.
    pub fn remove_response_interceptor(&self, index: usize) -> bool {
        let mut list = self
            .response_interceptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if index < list.len() {
            list.remove(index);
            true
        } else {
            false
        }
    }

    /// Append a hook that sees request-stage errors. Returns its index.
    pub fn add_request_error_interceptor(
        &self,
        interceptor: impl ErrorInterceptor + 'static,
    ) -> usize {
        let mut list = self
            .request_error_interceptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        list.push(Arc::new(interceptor));
        list.len() - 1
    }

    /// Append a hook that sees transport and response-stage errors. Returns its index.
    pub fn add_response_error_interceptor(
        &self,
        interceptor: impl ErrorInterceptor + 'static,
    ) -> usize {
        let mut list = self
            .response_error_interceptors
            .write()
            .unwrap_or_else(|e| e.into_inner());
        list.push(Arc::new(interceptor));
        list.len() - 1
    }

    /// Run `call` through the interceptors and the transport
    pub async fn request(&self, call: Call) -> Result<Response> {
        let request_interceptors = snapshot(&self.request_interceptors);
        let response_interceptors = snapshot(&self.response_interceptors);
        let request_error_interceptors = snapshot(&self.request_error_interceptors);
        let response_error_interceptors = snapshot(&self.response_error_interceptors);

        let mut dispatch = Dispatch::Proceed(call);
        for interceptor in &request_interceptors {
            match dispatch {
                Dispatch::Proceed(call) => {
                    dispatch = interceptor
                        .intercept_request(call)
                        .map_err(|e| report(&request_error_interceptors, e))?
                }
                Dispatch::Resolved(_) => break,
            }
        }

        let mut response = match dispatch {
            Dispatch::Resolved(response) => response,
            Dispatch::Proceed(call) => self
                .transport
                .send(&call)
                .await
                .map_err(|e| report(&response_error_interceptors, e))?,
        };

        for interceptor in &response_interceptors {
            response = interceptor
                .intercept_response(response)
                .map_err(|e| report(&response_error_interceptors, e))?;
        }
        Ok(response)
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request(Call::get(url)).await
    }

    pub async fn delete(&self, url: &str) -> Result<Response> {
        self.request(Call::new(Method::DELETE, url)).await
    }

    pub async fn head(&self, url: &str) -> Result<Response> {
        self.request(Call::new(Method::HEAD, url)).await
    }

    pub async fn post(&self, url: &str, body: Value) -> Result<Response> {
        self.request(Call::new(Method::POST, url).body(body)).await
    }

    pub async fn put(&self, url: &str, body: Value) -> Result<Response> {
        self.request(Call::new(Method::PUT, url).body(body)).await
    }

    pub async fn patch(&self, url: &str, body: Value) -> Result<Response> {
        self.request(Call::new(Method::PATCH, url).body(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, PartialPolicy, SessionRegistry, UseCache, cache_interceptors};
    use crate::client::MockTransport;
    use crate::error::{ApiError, Error, InterceptorError};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> impl RequestInterceptor + 'static {
        let log = log.clone();
        move |call: Call| -> Result<Dispatch> {
            log.lock().unwrap().push(name.to_string());
            Ok(Dispatch::Proceed(call))
        }
    }

    fn cached_pipeline(
        clock: Arc<ManualClock>,
        ttl_ms: i64,
    ) -> HttpPipeline<MockTransport> {
        let registry = Arc::new(SessionRegistry::with_clock(clock));
        let global = PartialPolicy::new()
            .use_cache(UseCache::Always)
            .time_to_live_ms(ttl_ms);
        let (req, res) = cache_interceptors(registry, Arc::new(|| "1".to_string()), &global).unwrap();

        let transport = MockTransport::new()
            .with_response("/test", json!({"some": "data"}))
            .with_response("/posts", json!([]))
            .with_response("/posts/1", json!({"id": 1}));
        let pipeline = HttpPipeline::new(transport);
        pipeline.add_request_interceptor(req);
        pipeline.add_response_interceptor(res);
        pipeline
    }

    #[tokio::test]
    async fn test_request_interceptors_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = HttpPipeline::new(MockTransport::new().with_response("/a", json!(1)));

        pipeline.add_request_interceptor(recorder(&log, "first"));
        pipeline.add_request_interceptor(recorder(&log, "third"));
        pipeline.insert_request_interceptor(1, recorder(&log, "second"));

        pipeline.get("/a").await.unwrap();
        assert_eq!(*log.lock().unwrap(), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_remove_interceptor() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = HttpPipeline::new(MockTransport::new().with_response("/a", json!(1)));

        pipeline.add_request_interceptor(recorder(&log, "first"));
        let idx = pipeline.add_request_interceptor(recorder(&log, "second"));
        assert!(pipeline.remove_request_interceptor(idx));
        assert!(!pipeline.remove_request_interceptor(5));

        pipeline.get("/a").await.unwrap();
        assert_eq!(*log.lock().unwrap(), ["first"]);
    }

    #[tokio::test]
    async fn test_response_interceptors_chain() {
        let pipeline = HttpPipeline::new(MockTransport::new().with_response("/a", json!(1)));
        pipeline.add_response_interceptor(|mut r: Response| -> Result<Response> {
            r.data = json!([r.data, "a"]);
            Ok(r)
        });
        pipeline.add_response_interceptor(|mut r: Response| -> Result<Response> {
            r.data = json!([r.data, "b"]);
            Ok(r)
        });

        let response = pipeline.get("/a").await.unwrap();
        assert_eq!(response.data, json!([[1, "a"], "b"]));
    }

    #[tokio::test]
    async fn test_insert_and_remove_response_interceptors() {
        let pipeline = HttpPipeline::new(MockTransport::new().with_response("/a", json!([])));
        let tag = |name: &'static str| {
            move |mut r: Response| -> Result<Response> {
                if let Value::Array(items) = &mut r.data {
                    items.push(json!(name));
                }
                Ok(r)
            }
        };

        pipeline.add_response_interceptor(tag("first"));
        let idx = pipeline.add_response_interceptor(tag("third"));
        pipeline.insert_response_interceptor(1, tag("second"));
        pipeline.insert_response_interceptor(99, tag("last"));

        let response = pipeline.get("/a").await.unwrap();
        assert_eq!(response.data, json!(["first", "second", "third", "last"]));

        // "third" moved to idx + 1 after the insert at 1
        assert!(pipeline.remove_response_interceptor(idx + 1));
        assert!(!pipeline.remove_response_interceptor(3));

        let response = pipeline.get("/a").await.unwrap();
        assert_eq!(response.data, json!(["first", "second", "last"]));
    }

    #[tokio::test]
    async fn test_resolved_skips_transport_and_later_request_interceptors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = HttpPipeline::new(MockTransport::new());

        pipeline.add_request_interceptor(|call: Call| -> Result<Dispatch> {
            Ok(Dispatch::Resolved(Response::from_cache(call, json!("short"))))
        });
        pipeline.add_request_interceptor(recorder(&log, "after"));

        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        pipeline.add_response_interceptor(move |r: Response| -> Result<Response> {
            *counter.lock().unwrap() += 1;
            Ok(r)
        });

        let response = pipeline.get("/a").await.unwrap();
        assert_eq!(response.data, json!("short"));
        assert_eq!(pipeline.transport().call_count(), 0);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_interceptor_error_aborts_call() {
        let pipeline = HttpPipeline::new(MockTransport::new().with_response("/a", json!(1)));
        pipeline.add_request_interceptor(|_call: Call| -> Result<Dispatch> {
            Err(InterceptorError::MissingSessionIdentifier.into())
        });

        let err = pipeline.get("/a").await.unwrap_err();
        assert!(matches!(err, Error::Interceptor(_)));
        assert_eq!(pipeline.transport().call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_reaches_response_error_interceptors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = HttpPipeline::new(MockTransport::new());

        let request_log = log.clone();
        pipeline.add_request_error_interceptor(move |e: &Error| {
            request_log.lock().unwrap().push(format!("request: {e}"));
        });
        for name in ["first", "second"] {
            let log = log.clone();
            pipeline.add_response_error_interceptor(move |e: &Error| {
                if matches!(e, Error::Api(ApiError::NotFound(_))) {
                    log.lock().unwrap().push(format!("{name}: not found"));
                }
            });
        }

        let err = pipeline.get("/missing").await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::NotFound(ref url)) if url == "/missing"));
        assert_eq!(*log.lock().unwrap(), ["first: not found", "second: not found"]);

        let sent = pipeline.transport().captured();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "/missing");
        assert_eq!(sent[0].method, Method::GET);
    }

    #[tokio::test]
    async fn test_request_error_reaches_request_error_interceptors() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = HttpPipeline::new(MockTransport::new().with_response("/a", json!(1)));
        pipeline.add_request_interceptor(|_call: Call| -> Result<Dispatch> {
            Err(InterceptorError::MissingSessionIdentifier.into())
        });

        let request_seen = seen.clone();
        pipeline.add_request_error_interceptor(move |e: &Error| {
            request_seen.lock().unwrap().push(matches!(e, Error::Interceptor(_)));
        });
        let response_seen = seen.clone();
        pipeline.add_response_error_interceptor(move |_e: &Error| {
            response_seen.lock().unwrap().push(false);
        });

        assert!(pipeline.get("/a").await.is_err());
        assert_eq!(*seen.lock().unwrap(), [true]);
        assert!(pipeline.transport().captured().is_empty());
    }

    #[tokio::test]
    async fn test_response_interceptor_error_reaches_response_error_interceptors() {
        let count = Arc::new(Mutex::new(0));
        let pipeline = HttpPipeline::new(MockTransport::new().with_response("/a", json!(1)));
        pipeline.add_response_interceptor(|_r: Response| -> Result<Response> {
            Err(ApiError::InvalidResponse("rejected".to_string()).into())
        });
        let counter = count.clone();
        pipeline.add_response_error_interceptor(move |_e: &Error| {
            *counter.lock().unwrap() += 1;
        });

        let err = pipeline.get("/a").await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::InvalidResponse(_))));
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cached_get_hits_network_once() {
        let pipeline = cached_pipeline(Arc::new(ManualClock::default()), 100);

        let first = pipeline.get("/test").await.unwrap();
        let second = pipeline.get("/test").await.unwrap();

        assert_eq!(pipeline.transport().calls_to("/test"), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.data, second.data);
    }

    #[tokio::test]
    async fn test_ttl_expiry_refetches() {
        let clock = Arc::new(ManualClock::default());
        let pipeline = cached_pipeline(clock.clone(), 5000);

        pipeline.get("/test").await.unwrap();
        clock.advance(Duration::from_millis(4900));
        pipeline.get("/test").await.unwrap();
        assert_eq!(pipeline.transport().calls_to("/test"), 1);

        clock.advance(Duration::from_millis(200));
        pipeline.get("/test").await.unwrap();
        assert_eq!(pipeline.transport().calls_to("/test"), 2);
    }

    #[tokio::test]
    async fn test_post_invalidates_cached_gets() {
        let pipeline = cached_pipeline(Arc::new(ManualClock::default()), 1000);

        pipeline.get("/posts").await.unwrap();
        pipeline.get("/posts/1").await.unwrap();
        pipeline.get("/test").await.unwrap();

        pipeline.transport().set_response("/posts", json!({"id": 2}));
        pipeline.post("/posts", json!({"title": "new"})).await.unwrap();

        pipeline.get("/posts").await.unwrap();
        pipeline.get("/posts/1").await.unwrap();
        pipeline.get("/test").await.unwrap();

        assert_eq!(pipeline.transport().calls_to("/posts/1"), 2);
        assert_eq!(pipeline.transport().calls_to("/test"), 1);
    }

    #[tokio::test]
    async fn test_call_uses_snapshot_of_interceptors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Arc::new(HttpPipeline::new(MockTransport::new().with_response("/a", json!(1))));

        let inner = pipeline.clone();
        let late_log = log.clone();
        pipeline.add_request_interceptor(move |call: Call| -> Result<Dispatch> {
            // Registered while this call is in flight; must not run for it
            inner.add_request_interceptor(recorder(&late_log, "late"));
            Ok(Dispatch::Proceed(call))
        });

        pipeline.get("/a").await.unwrap();
        assert!(log.lock().unwrap().is_empty());

        pipeline.remove_request_interceptor(0);
        pipeline.get("/a").await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
