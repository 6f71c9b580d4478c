//! HTTP Transport
//!
//! Callback-style HTTP execution capability for token requests, with a
//! reqwest-backed implementation and a scriptable mock.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::lock;
use crate::error::{OAuth2Error, TransportError};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What an executor hands to its completion callback.
///
/// `None` means the executor finished without producing a payload.
pub type ExecutionResult = Option<Result<HttpResponse, TransportError>>;

/// Completion callback invoked at most once by an [`HttpExecutor`].
pub type CompletionCallback = Box<dyn FnOnce(ExecutionResult) + Send + 'static>;

/// Control over an in-flight execution.
pub trait ExecutionHandle: Send + Sync {
    /// Abort the in-flight operation (best effort).
    fn abort(&self);
}

/// Callback-driven HTTP execution capability (for dependency injection).
///
/// Implementations start the request and return immediately. The outcome is
/// delivered later through `on_complete`. An `Err` return means the request
/// was never started.
pub trait HttpExecutor: Send + Sync {
    /// Start executing `request`.
    fn execute(
        &self,
        request: HttpRequest,
        on_complete: CompletionCallback,
    ) -> Result<Box<dyn ExecutionHandle>, TransportError>;
}

impl<E: HttpExecutor + ?Sized> HttpExecutor for Arc<E> {
    fn execute(
        &self,
        request: HttpRequest,
        on_complete: CompletionCallback,
    ) -> Result<Box<dyn ExecutionHandle>, TransportError> {
        (**self).execute(request, on_complete)
    }
}

/// Default reqwest-based HTTP executor.
///
/// Each request runs as a task on the current tokio runtime; aborting the
/// handle aborts the task.
pub struct ReqwestHttpExecutor {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpExecutor {
    /// Create new executor with default settings.
    pub fn new() -> Result<Self, OAuth2Error> {
        Self::with_options(Duration::from_secs(30), 1048576) // 1MB
    }

    /// Create executor with custom options.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> Result<Self, OAuth2Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none()) // Token endpoints must not redirect
            .build()
            .map_err(|e| TransportError::InitiationFailed {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }

    async fn send(
        client: reqwest::Client,
        request: HttpRequest,
        url: reqwest::Url,
        timeout: Duration,
        max_response_size: usize,
    ) -> Result<HttpResponse, TransportError> {
        let mut req_builder = match request.method {
            HttpMethod::Post => client.post(url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { timeout }
            } else {
                TransportError::ConnectionFailed {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string().to_lowercase(), v.to_string());
            }
        }

        if let Some(len) = response.content_length() {
            if len as usize > max_response_size {
                return Err(TransportError::InvalidResponse {
                    message: format!("response too large: {} bytes", len),
                });
            }
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { timeout }
            } else {
                TransportError::InvalidResponse {
                    message: e.to_string(),
                }
            }
        })?;

        if body.len() > max_response_size {
            return Err(TransportError::InvalidResponse {
                message: format!("response too large: {} bytes", body.len()),
            });
        }

        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

struct TaskHandle(tokio::task::AbortHandle);

impl ExecutionHandle for TaskHandle {
    fn abort(&self) {
        self.0.abort();
    }
}

impl HttpExecutor for ReqwestHttpExecutor {
    fn execute(
        &self,
        request: HttpRequest,
        on_complete: CompletionCallback,
    ) -> Result<Box<dyn ExecutionHandle>, TransportError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            TransportError::InitiationFailed {
                message: e.to_string(),
            }
        })?;

        let url = reqwest::Url::parse(&request.url).map_err(|e| TransportError::InitiationFailed {
            message: format!("invalid request URL `{}`: {}", request.url, e),
        })?;

        let client = self.client.clone();
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let max_response_size = self.max_response_size;

        let task = runtime.spawn(async move {
            let result = Self::send(client, request, url, timeout, max_response_size).await;
            on_complete(Some(result));
        });

        Ok(Box::new(TaskHandle(task.abort_handle())))
    }
}

/// Handle returned by [`MockHttpExecutor`]; counts aborts.
struct MockExecutionHandle {
    aborts: Arc<AtomicUsize>,
}

impl ExecutionHandle for MockExecutionHandle {
    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock HTTP executor for testing.
///
/// By default each execution completes synchronously with the next queued
/// result. In deferred mode callbacks are parked until the test fires them
/// with [`MockHttpExecutor::complete_next`].
#[derive(Default)]
pub struct MockHttpExecutor {
    responses: Mutex<VecDeque<ExecutionResult>>,
    request_history: Mutex<Vec<HttpRequest>>,
    parked: Mutex<VecDeque<CompletionCallback>>,
    deferred: Mutex<bool>,
    drop_callbacks: Mutex<bool>,
    next_initiation_error: Mutex<Option<TransportError>>,
    aborts: Arc<AtomicUsize>,
}

impl MockHttpExecutor {
    /// Create new mock executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result to hand to the next callback.
    pub fn queue_result(&self, result: ExecutionResult) -> &Self {
        lock(&self.responses).push_back(result);
        self
    }

    /// Queue a response.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.queue_result(Some(Ok(response)))
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        self.queue_response(HttpResponse {
            status,
            status_text: status_text(status).to_string(),
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: serde_json::to_string(body).unwrap_or_default(),
        })
    }

    /// Queue a transport failure.
    pub fn queue_transport_error(&self, error: TransportError) -> &Self {
        self.queue_result(Some(Err(error)))
    }

    /// Park callbacks instead of completing them immediately.
    pub fn set_deferred(&self, deferred: bool) -> &Self {
        *lock(&self.deferred) = deferred;
        self
    }

    /// Drop callbacks without ever invoking them.
    pub fn set_drop_callbacks(&self, drop_callbacks: bool) -> &Self {
        *lock(&self.drop_callbacks) = drop_callbacks;
        self
    }

    /// Make the next `execute` call fail to start.
    pub fn fail_next_execution(&self, error: TransportError) -> &Self {
        *lock(&self.next_initiation_error) = Some(error);
        self
    }

    /// Fire the oldest parked callback with `result`.
    ///
    /// Returns `false` when nothing is parked.
    pub fn complete_next(&self, result: ExecutionResult) -> bool {
        let callback = lock(&self.parked).pop_front();
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => false,
        }
    }

    /// Number of parked callbacks.
    pub fn pending_count(&self) -> usize {
        lock(&self.parked).len()
    }

    /// Number of `abort()` calls across all handles.
    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        lock(&self.request_history).clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        lock(&self.request_history).last().cloned()
    }

    /// Clear request history.
    pub fn clear_history(&self) {
        lock(&self.request_history).clear();
    }
}

impl HttpExecutor for MockHttpExecutor {
    fn execute(
        &self,
        request: HttpRequest,
        on_complete: CompletionCallback,
    ) -> Result<Box<dyn ExecutionHandle>, TransportError> {
        lock(&self.request_history).push(request);

        if let Some(error) = lock(&self.next_initiation_error).take() {
            return Err(error);
        }

        let handle = Box::new(MockExecutionHandle {
            aborts: self.aborts.clone(),
        });

        if *lock(&self.drop_callbacks) {
            drop(on_complete);
        } else if *lock(&self.deferred) {
            lock(&self.parked).push_back(on_complete);
        } else {
            let result = lock(&self.responses).pop_front().unwrap_or_else(|| {
                Some(Err(TransportError::ConnectionFailed {
                    message: "No mock response available".to_string(),
                }))
            });
            on_complete(result);
        }

        Ok(handle)
    }
}

fn status_text(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// Create production HTTP executor.
pub fn create_executor(timeout: Option<Duration>) -> Result<ReqwestHttpExecutor, OAuth2Error> {
    match timeout {
        Some(t) => ReqwestHttpExecutor::with_options(t, 1048576),
        None => ReqwestHttpExecutor::new(),
    }
}

/// Create mock HTTP executor for testing.
pub fn create_mock_executor() -> MockHttpExecutor {
    MockHttpExecutor::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: "https://example.com/token".to_string(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    #[test]
    fn test_mock_executor_completes_immediately() {
        let executor = MockHttpExecutor::new();
        executor.queue_json_response(200, &serde_json::json!({"key": "value"}));

        let (tx, rx) = mpsc::channel();
        executor
            .execute(request(), Box::new(move |result| tx.send(result).unwrap()))
            .unwrap();

        let response = rx.recv().unwrap().unwrap().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert!(response.body.contains("value"));

        let history = executor.get_requests();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].url, "https://example.com/token");
    }

    #[test]
    fn test_mock_executor_deferred() {
        let executor = MockHttpExecutor::new();
        executor.set_deferred(true);

        let (tx, rx) = mpsc::channel();
        let handle = executor
            .execute(request(), Box::new(move |result| tx.send(result).unwrap()))
            .unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(executor.pending_count(), 1);

        handle.abort();
        assert_eq!(executor.abort_count(), 1);

        assert!(executor.complete_next(None));
        assert!(rx.recv().unwrap().is_none());
        assert!(!executor.complete_next(None));
    }

    #[test]
    fn test_mock_executor_initiation_failure() {
        let executor = MockHttpExecutor::new();
        executor.fail_next_execution(TransportError::InitiationFailed {
            message: "boom".to_string(),
        });

        let result = executor.execute(request(), Box::new(|_| {}));
        assert!(matches!(
            result,
            Err(TransportError::InitiationFailed { .. })
        ));
    }

    #[test]
    fn test_response_is_success() {
        let mut response = HttpResponse {
            status: 204,
            status_text: "No Content".to_string(),
            headers: HashMap::new(),
            body: String::new(),
        };
        assert!(response.is_success());
        response.status = 302;
        assert!(!response.is_success());
        response.status = 400;
        assert!(!response.is_success());
    }

    #[test]
    fn test_http_method_as_str() {
        assert_eq!(HttpMethod::Post.as_str(), "POST");
    }

    #[test]
    fn test_reqwest_executor_requires_runtime() {
        let executor = ReqwestHttpExecutor::new().unwrap();
        let result = executor.execute(request(), Box::new(|_| {}));
        assert!(matches!(
            result,
            Err(TransportError::InitiationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_reqwest_executor_rejects_invalid_url() {
        let executor = ReqwestHttpExecutor::new().unwrap();
        let mut bad = request();
        bad.url = "not a url".to_string();

        let result = executor.execute(bad, Box::new(|_| {}));
        assert!(matches!(
            result,
            Err(TransportError::InitiationFailed { .. })
        ));
    }
}
