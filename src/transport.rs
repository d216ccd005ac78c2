use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::{ConfigError, HttpError};

/// WriteMethod
///
/// The HTTP verbs the portal uses for mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    Post,
    Patch,
    Delete,
}

impl WriteMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMethod::Post => "POST",
            WriteMethod::Patch => "PATCH",
            WriteMethod::Delete => "DELETE",
        }
    }
}

// 1. Transport Contract
/// Transport
///
/// Defines the abstract contract for all traffic to the backend API.
/// This trait allows us to swap the concrete implementation, from the real
/// HTTP client (HttpTransport) in production to the in-memory Mock
/// (MockTransport) during testing, without affecting the cache coordinator.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a read. `params` must be a JSON object (or `null`); its
    /// non-null members are sent as query parameters.
    async fn fetch(&self, endpoint: &str, params: &Value) -> Result<Value, HttpError>;

    /// Performs a mutation with the given verb and JSON body. A `null` body
    /// sends no payload at all.
    async fn submit(
        &self,
        method: WriteMethod,
        endpoint: &str,
        body: &Value,
    ) -> Result<Value, HttpError>;
}

/// TransportState
///
/// The concrete type used to share the transport across the application state.
pub type TransportState = Arc<dyn Transport>;

/// CredentialStore
///
/// Shared holder for the visitor's raw session token. Written on sign-in and
/// sign-out, read by the transport when attaching the Authorization header.
/// Cheap to clone; all clones share the same slot.
#[derive(Clone, Default)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write().unwrap() = None;
    }

    pub fn current(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }
}

// 2. The Real Implementation (reqwest)
/// HttpTransport
///
/// The concrete implementation over `reqwest`. Joins endpoints onto the
/// configured base URL, attaches the bearer token when one is stored, and
/// normalizes every failure into the `HttpError` taxonomy.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
}

impl HttpTransport {
    /// Constructs the transport with the default 10 second request deadline.
    pub fn new(base_url: &str, credentials: CredentialStore) -> Result<Self, ConfigError> {
        Self::with_timeout(base_url, credentials, Duration::from_secs(10))
    }

    pub fn with_timeout(
        base_url: &str,
        credentials: CredentialStore,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        reqwest::Url::parse(base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(base_url.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.current() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Query parameters are sent unquoted: a string member becomes its bare
/// value, everything else its compact JSON form.
fn query_value(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

fn send_error(endpoint: &str, e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        HttpError::Connect {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        }
    }
}

/// Drains a response into a JSON value. Non-success statuses carry the first
/// part of the body as the error message; empty bodies (204s) become `null`.
async fn read_response(endpoint: &str, response: reqwest::Response) -> Result<Value, HttpError> {
    let status = response.status();

    let body = response.text().await.map_err(|e| HttpError::Body {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;

    if !status.is_success() {
        return Err(HttpError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| HttpError::Body {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, endpoint: &str, params: &Value) -> Result<Value, HttpError> {
        let mut request = self.client.get(self.endpoint_url(endpoint));

        if let Some(map) = params.as_object() {
            let pairs: Vec<(String, String)> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), query_value(v)))
                .collect();

            if !pairs.is_empty() {
                request = request.query(&pairs);
            }
        }

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| send_error(endpoint, e))?;

        read_response(endpoint, response).await
    }

    async fn submit(
        &self,
        method: WriteMethod,
        endpoint: &str,
        body: &Value,
    ) -> Result<Value, HttpError> {
        let url = self.endpoint_url(endpoint);

        let mut request = match method {
            WriteMethod::Post => self.client.post(&url),
            WriteMethod::Patch => self.client.patch(&url),
            WriteMethod::Delete => self.client.delete(&url),
        };

        if !body.is_null() {
            request = request.json(body);
        }

        tracing::debug!(method = method.as_str(), endpoint, "Submitting mutation");

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| send_error(endpoint, e))?;

        read_response(endpoint, response).await
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockTransport
///
/// A mock implementation of `Transport` used exclusively for unit and
/// integration testing. Responses are routed by endpoint, failures can be
/// injected per direction, and `hold()` parks every fetch on a gate so tests
/// can control exactly when an in-flight request resolves.
#[derive(Default)]
pub struct MockTransport {
    fetch_routes: Mutex<HashMap<String, Value>>,
    submit_routes: Mutex<HashMap<String, Value>>,
    fetch_failure: Mutex<Option<HttpError>>,
    submit_failure: Mutex<Option<HttpError>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    fetch_log: Mutex<Vec<(String, Value)>>,
    submit_log: Mutex<Vec<(WriteMethod, String, Value)>>,
    fetch_count: AtomicUsize,
    submit_count: AtomicUsize,
}

/// TransportGate
///
/// Handle returned by `MockTransport::hold()`. Each released permit lets
/// exactly one parked fetch proceed.
pub struct TransportGate {
    semaphore: Arc<Semaphore>,
}

impl TransportGate {
    pub fn release(&self, permits: usize) {
        self.semaphore.add_permits(permits);
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the response for fetches of `endpoint`, replacing any
    /// previous one.
    pub fn on_fetch(&self, endpoint: &str, response: Value) {
        self.fetch_routes
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), response);
    }

    /// Registers the response for submits to `endpoint`.
    pub fn on_submit(&self, endpoint: &str, response: Value) {
        self.submit_routes
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), response);
    }

    /// All subsequent fetches fail with the given error until `recover`.
    pub fn fail_fetches(&self, error: HttpError) {
        *self.fetch_failure.lock().unwrap() = Some(error);
    }

    /// All subsequent submits fail with the given error until `recover`.
    pub fn fail_submits(&self, error: HttpError) {
        *self.submit_failure.lock().unwrap() = Some(error);
    }

    pub fn recover(&self) {
        *self.fetch_failure.lock().unwrap() = None;
        *self.submit_failure.lock().unwrap() = None;
    }

    /// Parks all subsequent fetches until the returned gate releases them.
    /// The fetch is still logged and counted before it parks, so tests can
    /// wait for a request to be in flight.
    pub fn hold(&self) -> TransportGate {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(semaphore.clone());
        TransportGate { semaphore }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    pub fn fetched(&self) -> Vec<(String, Value)> {
        self.fetch_log.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<(WriteMethod, String, Value)> {
        self.submit_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, endpoint: &str, params: &Value) -> Result<Value, HttpError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.fetch_log
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.clone()));

        // Clone the gate out so the lock is not held across the await.
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(error) = self.fetch_failure.lock().unwrap().clone() {
            return Err(error);
        }

        let routes = self.fetch_routes.lock().unwrap();
        match routes.get(endpoint) {
            Some(response) => Ok(response.clone()),
            None => Err(HttpError::Status {
                endpoint: endpoint.to_string(),
                status: 404,
                message: "no mock response configured".to_string(),
            }),
        }
    }

    async fn submit(
        &self,
        method: WriteMethod,
        endpoint: &str,
        body: &Value,
    ) -> Result<Value, HttpError> {
        self.submit_count.fetch_add(1, Ordering::SeqCst);
        self.submit_log
            .lock()
            .unwrap()
            .push((method, endpoint.to_string(), body.clone()));

        if let Some(error) = self.submit_failure.lock().unwrap().clone() {
            return Err(error);
        }

        let routes = self.submit_routes.lock().unwrap();
        match routes.get(endpoint) {
            Some(response) => Ok(response.clone()),
            None => Ok(Value::Null),
        }
    }
}
