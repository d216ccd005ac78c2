use thiserror::Error;

/// ConfigError
///
/// Startup-time configuration failures. These indicate a deployment defect
/// (missing secrets, malformed route tables) and abort before any request
/// is served; none of them can occur at navigation time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set for the current environment.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// A route table entry does not look like a path.
    #[error("route table entry {entry:?} is malformed: {reason}")]
    MalformedPath { entry: String, reason: &'static str },

    /// The same path appears in both the public and the admin table, which
    /// would make its classification ambiguous.
    #[error("path {0:?} appears in both the public and the admin table")]
    OverlappingTables(String),

    /// The sign-in path is not covered by the public table, so the guard's
    /// own redirect target would be redirected.
    #[error("sign-in path {0:?} is not covered by the public table")]
    UnreachableSignIn(String),

    /// The API base URL is not an absolute http(s) URL.
    #[error("invalid API base url {0:?}")]
    InvalidBaseUrl(String),

    /// The HTTP client could not be constructed (TLS backend initialization).
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// GuardDecisionError
///
/// Session verification failed. The guard never treats this as fatal: a
/// request carrying a bad token is downgraded to an anonymous one, logged,
/// and continues as public.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardDecisionError {
    #[error("session token expired")]
    Expired,

    #[error("session token rejected: {0}")]
    Invalid(String),

    #[error("session provider unavailable: {0}")]
    Unavailable(String),
}

/// HttpError
///
/// Transport-level failure as reported by the `Transport` collaborator.
/// Cloneable so that a single in-flight result can fan out to every caller
/// coalesced onto the same request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The request never reached the server (DNS, refused connection, TLS).
    #[error("request to {endpoint} failed: {message}")]
    Connect { endpoint: String, message: String },

    /// The request was sent but no response arrived within the deadline.
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// The server answered with a non-success status.
    #[error("{endpoint} returned status {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The response body was not valid JSON.
    #[error("response from {endpoint} was not valid JSON: {message}")]
    Body { endpoint: String, message: String },
}

impl HttpError {
    /// The HTTP status carried by this error, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// FetchError
///
/// A read failed. Recoverable: a previously cached value (if any) is left in
/// place for optimistic display, and the caller decides whether to retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response arrived but did not match the expected payload shape.
    #[error("unexpected payload: {0}")]
    Decode(String),

    /// The navigation (or the cache itself) moved on before the fetch
    /// resolved; the result was discarded without touching the cache.
    #[error("navigation changed before the fetch resolved")]
    Superseded,
}

/// MutationError
///
/// A write failed. No cache entry is touched; the underlying transport error
/// is surfaced verbatim so the caller can re-present the operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The mutation succeeded on the wire but the response payload did not
    /// match the expected shape.
    #[error("unexpected payload: {0}")]
    Decode(String),
}
