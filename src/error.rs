//! Error types.
//!
//! Two families, split by where they surface:
//!
//! - [`Error`]: infrastructure failures such as binding a port, reading the
//!   environment, compiling the route table. These come back from startup
//!   calls and never reach request handling.
//! - [`HandlerError`]: a failure raised by a handler or middleware while a
//!   request is in flight. The router turns it into a `500` response and then
//!   hands it back to the caller of [`Router::handle`](crate::Router::handle)
//!   for logging.
//!
//! "No route matched" is not an error at all: it is a
//! [`Match`](crate::Match) variant, answered with a `404`.

use http::Method;
use thiserror::Error;

/// A boxed error that can cross task boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by switchyard's fallible startup operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A route pattern was rejected while compiling the route table.
    #[error("invalid route `{method} {pattern}`: {source}")]
    InvalidRoute {
        method: Method,
        pattern: String,
        #[source]
        source: BoxError,
    },

    /// The environment did not hold a valid configuration.
    #[error("config: {0}")]
    Config(#[from] envy::Error),
}

/// A failure raised while handling a request.
///
/// Carries a human-readable message and a numeric code; both end up in the
/// JSON body of the `500` response:
///
/// ```json
/// {"message":"database unavailable","code":2002}
/// ```
///
/// Handlers produce one by returning `Err(..)`:
///
/// ```rust
/// use switchyard::{HandlerError, Request, Response};
///
/// async fn load(_req: Request) -> Result<Response, HandlerError> {
///     Err(HandlerError::new("database unavailable").with_code(2002))
/// }
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    code: i64,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    /// A failure with the given message and code `0`.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), code: 0, source: None }
    }

    /// Wraps an underlying error, using its `Display` output as the message.
    pub fn from_source(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self { message: source.to_string(), code: 0, source: Some(source) }
    }

    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn message(&self) -> &str { &self.message }
    pub fn code(&self) -> i64 { self.code }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self { Self::new(message) }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self { Self::new(message) }
}

/// The OS error number, when there is one, becomes the code.
impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        let code = e.raw_os_error().map_or(0, i64::from);
        Self::from_source(e).with_code(code)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self { Self::from_source(e) }
}
