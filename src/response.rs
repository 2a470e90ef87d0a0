//! Outgoing HTTP response type, the [`IntoResponse`] conversion trait, and
//! the [`ResponseSink`] a response is finally sent through.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use tokio::sync::oneshot;
use tracing::{debug, error};

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK)
///
/// ```rust
/// use switchyard::{Response, StatusCode};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::empty(StatusCode::NO_CONTENT);
/// ```
///
/// # Setters (custom status, content type, headers)
///
/// ```rust
/// use switchyard::{Response, StatusCode};
///
/// Response::new()
///     .with_status(StatusCode::CREATED)
///     .with_header("location", "/users/42")
///     .with_content_type("application/json", Some("utf-8"))
///     .with_body(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Response {
    /// `200 OK`, no headers, empty body.
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: Vec::new(), body: Bytes::new() }
    }

    /// `200 OK`, `application/json`.
    ///
    /// Pass bytes from your serialiser directly, e.g.
    /// `serde_json::to_vec(&val)?`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new()
            .with_content_type("application/json", None)
            .with_body(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new()
            .with_content_type("text/plain", Some("utf-8"))
            .with_body(body.into())
    }

    /// Response with the given status and no body.
    pub fn empty(status: StatusCode) -> Self {
        Self::new().with_status(status)
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Returns the first value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets `content-type`, replacing any previous value.
    ///
    /// `with_content_type("application/json", Some("utf-8"))` yields
    /// `application/json; charset=utf-8`.
    #[must_use]
    pub fn with_content_type(mut self, mime: &str, charset: Option<&str>) -> Self {
        let value = match charset {
            Some(charset) => format!("{mime}; charset={charset}"),
            None => mime.to_owned(),
        };
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
        self.headers.push(("content-type".to_owned(), value));
        self
    }

    /// Appends a header. Existing values under the same name are kept.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Converts into the hyper representation written to the wire.
    ///
    /// A header that is not valid HTTP turns the whole response into an
    /// empty `500`; the handler's output is logged instead of sent.
    pub(crate) fn into_hyper(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Full::new(self.body)).unwrap_or_else(|e| {
            error!(status = %self.status, "invalid response header: {e}");
            let mut fallback = http::Response::new(Full::default());
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

// ── ResponseSink ──────────────────────────────────────────────────────────────

/// Where a finished response is transmitted.
///
/// `send` takes `self` by value: a sink can be used exactly once, so no code
/// path in the router can transmit two responses for one request.
pub trait ResponseSink: Send {
    fn send(self, response: Response);
}

/// The server hands one of these to the router per request and awaits the
/// receiving half.
impl ResponseSink for oneshot::Sender<Response> {
    fn send(self, response: Response) {
        if oneshot::Sender::send(self, response).is_err() {
            debug!("response dropped, receiver gone");
        }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into a [`Response`].
///
/// Implement it on domain types so handlers can return them inside `Ok(..)`:
///
/// ```rust
/// use switchyard::{HandlerError, IntoResponse, Request, Response, StatusCode};
///
/// struct Created { location: String }
///
/// impl IntoResponse for Created {
///     fn into_response(self) -> Response {
///         Response::empty(StatusCode::CREATED).with_header("location", self.location)
///     }
/// }
///
/// async fn create(_req: Request) -> Result<Created, HandlerError> {
///     Ok(Created { location: "/jobs/7".into() })
/// }
/// ```
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`StatusCode`] directly from a handler: `return StatusCode::NO_CONTENT`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::empty(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_with_charset() {
        let res = Response::new().with_content_type("application/json", Some("utf-8"));
        assert_eq!(res.content_type(), Some("application/json; charset=utf-8"));
    }

    #[test]
    fn test_content_type_is_replaced() {
        let res = Response::text("hi").with_content_type("text/plain", None);
        assert_eq!(res.content_type(), Some("text/plain"));
        assert_eq!(res.headers().len(), 1);
    }

    #[test]
    fn test_into_hyper_keeps_status_headers_body() {
        let res = Response::json(b"[]".to_vec())
            .with_status(StatusCode::CREATED)
            .with_header("location", "/things/1")
            .into_hyper();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["content-type"], "application/json");
        assert_eq!(res.headers()["location"], "/things/1");
    }

    #[test]
    fn test_into_hyper_rejects_invalid_header() {
        let res = Response::text("hi").with_header("bad header", "x").into_hyper();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_oneshot_sink_delivers() {
        let (tx, rx) = oneshot::channel();
        ResponseSink::send(tx, Response::empty(StatusCode::ACCEPTED));
        assert_eq!(rx.await.unwrap().status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_oneshot_sink_tolerates_dropped_receiver() {
        let (tx, rx) = oneshot::channel::<Response>();
        drop(rx);
        ResponseSink::send(tx, Response::new());
    }
}
