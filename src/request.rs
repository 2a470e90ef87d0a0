//! Incoming HTTP request type.
//!
//! Requests are values: every `with_*` method consumes the request and
//! returns the updated one, so a rewrite can never be silently dropped.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{Method, Uri};

/// Server-level parameters resolved by the transport.
///
/// `path_info` is what the router matches against. Behind a path-prefixing
/// proxy it may differ from the path the client originally requested; see
/// the proxy rewrite in [`Router::handle`](crate::Router::handle).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerParams {
    pub request_uri: String,
    pub path_info: String,
    pub query_string: Option<String>,
    pub remote_addr: Option<SocketAddr>,
}

impl ServerParams {
    /// Parameters derived from a URI alone: both `request_uri` and
    /// `path_info` are its path.
    pub fn from_uri(uri: &Uri) -> Self {
        Self {
            request_uri: uri.path().to_owned(),
            path_info: uri.path().to_owned(),
            query_string: uri.query().map(str::to_owned),
            remote_addr: None,
        }
    }
}

/// An incoming HTTP request.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: Vec<(String, String)>,
    body: Bytes,
    server_params: ServerParams,
    attributes: HashMap<String, String>,
}

impl Request {
    /// A request with no headers and an empty body.
    ///
    /// ```rust
    /// use switchyard::{Method, Request, Uri};
    ///
    /// let req = Request::new(Method::GET, Uri::from_static("/users/42?full=1"))
    ///     .with_header("accept", "application/json");
    ///
    /// assert_eq!(req.server_params().path_info, "/users/42");
    /// assert_eq!(req.header("Accept"), Some("application/json"));
    /// ```
    pub fn new(method: Method, uri: Uri) -> Self {
        let server_params = ServerParams::from_uri(&uri);
        Self {
            method,
            uri,
            headers: Vec::new(),
            body: Bytes::new(),
            server_params,
            attributes: HashMap::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes, remote_addr: SocketAddr) -> Self {
        let headers = parts.headers.iter()
            .map(|(k, v)| (k.as_str().to_owned(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let server_params = ServerParams {
            remote_addr: Some(remote_addr),
            ..ServerParams::from_uri(&parts.uri)
        };
        Self {
            method: parts.method,
            uri: parts.uri,
            headers,
            body,
            server_params,
            attributes: HashMap::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn server_params(&self) -> &ServerParams { &self.server_params }

    /// Case-insensitive header lookup. Returns the first value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header joined with `", "`, or `""` if absent.
    pub fn header_line(&self, name: &str) -> String {
        self.headers.iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns a request attribute set by the router or a middleware.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns
    /// `Some("42")`. Path parameters live in the attribute store, so this is
    /// the same lookup as [`attribute`](Request::attribute).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.attribute(name)
    }

    #[must_use]
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    #[must_use]
    pub fn with_server_params(mut self, params: ServerParams) -> Self {
        self.server_params = params;
        self
    }

    /// Sets an attribute, replacing any previous value under `name`.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Appends a header value. Existing values under the same name are kept.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_params_follow_uri() {
        let req = Request::new(Method::GET, Uri::from_static("/a/b?x=1"));
        let params = req.server_params();
        assert_eq!(params.request_uri, "/a/b");
        assert_eq!(params.path_info, "/a/b");
        assert_eq!(params.query_string.as_deref(), Some("x=1"));
        assert_eq!(params.remote_addr, None);
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = Request::new(Method::GET, Uri::from_static("/"))
            .with_header("X-Micro-Web-Base-Path", "/v1");
        assert_eq!(req.header("x-micro-web-base-path"), Some("/v1"));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn test_header_line_joins_values() {
        let req = Request::new(Method::GET, Uri::from_static("/"))
            .with_header("accept", "text/html")
            .with_header("Accept", "application/json");
        assert_eq!(req.header_line("accept"), "text/html, application/json");
        assert_eq!(req.header_line("x-missing"), "");
    }

    #[test]
    fn test_attributes_replace_previous_value() {
        let req = Request::new(Method::GET, Uri::from_static("/"))
            .with_attribute("id", "1")
            .with_attribute("id", "2");
        assert_eq!(req.attribute("id"), Some("2"));
        assert_eq!(req.param("id"), Some("2"));
    }

    #[test]
    fn test_from_parts_records_peer() {
        let (parts, ()) = http::Request::builder()
            .method(Method::POST)
            .uri("/upload?kind=png")
            .header("content-type", "image/png")
            .body(())
            .unwrap()
            .into_parts();
        let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        let req = Request::from_parts(parts, Bytes::from_static(b"\x89PNG"), peer);

        assert_eq!(*req.method(), Method::POST);
        assert_eq!(req.header("Content-Type"), Some("image/png"));
        assert_eq!(req.body(), b"\x89PNG");
        assert_eq!(req.server_params().remote_addr, Some(peer));
        assert_eq!(req.server_params().path_info, "/upload");
    }
}
