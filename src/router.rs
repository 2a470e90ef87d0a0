//! The dispatcher.
//!
//! Per request: restore the proxy base path, match `path_info`, bind path
//! variables as request attributes, run the middleware chain, and send
//! exactly one response through the caller's [`ResponseSink`].
//!
//! ```text
//! Rewriting → Matching ─┬─ NotFound / MethodNotAllowed ──→ send 404
//!                       └─ Found → chain ─┬─ Ok(response) → send response
//!                                         └─ Err(failure) → send 500, return Err
//! ```

use std::sync::Arc;

use http::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, HandlerError};
use crate::middleware::{Middleware, Next};
use crate::proxy::{self, DEFAULT_BASE_PATH_HEADER};
use crate::request::Request;
use crate::response::{Response, ResponseSink};
use crate::route::RouteCollector;
use crate::table::{Match, PathMatcher, RadixMatcher, RouteTable};

/// The application router.
///
/// Construct it with its router-wide middleware, then compile routes once
/// with [`build`](Router::build). The built router is read-only: share it
/// behind an `Arc` across any number of concurrent requests.
///
/// The path-matching engine is a type parameter; [`RadixMatcher`] unless
/// another [`PathMatcher`] is named.
pub struct Router<M = RadixMatcher> {
    middleware: Vec<Arc<dyn Middleware>>,
    table: Option<RouteTable<M>>,
    base_path_header: String,
}

impl Router {
    pub fn new() -> Self {
        Self::with_matcher()
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl<M: PathMatcher> Router<M> {
    /// A router using the matcher `M`, e.g. `Router::<MyMatcher>::with_matcher()`.
    pub fn with_matcher() -> Self {
        Self {
            middleware: Vec::new(),
            table: None,
            base_path_header: DEFAULT_BASE_PATH_HEADER.to_owned(),
        }
    }

    /// Adds router-wide middleware. It wraps every route, outermost first in
    /// the order added.
    #[must_use]
    pub fn with_middleware(mut self, mw: impl Middleware) -> Self {
        self.middleware.push(Arc::new(mw));
        self
    }

    /// Changes the header announcing a proxy-stripped base path
    /// (default `x-micro-web-base-path`).
    #[must_use]
    pub fn base_path_header(mut self, name: impl Into<String>) -> Self {
        self.base_path_header = name.into();
        self
    }

    /// Applies the router-side settings of `config`, currently the base
    /// path header. The listen address goes to
    /// [`Server::from_config`](crate::Server::from_config).
    #[must_use]
    pub fn with_config(self, config: &Config) -> Self {
        self.base_path_header(config.base_path_header.clone())
    }

    /// Runs `declare` once and compiles its routes, replacing any previous
    /// table.
    ///
    /// An invalid or conflicting pattern fails the whole build and leaves
    /// the previous table untouched. Rebuilding must not overlap with
    /// requests in flight; `&mut self` enforces that.
    pub fn build(&mut self, declare: impl FnOnce(&mut RouteCollector)) -> Result<(), Error> {
        let mut collector = RouteCollector::new();
        declare(&mut collector);
        let table = RouteTable::compile(collector.finish())?;
        info!(routes = table.len(), "route table built");
        self.table = Some(table);
        Ok(())
    }

    /// Chaining form of [`build`](Router::build) for startup code.
    ///
    /// ```rust
    /// use switchyard::{Request, Router, middleware::Trace};
    ///
    /// # async fn hello(_: Request) -> &'static str { "hello" }
    /// let router = Router::new()
    ///     .with_middleware(Trace)
    ///     .routes(|r| { r.get("/", hello); })?;
    /// # Ok::<(), switchyard::Error>(())
    /// ```
    pub fn routes(mut self, declare: impl FnOnce(&mut RouteCollector)) -> Result<Self, Error> {
        self.build(declare)?;
        Ok(self)
    }

    /// The compiled table, if [`build`](Router::build) has succeeded.
    pub fn table(&self) -> Option<&RouteTable<M>> {
        self.table.as_ref()
    }

    /// Resolves `method` + `path`. Before the first build nothing matches.
    pub fn lookup(&self, method: &Method, path: &str) -> Match<'_> {
        match &self.table {
            Some(table) => table.lookup(method, path),
            None => Match::NotFound,
        }
    }

    /// Dispatches one request and sends its response through `sink`.
    ///
    /// Unmatched requests get `404 Not Found` and return `Ok(())`. A failure
    /// from a handler or middleware gets a `500` JSON body and is then
    /// returned as `Err` so the caller can log it; the response has already
    /// been sent at that point and must not be sent again.
    pub async fn handle(&self, req: Request, sink: impl ResponseSink) -> Result<(), HandlerError> {
        let req = proxy::restore_base_path(req, &self.base_path_header);
        let path = match req.server_params().path_info.as_str() {
            "" => "/".to_owned(),
            path => path.to_owned(),
        };

        let (route, params) = match self.lookup(req.method(), &path) {
            Match::Found { route, params } => (route, params),
            Match::MethodNotAllowed { allowed } => {
                // Answered as 404 to match the behaviour of unmatched paths.
                debug!(method = %req.method(), path = %path, ?allowed, "method not allowed");
                sink.send(not_found());
                return Ok(());
            }
            Match::NotFound => {
                debug!(method = %req.method(), path = %path, built = self.table.is_some(), "no route");
                sink.send(not_found());
                return Ok(());
            }
        };

        let req = params.into_iter()
            .fold(req, |req, (name, value)| req.with_attribute(name, value));

        let chain: Arc<[Arc<dyn Middleware>]> = self.middleware.iter()
            .chain(route.middleware())
            .cloned()
            .collect();

        match Next::new(chain, Arc::clone(route.handler())).run(req).await {
            Ok(response) => {
                sink.send(response);
                Ok(())
            }
            Err(failure) => {
                sink.send(internal_error(&failure));
                Err(failure)
            }
        }
    }
}

// ── Error responses ───────────────────────────────────────────────────────────

/// `404`, `text/plain`, body `404 Not Found`.
fn not_found() -> Response {
    Response::new()
        .with_status(StatusCode::NOT_FOUND)
        .with_content_type("text/plain", None)
        .with_body("404 Not Found")
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: i64,
}

/// `500`, `application/json; charset=utf-8`, body `{"message":…,"code":…}`.
///
/// serde_json writes non-ASCII characters and `/` as is.
fn internal_error(failure: &HandlerError) -> Response {
    let body = serde_json::to_vec(&ErrorBody { message: failure.message(), code: failure.code() })
        .unwrap_or_default();
    Response::new()
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)
        .with_content_type("application/json", Some("utf-8"))
        .with_body(body)
}

#[cfg(test)]
mod tests {
    use http::Uri;
    use tokio::sync::oneshot;

    use super::*;
    use crate::middleware::{self, Next};

    async fn dispatch<M: PathMatcher>(router: &Router<M>, req: Request) -> (Response, Result<(), HandlerError>) {
        let (tx, rx) = oneshot::channel();
        let result = router.handle(req, tx).await;
        (rx.await.unwrap(), result)
    }

    fn get(uri: &'static str) -> Request {
        Request::new(Method::GET, Uri::from_static(uri))
    }

    async fn show(req: Request) -> String {
        format!("item {}", req.param("id").unwrap_or("?"))
    }

    #[test]
    fn test_not_found_response_shape() {
        let res = not_found();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.content_type(), Some("text/plain"));
        assert_eq!(res.body(), b"404 Not Found");
    }

    #[test]
    fn test_internal_error_leaves_unicode_and_slashes() {
        let res = internal_error(&HandlerError::new("café at /var/run is gone").with_code(-5));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.content_type(), Some("application/json; charset=utf-8"));
        assert_eq!(
            std::str::from_utf8(res.body()).unwrap(),
            r#"{"message":"café at /var/run is gone","code":-5}"#,
        );
    }

    #[tokio::test]
    async fn test_unbuilt_router_answers_404() {
        let router = Router::new();
        let (res, result) = dispatch(&router, get("/")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_method_mismatch_answers_404() {
        let router = Router::new().routes(|r| { r.post("/items", show); }).unwrap();
        assert!(matches!(router.lookup(&Method::GET, "/items"), Match::MethodNotAllowed { .. }));

        let (res, result) = dispatch(&router, get("/items")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), b"404 Not Found");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_path_variables_bound_before_handler() {
        let router = Router::new().routes(|r| { r.get("/foo/{id}/bar", show); }).unwrap();
        let (res, _) = dispatch(&router, get("/foo/42/bar")).await;
        assert_eq!(res.body(), b"item 42");
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_table() {
        let mut router = Router::new();
        router.build(|r| { r.get("/items/{id}", show); }).unwrap();

        let rebuilt = router.build(|r| { r.get("/broken/{id", show); });
        assert!(matches!(rebuilt, Err(Error::InvalidRoute { .. })));

        let (res, _) = dispatch(&router, get("/items/7")).await;
        assert_eq!(res.body(), b"item 7");
    }

    #[tokio::test]
    async fn test_rebuild_replaces_table() {
        let mut router = Router::new();
        router.build(|r| { r.get("/old", show); }).unwrap();
        router.build(|r| { r.get("/new", show); }).unwrap();

        assert!(matches!(router.lookup(&Method::GET, "/old"), Match::NotFound));
        assert!(matches!(router.lookup(&Method::GET, "/new"), Match::Found { .. }));
        assert_eq!(router.table().map(RouteTable::len), Some(1));
    }

    #[tokio::test]
    async fn test_middleware_failure_becomes_500() {
        let router = Router::new()
            .with_middleware(middleware::from_fn(|_req: Request, _next: Next| async {
                Err::<Response, _>(HandlerError::new("token service down").with_code(503))
            }))
            .routes(|r| { r.get("/", show); })
            .unwrap();

        let (res, result) = dispatch(&router, get("/")).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(result.unwrap_err().code(), 503);
    }

    #[tokio::test]
    async fn test_base_path_header_from_config() {
        let config = Config::from_vars(vec![
            ("SWITCHYARD_BASE_PATH_HEADER".to_owned(), "x-forwarded-prefix".to_owned()),
        ])
        .unwrap();
        let router = Router::new()
            .with_config(&config)
            .routes(|r| { r.get("/api/items/{id}", show); })
            .unwrap();

        let (res, _) = dispatch(&router, get("/items/5").with_header("x-forwarded-prefix", "/api")).await;
        assert_eq!(res.body(), b"item 5");

        let (res, _) = dispatch(&router, get("/items/5").with_header(DEFAULT_BASE_PATH_HEADER, "/api")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_custom_base_path_header() {
        let router = Router::new()
            .base_path_header("x-forwarded-prefix")
            .routes(|r| { r.get("/api/items/{id}", show); })
            .unwrap();

        let req = get("/items/3").with_header("x-forwarded-prefix", "/api");
        let (res, _) = dispatch(&router, req).await;

        assert_eq!(res.body(), b"item 3");
    }
}
