//! Route registration.
//!
//! Routes are declared inside the callback passed to
//! [`Router::build`](crate::Router::build). The callback receives a
//! [`RouteCollector`]; once it returns, the collected declarations are
//! compiled into the route table in one step.

use std::sync::Arc;

use http::Method;

use crate::handler::Handler;
use crate::middleware::Middleware;
use crate::table::Route;

/// Accumulates route declarations for one build.
///
/// ```rust
/// use switchyard::{Method, Request, RouteCollector, Router, StatusCode};
/// use switchyard::middleware::{self, Next};
///
/// # async fn list(_: Request) -> &'static str { "" }
/// # async fn show(_: Request) -> &'static str { "" }
/// # async fn purge(_: Request) -> StatusCode { StatusCode::NO_CONTENT }
/// let mut router = Router::new();
/// router.build(|r: &mut RouteCollector| {
///     r.get("/users", list);
///     r.get("/users/{id}", show);
///     r.group("/admin", |admin| {
///         admin.middleware(middleware::from_fn(|req: Request, next: Next| next.run(req)));
///         admin.on(Method::DELETE, "/cache", purge);
///     });
/// })?;
/// # Ok::<(), switchyard::Error>(())
/// ```
#[derive(Default)]
pub struct RouteCollector {
    prefix: String,
    middleware: Vec<Arc<dyn Middleware>>,
    routes: Vec<Route>,
}

impl RouteCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` + `pattern`.
    ///
    /// Path variables use `{name}` syntax. Malformed patterns are reported by
    /// the build, not here.
    pub fn on(&mut self, method: Method, pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        self.map(&[method], pattern, handler)
    }

    /// Registers one handler under several methods.
    pub fn map(&mut self, methods: &[Method], pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        let handler = handler.into_boxed_handler();
        let pattern = format!("{}{pattern}", self.prefix);
        let first = self.routes.len();
        for method in methods {
            self.routes.push(Route::new(method.clone(), pattern.clone(), Arc::clone(&handler)));
        }
        RouteHandle { routes: &mut self.routes[first..] }
    }

    pub fn get(&mut self, pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        self.on(Method::GET, pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        self.on(Method::POST, pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        self.on(Method::PUT, pattern, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        self.on(Method::PATCH, pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        self.on(Method::DELETE, pattern, handler)
    }

    pub fn head(&mut self, pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        self.on(Method::HEAD, pattern, handler)
    }

    pub fn options(&mut self, pattern: &str, handler: impl Handler) -> RouteHandle<'_> {
        self.on(Method::OPTIONS, pattern, handler)
    }

    /// Declares routes under a common prefix.
    ///
    /// Prefixes are concatenated as written: group `/api` with route
    /// `/users` gives `/api/users`. Groups nest.
    pub fn group(&mut self, prefix: &str, declare: impl FnOnce(&mut RouteCollector)) {
        let mut group = Self {
            prefix: format!("{}{prefix}", self.prefix),
            ..Self::default()
        };
        declare(&mut group);
        self.routes.extend(group.finish());
    }

    /// Wraps every route of this collector (or group) in `mw`, including
    /// routes declared before this call. Runs before route-specific
    /// middleware.
    pub fn middleware(&mut self, mw: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(mw));
        self
    }

    pub(crate) fn finish(mut self) -> Vec<Route> {
        if !self.middleware.is_empty() {
            for route in &mut self.routes {
                route.wrap_middleware(&self.middleware);
            }
        }
        self.routes
    }
}

/// The route(s) created by one declaration.
pub struct RouteHandle<'a> {
    routes: &'a mut [Route],
}

impl RouteHandle<'_> {
    /// Appends route-specific middleware. Calls chain; order is kept.
    pub fn with(self, mw: impl Middleware) -> Self {
        let mw: Arc<dyn Middleware> = Arc::new(mw);
        for route in self.routes.iter_mut() {
            route.push_middleware(Arc::clone(&mw));
        }
        self
    }
}
