//! Compiled route table.
//!
//! One path matcher per HTTP method. With the default [`RadixMatcher`] that
//! is one radix tree per method and O(path-length) lookup. The table is
//! built once from the declarations a [`RouteCollector`](crate::RouteCollector)
//! gathered and is read-only afterwards, so any number of requests may look
//! up routes concurrently without locking.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::{BoxError, Error};
use crate::handler::BoxedHandler;
use crate::middleware::Middleware;

/// Path variables captured by a match, in pattern order.
pub type Params = Vec<(String, String)>;

// ── PathMatcher ───────────────────────────────────────────────────────────────

/// The pattern engine behind a [`RouteTable`].
///
/// A matcher stores route indices, not routes, so an implementation only has
/// to care about paths. Invalid patterns must be rejected by `insert`; `find`
/// is called concurrently and must not mutate.
pub trait PathMatcher: Default + Send + Sync + 'static {
    /// Registers `pattern`, answering with `route` when it matches.
    fn insert(&mut self, pattern: &str, route: usize) -> Result<(), BoxError>;

    /// The route matching `path`, with its captured variables.
    fn find(&self, path: &str) -> Option<(usize, Params)>;
}

/// Radix-tree matcher backed by [`matchit`].
///
/// Patterns use `{name}` for a single segment and `{*name}` for the rest of
/// the path. Static segments win over parameters: with `/foo/bar` and
/// `/foo/{x}` registered, `/foo/bar` always resolves to the first.
#[derive(Default)]
pub struct RadixMatcher(MatchitRouter<usize>);

impl PathMatcher for RadixMatcher {
    fn insert(&mut self, pattern: &str, route: usize) -> Result<(), BoxError> {
        self.0.insert(pattern, route).map_err(Into::into)
    }

    fn find(&self, path: &str) -> Option<(usize, Params)> {
        let matched = self.0.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((*matched.value, params))
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// A registered route: method, pattern, handler, and its own middleware.
pub struct Route {
    method: Method,
    pattern: String,
    handler: BoxedHandler,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Route {
    pub(crate) fn new(method: Method, pattern: String, handler: BoxedHandler) -> Self {
        Self { method, pattern, handler, middleware: Vec::new() }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn pattern(&self) -> &str { &self.pattern }

    /// Route-specific middleware, outermost first.
    pub fn middleware(&self) -> &[Arc<dyn Middleware>] { &self.middleware }

    pub(crate) fn handler(&self) -> &BoxedHandler { &self.handler }

    pub(crate) fn push_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middleware.push(mw);
    }

    /// Puts `outer` in front of this route's own middleware.
    pub(crate) fn wrap_middleware(&mut self, outer: &[Arc<dyn Middleware>]) {
        self.middleware.splice(0..0, outer.iter().cloned());
    }
}

// ── Match ─────────────────────────────────────────────────────────────────────

/// The outcome of resolving a method and path against a [`RouteTable`].
pub enum Match<'a> {
    Found { route: &'a Route, params: Params },
    /// The path exists, but only under the listed methods (sorted).
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

// ── RouteTable ────────────────────────────────────────────────────────────────

/// Routes compiled into one matcher per method.
pub struct RouteTable<M = RadixMatcher> {
    routes: Vec<Route>,
    trees: HashMap<Method, M>,
}

impl<M: PathMatcher> RouteTable<M> {
    /// Compiles `routes`, failing on the first pattern the matcher rejects.
    pub fn compile(routes: Vec<Route>) -> Result<Self, Error> {
        let mut trees: HashMap<Method, M> = HashMap::new();
        for (index, route) in routes.iter().enumerate() {
            trees
                .entry(route.method.clone())
                .or_default()
                .insert(&route.pattern, index)
                .map_err(|source| Error::InvalidRoute {
                    method: route.method.clone(),
                    pattern: route.pattern.clone(),
                    source,
                })?;
        }
        Ok(Self { routes, trees })
    }

    /// Resolves `method` + `path`.
    ///
    /// A `HEAD` request with no `HEAD` route of its own is answered by the
    /// `GET` route for the same path.
    pub fn lookup(&self, method: &Method, path: &str) -> Match<'_> {
        let found = self.find(method, path).or_else(|| {
            if *method == Method::HEAD { self.find(&Method::GET, path) } else { None }
        });
        if let Some((route, params)) = found {
            return Match::Found { route, params };
        }

        let mut allowed: Vec<Method> = self.trees.iter()
            .filter(|(m, tree)| *m != method && tree.find(path).is_some())
            .map(|(m, _)| m.clone())
            .collect();
        if allowed.is_empty() {
            return Match::NotFound;
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Match::MethodNotAllowed { allowed }
    }

    fn find(&self, method: &Method, path: &str) -> Option<(&Route, Params)> {
        let (index, params) = self.trees.get(method)?.find(path)?;
        Some((self.routes.get(index)?, params))
    }

    pub fn routes(&self) -> &[Route] { &self.routes }
    pub fn len(&self) -> usize { self.routes.len() }
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;
    use crate::request::Request;

    async fn noop(_req: Request) -> &'static str { "" }

    fn route(method: Method, pattern: &str) -> Route {
        Route::new(method, pattern.to_owned(), noop.into_boxed_handler())
    }

    fn table(routes: &[(Method, &str)]) -> RouteTable {
        RouteTable::compile(routes.iter().map(|(m, p)| route(m.clone(), p)).collect()).unwrap()
    }

    fn found_pattern(m: Match<'_>) -> Option<String> {
        match m {
            Match::Found { route, .. } => Some(route.pattern().to_owned()),
            _ => None,
        }
    }

    #[test]
    fn test_static_segment_beats_variable() {
        let table = table(&[(Method::GET, "/foo/{x}"), (Method::GET, "/foo/bar")]);
        assert_eq!(found_pattern(table.lookup(&Method::GET, "/foo/bar")).as_deref(), Some("/foo/bar"));
        assert_eq!(found_pattern(table.lookup(&Method::GET, "/foo/baz")).as_deref(), Some("/foo/{x}"));
    }

    #[test]
    fn test_variables_in_pattern_order() {
        let table = table(&[(Method::GET, "/orgs/{org}/repos/{repo}")]);
        match table.lookup(&Method::GET, "/orgs/acme/repos/anvil") {
            Match::Found { params, .. } => assert_eq!(params, vec![
                ("org".to_owned(), "acme".to_owned()),
                ("repo".to_owned(), "anvil".to_owned()),
            ]),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let table = table(&[
            (Method::PUT, "/items/{id}"),
            (Method::DELETE, "/items/{id}"),
            (Method::GET, "/items"),
        ]);
        match table.lookup(&Method::POST, "/items/1") {
            Match::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::DELETE, Method::PUT]),
            _ => panic!("expected method-not-allowed"),
        }
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let table = table(&[(Method::GET, "/page"), (Method::GET, "/users/{id}")]);
        assert_eq!(found_pattern(table.lookup(&Method::HEAD, "/page")).as_deref(), Some("/page"));
        match table.lookup(&Method::HEAD, "/users/9") {
            Match::Found { route, params } => {
                assert_eq!(*route.method(), Method::GET);
                assert_eq!(params, vec![("id".to_owned(), "9".to_owned())]);
            }
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn test_explicit_head_route_wins_over_get() {
        let table = table(&[(Method::GET, "/page"), (Method::HEAD, "/page")]);
        match table.lookup(&Method::HEAD, "/page") {
            Match::Found { route, .. } => assert_eq!(*route.method(), Method::HEAD),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn test_get_does_not_fall_back_to_head() {
        let table = table(&[(Method::HEAD, "/page")]);
        match table.lookup(&Method::GET, "/page") {
            Match::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::HEAD]),
            _ => panic!("expected method-not-allowed"),
        }
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let table = table(&[(Method::GET, "/items")]);
        assert!(matches!(table.lookup(&Method::GET, "/nothing"), Match::NotFound));
    }

    #[test]
    fn test_unbalanced_placeholder_fails_compile() {
        let Err(err) = RouteTable::<RadixMatcher>::compile(vec![route(Method::GET, "/users/{id")]) else {
            panic!("expected compile failure");
        };
        assert!(matches!(err, Error::InvalidRoute { ref pattern, .. } if pattern == "/users/{id"));
    }

    #[test]
    fn test_duplicate_pattern_fails_compile() {
        let routes = vec![route(Method::GET, "/a"), route(Method::GET, "/a")];
        assert!(RouteTable::<RadixMatcher>::compile(routes).is_err());
    }

    #[test]
    fn test_same_pattern_under_two_methods() {
        let table = table(&[(Method::GET, "/a"), (Method::POST, "/a")]);
        assert_eq!(table.len(), 2);
        assert!(matches!(table.lookup(&Method::POST, "/a"), Match::Found { .. }));
    }
}
