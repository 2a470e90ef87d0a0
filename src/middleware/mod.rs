//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: tracing, request-id injection, authentication.
//!
//! # Order
//!
//! For every request the router assembles one chain:
//!
//! ```text
//! router-wide middleware   (Router::with_middleware, registration order)
//!   → group middleware     (RouteCollector::middleware, outer group first)
//!     → route middleware   (RouteHandle::with, registration order)
//!       → handler
//! ```
//!
//! Each stage receives a [`Next`] and decides whether to call it. Not calling
//! it short-circuits: inner stages and the handler never run, and the stage's
//! own response is sent. `Next::run` consumes `next`, so a stage cannot run
//! the rest of the chain twice.
//!
//! # Failures
//!
//! A stage resolves to [`Outcome`]. An `Err` from further in propagates out
//! through `?`, skipping the post-processing of the stages it passes, and the
//! router answers it with `500`. A stage may also match on the `Err` and
//! recover with a response of its own.
//!
//! ```rust
//! use switchyard::middleware::{self, Next};
//! use switchyard::{Request, Response, StatusCode};
//!
//! let require_token = middleware::from_fn(|req: Request, next: Next| async move {
//!     if req.header("authorization").is_none() {
//!         return Ok(Response::empty(StatusCode::UNAUTHORIZED));
//!     }
//!     next.run(req).await
//! });
//! ```

mod trace;

use std::future::Future;
use std::sync::Arc;

pub use crate::handler::{BoxFuture, Outcome};
pub use trace::Trace;

use crate::handler::BoxedHandler;
use crate::request::Request;

/// A unit of request/response processing in the chain.
pub trait Middleware: Send + Sync + 'static {
    /// Processes `req`, usually by awaiting `next.run(req)` somewhere inside.
    fn call<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Outcome>;
}

/// The rest of the chain, handed to each middleware.
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    position: usize,
    handler: BoxedHandler,
}

impl Next {
    /// A chain that runs `chain` in order, then `handler`.
    pub(crate) fn new(chain: Arc<[Arc<dyn Middleware>]>, handler: BoxedHandler) -> Self {
        Self { chain, position: 0, handler }
    }

    /// Runs the next stage: the following middleware, or the handler once
    /// the middleware are exhausted.
    pub fn run(self, req: Request) -> BoxFuture<'static, Outcome> {
        let link = self.chain.get(self.position).cloned();
        match link {
            Some(mw) => {
                let next = Self {
                    chain: self.chain,
                    position: self.position + 1,
                    handler: self.handler,
                };
                Box::pin(async move { mw.call(req, next).await })
            }
            None => self.handler.call(req),
        }
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Middleware built from an async closure. See [`from_fn`].
pub struct FromFn<F>(F);

/// Turns `async |req, next| -> Outcome` into [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    FromFn(f)
}

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn call<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Outcome> {
        Box::pin((self.0)(req, next))
    }
}
