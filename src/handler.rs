//! Handlers and their type erasure.
//!
//! A route table stores handlers of many concrete types side by side, so
//! each one is boxed behind [`ErasedHandler`] when it is registered. From
//! then on a request costs one virtual call and one boxed future; handlers
//! are never looked up by name.
//!
//! ```text
//! r.get("/users/{id}", show)      show: async fn(Request) -> R
//!   → show.into_boxed_handler()   Arc<FnHandler<show>> as BoxedHandler
//!   → handler.call(req)           show(req).await.into_outcome()
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::error::HandlerError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future.
///
/// `Send` lets tokio move it across worker threads; the lifetime lets
/// middleware borrow `&self` while it runs.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler or middleware stage resolves to: a response to send, or a
/// failure the router will answer with `500`.
pub type Outcome = Result<Response, HandlerError>;

/// Object-safe face of a handler. Public only because
/// [`Handler::into_boxed_handler`] names it.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static, Outcome>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── HandlerOutput ─────────────────────────────────────────────────────────────

/// Values a handler may return.
///
/// Plain responses always succeed. `Result<T, E>` lets a handler fail with
/// anything convertible into a [`HandlerError`]:
///
/// ```rust
/// use switchyard::{HandlerError, Request, Response};
///
/// async fn ok(_req: Request) -> &'static str { "fine" }
///
/// async fn maybe(req: Request) -> Result<Response, HandlerError> {
///     let id: u64 = req.param("id").unwrap_or("").parse()
///         .map_err(|_| HandlerError::new("id must be numeric").with_code(422))?;
///     Ok(Response::text(format!("user {id}")))
/// }
/// ```
pub trait HandlerOutput {
    fn into_outcome(self) -> Outcome;
}

impl HandlerOutput for Response {
    fn into_outcome(self) -> Outcome { Ok(self) }
}

impl HandlerOutput for StatusCode {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl HandlerOutput for String {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl HandlerOutput for &'static str {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl<T, E> HandlerOutput for Result<T, E>
where
    T: IntoResponse,
    E: Into<HandlerError>,
{
    fn into_outcome(self) -> Outcome {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Anything that can serve a route.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) with the shape:
///
/// ```text
/// async fn name(req: Request) -> impl HandlerOutput
/// ```
///
/// Handlers that need state capture it, e.g. `move |req| db.clone().load(req)`.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerOutput + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerOutput + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerOutput + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Outcome> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Uri};

    fn request() -> Request {
        Request::new(Method::GET, Uri::from_static("/"))
    }

    async fn text(_req: Request) -> &'static str {
        "hello"
    }

    async fn failing(_req: Request) -> Result<Response, HandlerError> {
        Err(HandlerError::new("nope").with_code(7))
    }

    async fn io_failing(_req: Request) -> Result<String, std::io::Error> {
        Err(std::io::Error::from_raw_os_error(13))
    }

    #[tokio::test]
    async fn test_plain_output_is_ok() {
        let res = text.into_boxed_handler().call(request()).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), b"hello");
    }

    #[tokio::test]
    async fn test_err_output_is_failure() {
        let err = failing.into_boxed_handler().call(request()).await.unwrap_err();
        assert_eq!(err.message(), "nope");
        assert_eq!(err.code(), 7);
    }

    #[tokio::test]
    async fn test_foreign_error_converts() {
        let err = io_failing.into_boxed_handler().call(request()).await.unwrap_err();
        assert_eq!(err.code(), 13);
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let greeting = String::from("hi");
        let handler = move |_req: Request| {
            let greeting = greeting.clone();
            async move { Response::text(greeting) }
        };
        let res = handler.into_boxed_handler().call(request()).await.unwrap();
        assert_eq!(res.body(), b"hi");
    }
}
