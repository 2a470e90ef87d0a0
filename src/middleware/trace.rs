//! Per-request tracing span with method, path, status, and latency.

use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

use super::{BoxFuture, Middleware, Next, Outcome};
use crate::request::Request;

/// Wraps the rest of the chain in a `request` span and logs how it ended.
///
/// Register it first so the span covers every other stage:
///
/// ```rust
/// use switchyard::{Router, middleware::Trace};
///
/// let router = Router::new().with_middleware(Trace);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn call<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Outcome> {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        Box::pin(
            async move {
                let started = Instant::now();
                let outcome = next.run(req).await;
                let latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
                match &outcome {
                    Ok(res) => info!(status = res.status().as_u16(), latency_us, "request completed"),
                    Err(e) => warn!(code = e.code(), latency_us, "request failed: {e}"),
                }
                outcome
            }
            .instrument(span),
        )
    }
}
