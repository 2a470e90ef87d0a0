//! hyper transport for a [`Router`].
//!
//! Every connection is served on its own task by hyper-util's auto builder
//! (HTTP/1.1 or HTTP/2, negotiated per connection). Each request body is
//! collected into memory, the request is routed, and whatever the router
//! sends through its oneshot sink becomes the hyper response.
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C the listener is dropped so no further connections
//! are accepted. Open connections finish their in-flight requests, and
//! [`Server::serve`] returns once the last one has closed. Orchestrators
//! such as Kubernetes allow a grace period for exactly this drain.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::table::PathMatcher;

/// Serves a built [`Router`] over TCP.
///
/// ```rust,no_run
/// use switchyard::{Config, Router, Server};
///
/// # async fn run() -> Result<(), switchyard::Error> {
/// let config = Config::from_env()?;
/// let router = Router::new().with_config(&config).routes(|_| {})?;
/// Server::from_config(&config).serve(router).await
/// # }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// A server that will listen on `addr`. Nothing is bound until
    /// [`serve`](Server::serve).
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into() }
    }

    /// A server listening on `config.addr`. The router takes the rest of
    /// the config through [`Router::with_config`].
    pub fn from_config(config: &Config) -> Self {
        Self::bind(config.addr)
    }

    /// Binds, then routes every request through `router` until a shutdown
    /// signal arrives and the open connections have drained.
    ///
    /// Fails only if the address cannot be bound.
    pub async fn serve<M: PathMatcher>(self, router: Router<M>) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, routes = router.table().map_or(0, |t| t.len()), "switchyard listening");

        run(listener, Arc::new(router), shutdown_signal()).await;
        Ok(())
    }
}

/// Accepts on `listener` until `shutdown` resolves, then drains.
async fn run<M: PathMatcher>(listener: TcpListener, router: Arc<Router<M>>, shutdown: impl Future<Output = ()>) {
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Polled first: once the signal fires, queued connections are
            // left unaccepted.
            biased;

            () = &mut shutdown => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(Arc::clone(&router), stream, peer));
                }
                Err(e) => warn!("accept failed: {e}"),
            },

            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    info!(open = connections.len(), "shutting down, draining connections");
    while connections.join_next().await.is_some() {}

    info!("switchyard stopped");
}

async fn serve_connection<M: PathMatcher>(router: Arc<Router<M>>, stream: TcpStream, peer: SocketAddr) {
    debug!(%peer, "connection opened");
    let service = service_fn(move |req| dispatch(Arc::clone(&router), req, peer));

    let served = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await;
    if let Err(e) = served {
        warn!(%peer, "connection closed with error: {e}");
    }
}

/// Routes one hyper request and returns the response the router sent.
///
/// Never fails towards hyper: every outcome is a response. Handler failures
/// surfaced by the router are logged here, after their `500` was produced.
async fn dispatch<M: PathMatcher>(
    router: Arc<Router<M>>,
    req: hyper::Request<Incoming>,
    peer: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(%peer, "failed to read request body: {e}");
            return Ok(Response::empty(StatusCode::BAD_REQUEST).into_hyper());
        }
    };

    let request = Request::from_parts(parts, body, peer);
    let (method, path) = (request.method().clone(), request.path().to_owned());
    let (sink, sent) = oneshot::channel();

    if let Err(failure) = router.handle(request, sink).await {
        error!(%peer, %method, path = %path, code = failure.code(), "handler failed: {failure}");
    }

    let response = sent.await.unwrap_or_else(|_| Response::empty(StatusCode::INTERNAL_SERVER_ERROR));
    Ok(response.into_hyper())
}

/// Resolves on the first SIGTERM or Ctrl-C. Off unix only Ctrl-C is
/// watched. A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl-C"),
            Err(e) => {
                error!("cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM");
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}
