//! # switchyard
//!
//! An HTTP request router for services that sit behind a reverse proxy.
//!
//! ## What it does
//!
//! - Matches `method + path` against a compiled route table. Literal routes
//!   beat parameterised ones, so `/users/me` wins over `/users/{id}`.
//! - Runs router-wide middleware, then group middleware, then
//!   route-specific middleware around the handler. Any layer may answer on
//!   its own and skip the rest.
//! - Answers unmatched requests with `404 Not Found` (plain text) and
//!   failures with a `500` JSON body `{"message": …, "code": …}`.
//! - Restores a path prefix stripped by the proxy and announced in the
//!   `x-micro-web-base-path` header, so routes are declared with the paths
//!   clients actually see.
//!
//! Every request gets exactly one response.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use switchyard::{HandlerError, Request, Response, Router, Server, StatusCode};
//! use switchyard::middleware::Trace;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchyard::Error> {
//!     let app = Router::new()
//!         .with_middleware(Trace)
//!         .routes(|r| {
//!             r.get("/users/{id}", get_user);
//!             r.post("/users", create_user);
//!         })?;
//!
//!     Server::bind(([0, 0, 0, 0], 3000)).serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Result<Response, HandlerError> {
//!     let user: serde_json::Value = serde_json::from_slice(req.body())?;
//!     Ok(Response::json(serde_json::to_vec(&user)?).with_status(StatusCode::CREATED))
//! }
//! ```

mod config;
mod error;
mod handler;
mod proxy;
mod request;
mod response;
mod route;
mod router;
mod server;
mod table;

pub mod middleware;

pub use config::Config;
pub use error::{BoxError, Error, HandlerError};
pub use handler::{Handler, HandlerOutput};
pub use proxy::DEFAULT_BASE_PATH_HEADER;
pub use request::{Request, ServerParams};
pub use response::{IntoResponse, Response, ResponseSink};
pub use route::{RouteCollector, RouteHandle};
pub use router::Router;
pub use server::Server;
pub use table::{Match, Params, PathMatcher, RadixMatcher, Route, RouteTable};

pub use http::{Method, StatusCode, Uri};
