//! Minimal switchyard example: a small user API mounted behind a proxy.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/me
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/admin/users/42 -H 'authorization: Bearer demo'
//!
//! Behind a gateway that strips `/v1`:
//!   curl http://localhost:3000/users/42 -H 'x-micro-web-base-path: /v1'
//! matches the `/v1/users/{id}` route.

use serde::Deserialize;
use switchyard::middleware::{self, Next, Trace};
use switchyard::{Config, HandlerError, Request, Response, Router, Server, StatusCode};

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let require_token = middleware::from_fn(|req: Request, next: Next| async move {
        if req.header("authorization") != Some("Bearer demo") {
            return Ok(Response::text("missing token").with_status(StatusCode::UNAUTHORIZED));
        }
        next.run(req).await
    });

    let app = Router::new()
        .with_middleware(Trace)
        .with_config(&config)
        .routes(|r| {
            r.get("/users/me", current_user);
            r.get("/users/{id}", get_user);
            r.post("/users", create_user);
            r.group("/admin", |admin| {
                admin.middleware(require_token);
                admin.delete("/users/{id}", delete_user);
            });
            r.group("/v1", |v1| {
                v1.get("/users/{id}", get_user);
            });
        })?;

    Server::from_config(&config).serve(app).await?;
    Ok(())
}

// GET /users/me beats /users/{id}: literal routes are tried first.
async fn current_user(_req: Request) -> Response {
    Response::json(r#"{"id":"1","name":"me"}"#)
}

async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// A malformed body fails the handler; the router answers with a JSON 500.
async fn create_user(req: Request) -> Result<Response, HandlerError> {
    let user: NewUser = serde_json::from_slice(req.body())?;
    let body = serde_json::to_vec(&serde_json::json!({ "id": "99", "name": user.name }))?;
    Ok(Response::json(body)
        .with_status(StatusCode::CREATED)
        .with_header("location", "/users/99"))
}

async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}
