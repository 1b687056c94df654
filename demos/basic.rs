//! Minimal strand example: middleware, a scoped API, a mounted admin app and
//! a custom error handler.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/users/42 -H 'authorization: token'
//!   curl http://localhost:3000/api/users/42            # 401 from the API scope
//!   curl -X POST http://localhost:3000/api/users -H 'authorization: token' -d '{"name":"alice"}'
//!   curl http://localhost:3000/admin/stats?range=7d    # served by the mounted app
//!   curl http://localhost:3000/nowhere                 # 404 as JSON

use serde_json::json;
use strand::{App, HttpError, Next, Request, Response, StatusCode, middleware};

#[tokio::main]
async fn main() -> Result<(), strand::Error> {
    tracing_subscriber::fmt::init();

    let admin = App::new().get("/stats", stats)?;

    App::new()
        .middleware(middleware::trace)
        .middleware_at("/api", require_token)
        .get("/api/users/:id", get_user)?
        .post("/api/users", create_user)?
        .delete("/api/users/:id", delete_user)?
        .mount("/admin", admin)?
        .on_error(json_error)
        .listen("0.0.0.0:3000")
        .await
}

// Runs for every /api request, after the `/api` prefix was stripped.
async fn require_token(req: &mut Request, _res: &mut Response) -> Next {
    match req.header("authorization") {
        Some(_) => Next::Continue,
        None => Next::error(HttpError::new(401, "missing authorization header")),
    }
}

// GET /api/users/:id
async fn get_user(req: &mut Request, res: &mut Response) -> Next {
    let id = req.param("id").unwrap_or("unknown");
    res.json(json!({ "id": id, "name": "alice" }).to_string().into_bytes());
    Next::Done
}

// POST /api/users
//
// req.body() is &[u8]; parse with serde_json::from_slice or anything else.
async fn create_user(req: &mut Request, res: &mut Response) -> Next {
    if req.body().is_empty() {
        return Next::error(HttpError::new(400, "empty body"));
    }
    res.set_status(StatusCode::CREATED)
        .header("location", "/api/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#.as_bytes().to_vec());
    Next::Done
}

// DELETE /api/users/:id → 204 No Content
async fn delete_user(_req: &mut Request, res: &mut Response) -> Next {
    res.set_status(StatusCode::NO_CONTENT).end(b"");
    Next::Done
}

// GET /admin/stats (the mounted app sees `/stats`)
async fn stats(req: &mut Request, res: &mut Response) -> Next {
    let range = req.query("range").unwrap_or("1d");
    res.text(format!("stats for {range}, requested as {}", req.original_url()));
    Next::Done
}

async fn json_error(err: HttpError, _req: &mut Request, res: &mut Response) -> Next {
    let status = err
        .code()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = err
        .message()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_owned());
    res.set_status(status)
        .json(json!({ "error": message }).to_string().into_bytes());
    Next::Done
}
