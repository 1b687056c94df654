//! # strand
//!
//! A minimal HTTP dispatcher. Given a request, strand decides which handlers
//! run and in what order, then runs them one after another.
//!
//! ## The chain
//!
//! Every request walks one flat chain:
//!
//! 1. **Global middleware**, in registration order.
//! 2. **Prefix middleware** registered for the request's first path segment.
//!    The prefix is stripped from the request before it runs.
//! 3. Exactly one of:
//!    - the **route handlers** matching method + path (radix-tree lookup via [`matchit`]),
//!    - a **mounted application** owning the first path segment, which runs
//!      its own chain against the rest of the path,
//!    - the **not-found handler**.
//!
//! Each handler returns a [`Next`]. `Continue` moves on, `Done` stops,
//! `Error` goes to the application's error handler, the single place where
//! failures turn into responses. The chain also stops as soon as a handler
//! ends the response.
//!
//! ## What strand leaves out
//!
//! No templating, sessions, static files, body parsing or timeouts. Put a
//! reverse proxy in front for TLS, rate limiting and body-size limits.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strand::{App, HttpError, Next, Request, Response, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strand::Error> {
//!     let admin = App::new().get("/stats", stats)?;
//!
//!     App::new()
//!         .middleware(middleware::trace)
//!         .middleware_at("/api", require_token)
//!         .get("/api/users/:id", get_user)?
//!         .mount("/admin", admin)?
//!         .listen("0.0.0.0:3000")
//!         .await
//! }
//!
//! async fn require_token(req: &mut Request, _res: &mut Response) -> Next {
//!     match req.header("authorization") {
//!         Some(_) => Next::Continue,
//!         None => Next::error(HttpError::status(401)),
//!     }
//! }
//!
//! async fn get_user(req: &mut Request, res: &mut Response) -> Next {
//!     let id = req.param("id").unwrap_or("unknown");
//!     res.json(format!(r#"{{"id":"{id}"}}"#).into_bytes());
//!     Next::Done
//! }
//!
//! async fn stats(_req: &mut Request, res: &mut Response) -> Next {
//!     res.text("all good");
//!     Next::Done
//! }
//! ```

mod app;
mod error;
mod handler;
mod mount;
mod prefix;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod path;
pub mod url;

pub use app::App;
pub use error::{Error, HttpError};
pub use handler::{Chain, ErrorHandler, ErrorHandlerFn, Handler, HandlerFn, Next};
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::Response;
pub use server::Server;
pub use url::PathInfo;
