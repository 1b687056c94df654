//! Built-in middleware.
//!
//! Middleware is an ordinary handler that returns [`Next::Continue`] when it
//! is done with the request. Register it globally with
//! [`App::middleware`](crate::App::middleware) or under a prefix with
//! [`App::middleware_at`](crate::App::middleware_at).
//!
//! - [`trace`]: one `info` event per request with method, path and original URL

use std::time::{Duration, Instant};

use tracing::info;

use crate::handler::Next;
use crate::request::Request;
use crate::response::Response;

/// When the request entered the chain, stored in the request's extensions by
/// [`trace`].
#[derive(Clone, Copy, Debug)]
pub struct Started(pub Instant);

impl Started {
    /// Time since the request entered the chain. The server logs it with
    /// each response.
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// Logs the request and records its start time as [`Started`].
///
/// ```rust,no_run
/// use strand::{App, middleware};
///
/// let app = App::new().middleware(middleware::trace);
/// ```
pub async fn trace(req: &mut Request, _res: &mut Response) -> Next {
    req.extensions_mut().insert(Started(Instant::now()));
    info!(
        method = %req.method(),
        path = req.path(),
        original_url = req.original_url(),
        "request"
    );
    Next::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_start_and_continues() {
        let mut req = Request::get("/x");
        let mut res = Response::new();
        assert!(matches!(trace(&mut req, &mut res).await, Next::Continue));
        assert!(req.extensions().get::<Started>().is_some());
        assert!(!res.is_finished());
    }

    #[tokio::test]
    async fn started_measures_time_in_the_chain() {
        let mut req = Request::get("/x");
        let mut res = Response::new();
        let _ = trace(&mut req, &mut res).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let started = req.extensions().get::<Started>().copied().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
