//! The application: registration API and the per-request dispatcher.
//!
//! # How a request is dispatched
//!
//! For every request the dispatcher builds one flat chain:
//!
//! ```text
//! global middleware  →  prefix middleware (if the first segment has any)
//!                    →  one of: route handlers
//!                               mounted application
//!                               not-found handler
//! ```
//!
//! and walks it front to back. Each handler returns a [`Next`]:
//!
//! - `Continue` runs the next link,
//! - `Done` stops,
//! - `Error(e)` calls the error handler, which may itself answer `Continue`
//!   to resume the chain after the failed link.
//!
//! The walk also stops as soon as the response is finished, so a middleware
//! that answers early never needs to know what was queued behind it.
//!
//! A route beats a mounted application: the mount is only consulted when no
//! route matches. Routes and mounts can never share a first segment; that is
//! rejected at registration time.

use std::sync::Arc;

use http::Method;
use tracing::{debug, trace, warn};

use crate::error::{Error, HttpError};
use crate::handler::{
    BoxFuture, BoxedErrorHandler, BoxedHandler, Chain, DefaultErrorHandler, ErasedErrorHandler,
    ErasedHandler, ErrorHandler, Handler, Next, NoMatch,
};
use crate::mount::MountTable;
use crate::path;
use crate::prefix::PrefixRegistry;
use crate::request::Request;
use crate::response::Response;
use crate::router::RouteRegistry;
use crate::server::Server;
use crate::url::{self, PathInfo};

/// An HTTP application.
///
/// Build it once at startup; every builder method takes and returns `self`,
/// so the routing tables cannot change once the app is handed to a
/// [`Server`]. Route and mount registration return `Result` because they can
/// conflict with each other:
///
/// ```rust
/// use strand::{App, Error, Next, Request, Response};
///
/// # async fn show(_: &mut Request, _: &mut Response) -> Next { Next::Done }
/// let admin = App::new().get("/stats", show)?;
///
/// // a route under /admin would make the mount ambiguous
/// let result = App::new()
///     .mount("/admin", admin)?
///     .get("/admin/users", show);
/// assert!(matches!(result, Err(Error::RouteConflict { .. })));
/// # Ok::<(), Error>(())
/// ```
pub struct App {
    wares: Vec<BoxedHandler>,
    scopes: PrefixRegistry,
    routes: RouteRegistry,
    apps: MountTable,
    on_error: BoxedErrorHandler,
    on_no_match: BoxedHandler,
}

/// One link of a request's chain, borrowed from the application.
enum Link<'a> {
    Call(&'a dyn ErasedHandler),
    Delegate(&'a App, PathInfo),
}

impl App {
    pub fn new() -> Self {
        Self {
            wares: Vec::new(),
            scopes: PrefixRegistry::default(),
            routes: RouteRegistry::default(),
            apps: MountTable::default(),
            on_error: Arc::new(DefaultErrorHandler),
            on_no_match: Arc::new(NoMatch),
        }
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// Replaces the error handler.
    ///
    /// The default answers with the error's status (500 when it has none) and
    /// its message (the status reason phrase when it has none).
    pub fn on_error(mut self, handler: impl ErrorHandler) -> Self {
        self.on_error = handler.into_boxed_error_handler();
        self
    }

    /// Replaces the handler that runs when neither a route nor a mounted
    /// application matches.
    ///
    /// The default fails with a 404 [`HttpError`], so it is answered by the
    /// error handler like any other failure.
    pub fn on_no_match(mut self, handler: impl Handler) -> Self {
        self.on_no_match = handler.into_boxed_handler();
        self
    }

    // ── Middleware ────────────────────────────────────────────────────────────

    /// Adds middleware that runs for every request, in registration order.
    pub fn middleware(mut self, handler: impl Handler) -> Self {
        self.wares.push(handler.into_boxed_handler());
        self
    }

    /// Adds middleware that runs only when the request's first path segment
    /// is `prefix`.
    ///
    /// The prefix is stripped from the request before the first scoped
    /// handler runs: middleware at `/api` sees `/items` for `/api/items`.
    /// A prefix of `/` is the same as [`App::middleware`].
    pub fn middleware_at(mut self, prefix: &str, handler: impl Handler) -> Self {
        let prefix = trim_prefix(prefix);
        if prefix == "/" {
            return self.middleware(handler);
        }
        self.scopes.mount(&prefix, [handler.into_boxed_handler()]);
        self
    }

    // ── Sub-applications ──────────────────────────────────────────────────────

    /// Delegates every request under `prefix` to `app`, with the prefix
    /// stripped from the request path.
    ///
    /// Fails when a route of this application already lives under `prefix`,
    /// or when `prefix` is `/` or spans more than one path segment.
    pub fn mount(mut self, prefix: &str, app: App) -> Result<Self, Error> {
        let base = trim_prefix(prefix);
        if base == "/" {
            return Err(Error::InvalidMount {
                base,
                reason: "the root cannot be mounted; register middleware instead",
            });
        }
        if path::first_segment(&base) != base {
            return Err(Error::InvalidMount {
                base,
                reason: "mount prefixes must be a single path segment",
            });
        }
        if let Some(pattern) = self.routes.claimant(&base) {
            return Err(Error::MountConflict { pattern: pattern.to_owned(), base });
        }
        debug!(base, "mounting application");
        self.apps.mount(base, app);
        Ok(self)
    }

    // ── Routes ────────────────────────────────────────────────────────────────

    /// Registers a handler for a method + pattern pair.
    ///
    /// Patterns use `:name` parameters, read back with [`Request::param`]:
    ///
    /// ```rust,no_run
    /// # use strand::{App, Method, Next, Request, Response};
    /// # async fn get_user(_: &mut Request, _: &mut Response) -> Next { Next::Done }
    /// # async fn create_user(_: &mut Request, _: &mut Response) -> Next { Next::Done }
    /// # fn main() -> Result<(), strand::Error> {
    /// App::new()
    ///     .on(Method::GET,  "/users/:id", get_user)?
    ///     .on(Method::POST, "/users",     create_user)?;
    /// # Ok(()) }
    /// ```
    pub fn on(self, method: Method, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.add(Some(method), pattern, vec![handler.into_boxed_handler()])
    }

    /// Registers several handlers that run in order for one route.
    ///
    /// An empty chain is rejected: it could match requests but never answer
    /// them.
    pub fn route(self, method: Method, pattern: &str, chain: Chain) -> Result<Self, Error> {
        if chain.is_empty() {
            return Err(Error::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: "route has no handlers",
            });
        }
        self.add(Some(method), pattern, chain.handlers)
    }

    /// Registers a handler for every method. Method-specific routes win.
    pub fn all(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.add(None, pattern, vec![handler.into_boxed_handler()])
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::GET, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::POST, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::PUT, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::PATCH, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::DELETE, pattern, handler)
    }

    pub fn head(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::HEAD, pattern, handler)
    }

    pub fn options(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.on(Method::OPTIONS, pattern, handler)
    }

    fn add(
        mut self,
        method: Option<Method>,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<Self, Error> {
        let base = path::lead(path::first_segment(pattern)).into_owned();
        if self.apps.contains(&base) {
            return Err(Error::RouteConflict {
                method: method.as_ref().map_or("ALL", Method::as_str).to_owned(),
                pattern: path::lead(pattern).into_owned(),
                base,
            });
        }
        self.routes.register(method, pattern, handlers)?;
        Ok(self)
    }

    // ── Serving ───────────────────────────────────────────────────────────────

    /// Binds `addr` and serves this application until shutdown.
    pub async fn listen(self, addr: &str) -> Result<(), Error> {
        Server::bind(addr)?.serve(self).await
    }

    /// Runs the request through this application's chain.
    ///
    /// Never fails: handler errors are answered by the error handler. The
    /// response is left unfinished only if every handler in the chain
    /// declined to end it.
    pub async fn handle(&self, req: &mut Request, res: &mut Response) {
        self.dispatch(req, res, None).await;
    }

    /// The dispatcher. `info` is present when a parent application delegates
    /// here with the URL already parsed and rewritten.
    fn dispatch<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        info: Option<PathInfo>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut info = info.unwrap_or_else(|| PathInfo::parse(&req.url));
            if req.original_url.is_none() {
                req.original_url = Some(req.url.clone());
            }
            req.path.clone_from(&info.pathname);
            let base = path::first_segment(&req.path).to_owned();

            let route = self.routes.resolve(&req.method, &info.pathname);
            let mount = if route.is_none() { self.apps.lookup(&base) } else { None };

            let mut chain: Vec<Link<'a>> = self.wares.iter().map(|h| Link::Call(h.as_ref())).collect();
            if let Some(scope) = self.scopes.lookup(&base) {
                // a mount strips `base` for the whole chain below
                if mount.is_none() {
                    chain.push(Link::Call(&scope.rewrite));
                }
                chain.extend(scope.handlers.iter().map(|h| Link::Call(h.as_ref())));
            }
            let middleware = chain.len();

            req.search.clone_from(&info.search);
            req.query = url::decode_query(info.query.as_deref());

            if let Some(found) = route {
                req.params = found.params;
                chain.extend(found.handlers.iter().map(|h| Link::Call(h.as_ref())));
            } else if let Some(app) = mount {
                req.strip(&base);
                info.pathname.clone_from(&req.path);
                chain.push(Link::Delegate(app, info));
            } else {
                chain.push(Link::Call(self.on_no_match.as_ref()));
            }

            debug!(method = %req.method, path = %req.path, base, links = chain.len(), "dispatching");

            if middleware == 0 && chain.len() == 1 {
                if let Some(link) = chain.pop() {
                    trace!("single handler, calling it directly");
                    if let Next::Error(err) = Self::invoke(link, req, res).await {
                        self.recover(err, req, res).await;
                    }
                }
                return;
            }

            for link in chain {
                if res.is_finished() {
                    trace!("response finished; skipping the rest of the chain");
                    break;
                }
                match Self::invoke(link, req, res).await {
                    Next::Continue => {}
                    Next::Done => break,
                    Next::Error(err) => {
                        if !self.recover(err, req, res).await {
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn invoke(link: Link<'_>, req: &mut Request, res: &mut Response) -> Next {
        match link {
            Link::Call(handler) => handler.call(req, res).await,
            Link::Delegate(app, info) => {
                trace!(path = %req.path, "delegating to mounted application");
                app.dispatch(req, res, Some(info)).await;
                Next::Done
            }
        }
    }

    /// Hands `err` to the error handler. Returns `true` when the chain should
    /// resume.
    async fn recover(&self, err: HttpError, req: &mut Request, res: &mut Response) -> bool {
        debug!(path = %req.path, error = %err, "handler failed");
        match self.on_error.call(err, req, res).await {
            Next::Continue => true,
            Next::Done => false,
            Next::Error(again) => {
                warn!(error = %again, "error handler failed; answering with the default");
                DefaultErrorHandler::respond(&again, res);
                false
            }
        }
    }
}

impl Default for App {
    fn default() -> Self { Self::new() }
}

/// Normalizes a registration prefix: leading `/`, no trailing `/`.
fn trim_prefix(prefix: &str) -> String {
    path::lead(prefix.trim_end_matches('/')).into_owned()
}
