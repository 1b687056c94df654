//! Handler traits, type erasure and the [`Next`] control signal.
//!
//! # What a handler looks like
//!
//! Every link in a request's chain (global middleware, prefix middleware,
//! route handlers, the not-found handler) has the same shape:
//!
//! ```text
//! async fn name(req: &mut Request, res: &mut Response) -> Next
//! ```
//!
//! The request and response are borrowed, not moved: the dispatcher owns them
//! for the whole chain and lends them to one handler at a time. The returned
//! [`Next`] tells the dispatcher what to do afterwards.
//!
//! # How async handlers are stored
//!
//! Registries hold handlers of different concrete types in one `Vec`, so each
//! handler is wrapped and stored behind `Arc<dyn ErasedHandler>`:
//!
//! ```text
//! async fn auth(req, res) -> Next { … }       ← user writes this
//!        ↓ app.middleware(auth)
//! auth.into_boxed_handler()                   ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(auth))                   ← stored as BoxedHandler
//!        ↓
//! handler.call(&mut req, &mut res)            ← one vtable dispatch per link
//! ```
//!
//! An `async fn` that borrows its arguments returns a future whose type
//! mentions those borrows' lifetime. `Fn(&mut Request, &mut Response) -> Fut`
//! cannot name such a future, so the [`HandlerFn`] helper trait introduces the
//! lifetime explicitly and [`Handler`] requires it for every lifetime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::HttpError;
use crate::request::Request;
use crate::response::Response;

// ── Control signal ────────────────────────────────────────────────────────────

/// What the dispatcher does once a handler returns.
#[derive(Debug)]
#[must_use = "the dispatcher needs the signal to decide what runs next"]
pub enum Next {
    /// Run the next handler in the chain.
    Continue,
    /// Hand the error to the application's error handler. Nothing else in the
    /// chain runs unless the error handler answers [`Next::Continue`].
    Error(HttpError),
    /// Stop here. The handler took responsibility for the response.
    Done,
}

impl Next {
    /// Shorthand for `Next::Error(err.into())`.
    pub fn error(err: impl Into<HttpError>) -> Self {
        Self::Error(err.into())
    }
}

impl<E: Into<HttpError>> From<Result<(), E>> for Next {
    /// `Ok(())` continues the chain, `Err(e)` fails it.
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Continue,
            Err(e) => Self::Error(e.into()),
        }
    }
}

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future borrowing the request for `'a`.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Internal dispatch interface for chain links.
///
/// `#[doc(hidden)] pub` because it appears in the public [`BoxedHandler`] alias.
#[doc(hidden)]
pub trait ErasedHandler: Send + Sync + 'static {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, Next>;
}

/// A type-erased handler, shared by every request that reaches it.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Internal dispatch interface for error handlers.
#[doc(hidden)]
pub trait ErasedErrorHandler: Send + Sync + 'static {
    fn call<'a>(
        &'a self,
        err: HttpError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Next>;
}

#[doc(hidden)]
pub type BoxedErrorHandler = Arc<dyn ErasedErrorHandler>;

// ── Lifetime helpers ──────────────────────────────────────────────────────────

/// `Fn(&'a mut Request, &'a mut Response) -> impl Future + 'a`, spelled out so
/// it can be required for every `'a`.
///
/// Implemented automatically for any `async fn` with the handler signature.
pub trait HandlerFn<'a>: Send + Sync + 'static {
    type Future: Future<Output = Next> + Send + 'a;

    fn call(&self, req: &'a mut Request, res: &'a mut Response) -> Self::Future;
}

impl<'a, F, Fut> HandlerFn<'a> for F
where
    F: Fn(&'a mut Request, &'a mut Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Next> + Send + 'a,
{
    type Future = Fut;

    fn call(&self, req: &'a mut Request, res: &'a mut Response) -> Fut {
        self(req, res)
    }
}

/// The error-handler counterpart of [`HandlerFn`].
pub trait ErrorHandlerFn<'a>: Send + Sync + 'static {
    type Future: Future<Output = Next> + Send + 'a;

    fn call(&self, err: HttpError, req: &'a mut Request, res: &'a mut Response) -> Self::Future;
}

impl<'a, F, Fut> ErrorHandlerFn<'a> for F
where
    F: Fn(HttpError, &'a mut Request, &'a mut Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Next> + Send + 'a,
{
    type Future = Fut;

    fn call(&self, err: HttpError, req: &'a mut Request, res: &'a mut Response) -> Fut {
        self(err, req, res)
    }
}

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` with
/// the signature:
///
/// ```text
/// async fn name(req: &mut Request, res: &mut Response) -> Next
/// ```
pub trait Handler: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

impl<F> Handler for F
where
    F: for<'a> HandlerFn<'a>,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Implemented for every valid error handler:
///
/// ```text
/// async fn name(err: HttpError, req: &mut Request, res: &mut Response) -> Next
/// ```
///
/// Returning [`Next::Continue`] resumes the chain after the handler that
/// failed. Returning [`Next::Error`] again is answered by the built-in
/// formatting and ends the request.
pub trait ErrorHandler: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_error_handler(self) -> BoxedErrorHandler;
}

impl<F> ErrorHandler for F
where
    F: for<'a> ErrorHandlerFn<'a>,
{
    fn into_boxed_error_handler(self) -> BoxedErrorHandler {
        Arc::new(FnErrorHandler(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

/// Bridges a typed handler to the trait-object world.
struct FnHandler<F>(F);

impl<F> ErasedHandler for FnHandler<F>
where
    F: for<'a> HandlerFn<'a>,
{
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, Next> {
        Box::pin(HandlerFn::call(&self.0, req, res))
    }
}

struct FnErrorHandler<F>(F);

impl<F> ErasedErrorHandler for FnErrorHandler<F>
where
    F: for<'a> ErrorHandlerFn<'a>,
{
    fn call<'a>(
        &'a self,
        err: HttpError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Next> {
        Box::pin(ErrorHandlerFn::call(&self.0, err, req, res))
    }
}

// ── Built-in handlers ─────────────────────────────────────────────────────────

/// The default error handler.
///
/// Status comes from the error (500 when absent). The body is the error's
/// message, or the status reason phrase when there is none.
pub(crate) struct DefaultErrorHandler;

impl DefaultErrorHandler {
    pub(crate) fn respond(err: &HttpError, res: &mut Response) {
        if res.is_finished() {
            return;
        }
        let status = err.status_or_500();
        res.set_status(status);
        let body = err
            .message()
            .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_owned());
        res.text(body);
    }
}

impl ErasedErrorHandler for DefaultErrorHandler {
    fn call<'a>(
        &'a self,
        err: HttpError,
        _req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Next> {
        Self::respond(&err, res);
        Box::pin(std::future::ready(Next::Done))
    }
}

/// The default not-found handler: a synthetic 404 routed through the error
/// handler, so custom error formatting applies to it as well.
pub(crate) struct NoMatch;

impl ErasedHandler for NoMatch {
    fn call<'a>(&'a self, _req: &'a mut Request, _res: &'a mut Response) -> BoxFuture<'a, Next> {
        Box::pin(std::future::ready(Next::Error(HttpError::status(404))))
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An ordered list of handlers registered together under one route.
///
/// ```rust,no_run
/// # use strand::{App, Chain, Method, Next, Request, Response};
/// # async fn authenticate(_: &mut Request, _: &mut Response) -> Next { Next::Continue }
/// # async fn load_user(_: &mut Request, _: &mut Response) -> Next { Next::Continue }
/// # async fn show_user(_: &mut Request, _: &mut Response) -> Next { Next::Done }
/// # fn main() -> Result<(), strand::Error> {
/// let app = App::new().route(
///     Method::GET,
///     "/users/:id",
///     Chain::new().then(authenticate).then(load_user).then(show_user),
/// )?;
/// # Ok(()) }
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    pub(crate) handlers: Vec<BoxedHandler>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler. Handlers run in the order they were added.
    pub fn then(mut self, handler: impl Handler) -> Self {
        self.handlers.push(handler.into_boxed_handler());
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pass(_req: &mut Request, _res: &mut Response) -> Next {
        Next::Continue
    }

    async fn finish(_req: &mut Request, res: &mut Response) -> Next {
        res.text("done");
        Next::Done
    }

    #[tokio::test]
    async fn async_fns_erase_to_handlers() {
        let handlers = [pass.into_boxed_handler(), finish.into_boxed_handler()];
        let mut req = Request::get("/");
        let mut res = Response::new();
        assert!(matches!(handlers[0].call(&mut req, &mut res).await, Next::Continue));
        assert!(matches!(handlers[1].call(&mut req, &mut res).await, Next::Done));
        assert!(res.is_finished());
    }

    #[tokio::test]
    async fn default_error_handler_uses_reason_phrase() {
        let mut req = Request::get("/");
        let mut res = Response::new();
        let signal = DefaultErrorHandler.call(HttpError::status(404), &mut req, &mut res).await;
        assert!(matches!(signal, Next::Done));
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body(), b"Not Found");
    }

    #[tokio::test]
    async fn default_error_handler_prefers_message() {
        let mut req = Request::get("/");
        let mut res = Response::new();
        let _ = DefaultErrorHandler.call(HttpError::msg("db down"), &mut req, &mut res).await;
        assert_eq!(res.status_code(), 500);
        assert_eq!(res.body(), b"db down");
    }

    #[test]
    fn result_converts_to_signal() {
        let ok: Result<(), std::fmt::Error> = Ok(());
        assert!(matches!(Next::from(ok), Next::Continue));
        let err: Result<(), std::fmt::Error> = Err(std::fmt::Error);
        assert!(matches!(Next::from(err), Next::Error(_)));
    }

    #[test]
    fn chain_keeps_insertion_order_and_duplicates() {
        let chain = Chain::new().then(pass).then(pass).then(finish);
        assert_eq!(chain.len(), 3);
        assert!(!chain.is_empty());
    }
}
