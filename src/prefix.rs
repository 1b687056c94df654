//! Middleware scoped to a path prefix.
//!
//! `app.middleware_at("/api", auth)` runs `auth` for every request whose first
//! path segment is `/api`. Before the first user handler at a prefix runs,
//! the scope's [`StripPrefix`] rewrite removes the prefix from the request,
//! so scoped middleware sees `/items` for a request to `/api/items`.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Next};
use crate::path;
use crate::request::Request;
use crate::response::Response;

#[derive(Default)]
pub(crate) struct PrefixRegistry {
    scopes: HashMap<String, Scope>,
}

/// The middleware registered under one prefix.
pub(crate) struct Scope {
    /// Runs ahead of `handlers`, unless a mount has already stripped the
    /// prefix for the whole chain.
    pub(crate) rewrite: StripPrefix,
    pub(crate) handlers: Vec<BoxedHandler>,
}

impl PrefixRegistry {
    /// Appends `handlers` under `prefix`, creating the scope the first time
    /// the prefix is seen.
    pub(crate) fn mount(&mut self, prefix: &str, handlers: impl IntoIterator<Item = BoxedHandler>) {
        let prefix = path::lead(prefix).into_owned();
        if path::first_segment(&prefix) != prefix {
            warn!(prefix, "prefix middleware only matches on the first path segment; it will never run");
        }
        let scope = self.scopes.entry(prefix.clone()).or_insert_with(|| {
            trace!(prefix, "new middleware scope");
            Scope { rewrite: StripPrefix { prefix: prefix.clone() }, handlers: Vec::new() }
        });
        scope.handlers.extend(handlers);
    }

    pub(crate) fn lookup(&self, prefix: &str) -> Option<&Scope> {
        self.scopes.get(prefix)
    }
}

/// Rewrites `path` and `url` to drop the scope's prefix, then continues.
///
/// Only a whole leading segment is stripped: `/api` comes off `/api` and
/// `/api/items`, never off `/apix`.
pub(crate) struct StripPrefix {
    prefix: String,
}

impl StripPrefix {
    fn applies_to(&self, path: &str) -> bool {
        path.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

impl ErasedHandler for StripPrefix {
    fn call<'a>(&'a self, req: &'a mut Request, _res: &'a mut Response) -> BoxFuture<'a, Next> {
        if self.applies_to(&req.path) {
            req.strip(&self.prefix);
        }
        Box::pin(std::future::ready(Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Handler;

    async fn scoped(_req: &mut Request, _res: &mut Response) -> Next {
        Next::Continue
    }

    #[test]
    fn scope_is_created_once() {
        let mut registry = PrefixRegistry::default();
        registry.mount("api", [scoped.into_boxed_handler()]);
        registry.mount("/api", [scoped.into_boxed_handler(), scoped.into_boxed_handler()]);

        let scope = registry.lookup("/api").unwrap();
        assert_eq!(scope.handlers.len(), 3);
        assert_eq!(scope.rewrite.prefix, "/api");
        assert!(registry.lookup("/other").is_none());
    }

    #[tokio::test]
    async fn strip_prefix_rewrites_request() {
        let rewrite = StripPrefix { prefix: "/api".into() };
        let mut req = Request::get("/api/items?x=1");
        req.path = "/api/items".into();
        let mut res = Response::new();

        assert!(matches!(rewrite.call(&mut req, &mut res).await, Next::Continue));
        assert_eq!(req.path(), "/items");
        assert_eq!(req.url(), "/items?x=1");
    }

    #[tokio::test]
    async fn strip_prefix_leaves_already_rewritten_paths() {
        let rewrite = StripPrefix { prefix: "/admin".into() };
        let mut req = Request::get("/stats");
        let mut res = Response::new();

        let _ = rewrite.call(&mut req, &mut res).await;
        assert_eq!(req.path(), "/stats");
    }

    #[tokio::test]
    async fn strip_prefix_only_takes_whole_segments() {
        let rewrite = StripPrefix { prefix: "/admin".into() };
        let mut res = Response::new();

        let mut req = Request::get("/adminx");
        let _ = rewrite.call(&mut req, &mut res).await;
        assert_eq!(req.path(), "/adminx");
        assert_eq!(req.url(), "/adminx");

        let mut req = Request::get("/admin");
        let _ = rewrite.call(&mut req, &mut res).await;
        assert_eq!(req.path(), "/");
    }
}
