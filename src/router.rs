//! Radix-tree route registry.
//!
//! One tree per HTTP method, plus one for routes that accept any method.
//! O(path-length) lookup via [`matchit`].
//!
//! # Pattern syntax
//!
//! | Pattern | Matches | Params |
//! |---|---|---|
//! | `/users` | `/users`, `/users/` | |
//! | `/users/:id` | `/users/42` | `id = "42"` |
//! | `/users/:id?` | `/users`, `/users/42` | `id` when present |
//! | `/files/*` | `/files/a/b.txt` | `wild = "a/b.txt"` |
//!
//! Optional parameters must come last. Each pattern is compiled to one or
//! more matchit routes (`:id` → `{id}`, `*` → `{*wild}`).

use std::collections::HashMap;

use http::Method;
use matchit::Router as MatchitRouter;
use tracing::trace;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::path;

/// Handlers and params of a resolved route, borrowed from the registry.
pub(crate) struct Found<'a> {
    pub(crate) handlers: &'a [BoxedHandler],
    pub(crate) params: HashMap<String, String>,
}

#[derive(Default)]
pub(crate) struct RouteRegistry {
    routes: HashMap<Method, MatchitRouter<Vec<BoxedHandler>>>,
    /// Routes registered through `App::all`.
    any: MatchitRouter<Vec<BoxedHandler>>,
    /// First segment → first pattern registered under it. Mounts are checked
    /// against this.
    claimed: HashMap<String, String>,
}

impl RouteRegistry {
    /// The pattern that claims `base`, if any route lives under it.
    pub(crate) fn claimant(&self, base: &str) -> Option<&str> {
        self.claimed.get(base).map(String::as_str)
    }

    /// Inserts `handlers` for `method` (every method when `None`).
    ///
    /// The caller has already checked `pattern` against mounted applications.
    pub(crate) fn register(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        handlers: Vec<BoxedHandler>,
    ) -> Result<(), Error> {
        let compiled = compile(pattern)?;
        let tree = match method {
            Some(m) => self.routes.entry(m).or_default(),
            None => &mut self.any,
        };
        for route in compiled {
            tree.insert(route.as_str(), handlers.clone())
                .map_err(|source| Error::InvalidRoute { pattern: pattern.to_owned(), source })?;
        }

        let base = path::lead(path::first_segment(pattern)).into_owned();
        self.claimed.entry(base).or_insert_with(|| pattern.to_owned());
        Ok(())
    }

    /// Finds the handlers for `method` + `path`.
    ///
    /// Order: the method's own tree, then `GET` for a `HEAD` request, then the
    /// any-method tree. A trailing slash is tolerated.
    pub(crate) fn resolve(&self, method: &Method, path: &str) -> Option<Found<'_>> {
        let found = self.lookup(method, path).or_else(|| {
            let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty())?;
            self.lookup(method, trimmed)
        });
        trace!(%method, path, matched = found.is_some(), "route lookup");
        found
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<Found<'_>> {
        let head_as_get = (*method == Method::HEAD).then(|| self.routes.get(&Method::GET)).flatten();
        [self.routes.get(method), head_as_get, Some(&self.any)]
            .into_iter()
            .flatten()
            .find_map(|tree| tree.at(path).ok())
            .map(|matched| Found {
                handlers: matched.value.as_slice(),
                params: matched.params.iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect(),
            })
    }
}

// ── Pattern compilation ───────────────────────────────────────────────────────

/// Translates a `:param` pattern into the matchit routes that implement it.
fn compile(pattern: &str) -> Result<Vec<String>, Error> {
    let invalid = |reason| Error::InvalidPattern { pattern: pattern.to_owned(), reason };
    let lead = path::lead(pattern);

    let mut required = Vec::new();
    let mut optional = Vec::new();
    for segment in lead[1..].split('/') {
        let (text, is_optional) = if segment == "*" {
            ("{*wild}".to_owned(), false)
        } else if let Some(name) = segment.strip_prefix(':') {
            let (name, is_optional) = match name.strip_suffix('?') {
                Some(name) => (name, true),
                None => (name, false),
            };
            if name.is_empty() {
                return Err(invalid("parameter without a name"));
            }
            (format!("{{{name}}}"), is_optional)
        } else {
            (segment.replace('{', "{{").replace('}', "}}"), false)
        };

        if is_optional {
            optional.push(text);
        } else if optional.is_empty() {
            required.push(text);
        } else {
            return Err(invalid("optional parameters must come last"));
        }
    }

    let mut routes = Vec::with_capacity(optional.len() + 1);
    let mut segments = required;
    routes.push(format!("/{}", segments.join("/")));
    for text in optional {
        segments.push(text);
        routes.push(format!("/{}", segments.join("/")));
    }
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, Next};
    use crate::{Request, Response};

    async fn noop(_req: &mut Request, _res: &mut Response) -> Next {
        Next::Continue
    }

    fn one() -> Vec<BoxedHandler> {
        vec![noop.into_boxed_handler()]
    }

    #[test]
    fn compiles_params_wildcards_and_literals() {
        assert_eq!(compile("/users/:id").unwrap(), ["/users/{id}"]);
        assert_eq!(compile("users").unwrap(), ["/users"]);
        assert_eq!(compile("/").unwrap(), ["/"]);
        assert_eq!(compile("/files/*").unwrap(), ["/files/{*wild}"]);
        assert_eq!(compile("/raw/{x}").unwrap(), ["/raw/{{x}}"]);
        assert_eq!(
            compile("/posts/:year?/:slug?").unwrap(),
            ["/posts", "/posts/{year}", "/posts/{year}/{slug}"]
        );
        assert_eq!(compile("/:id?").unwrap(), ["/", "/{id}"]);
    }

    #[test]
    fn rejects_bad_optional_and_empty_names() {
        assert!(matches!(compile("/a/:id?/b"), Err(Error::InvalidPattern { .. })));
        assert!(matches!(compile("/a/:"), Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn resolves_params_and_trailing_slash() {
        let mut routes = RouteRegistry::default();
        routes.register(Some(Method::GET), "/users/:id", one()).unwrap();

        let found = routes.resolve(&Method::GET, "/users/42").unwrap();
        assert_eq!(found.handlers.len(), 1);
        assert_eq!(found.params["id"], "42");

        assert!(routes.resolve(&Method::GET, "/users/42/").is_some());
        assert!(routes.resolve(&Method::POST, "/users/42").is_none());
        assert!(routes.resolve(&Method::GET, "/users").is_none());
    }

    #[test]
    fn head_falls_back_to_get_and_all_matches_anything() {
        let mut routes = RouteRegistry::default();
        routes.register(Some(Method::GET), "/page", one()).unwrap();
        routes.register(None, "/ping", one()).unwrap();

        assert!(routes.resolve(&Method::HEAD, "/page").is_some());
        assert!(routes.resolve(&Method::DELETE, "/ping").is_some());
        assert!(routes.resolve(&Method::DELETE, "/page").is_none());
    }

    #[test]
    fn wildcard_captures_rest() {
        let mut routes = RouteRegistry::default();
        routes.register(Some(Method::GET), "/files/*", one()).unwrap();
        let found = routes.resolve(&Method::GET, "/files/a/b.txt").unwrap();
        assert_eq!(found.params["wild"], "a/b.txt");
    }

    #[test]
    fn duplicate_route_is_rejected() {
        let mut routes = RouteRegistry::default();
        routes.register(Some(Method::GET), "/dup", one()).unwrap();
        let err = routes.register(Some(Method::GET), "/dup", one()).unwrap_err();
        assert!(matches!(err, Error::InvalidRoute { .. }));
    }

    #[test]
    fn records_first_segment_claims() {
        let mut routes = RouteRegistry::default();
        routes.register(Some(Method::GET), "users/:id", one()).unwrap();
        routes.register(Some(Method::POST), "/users", one()).unwrap();
        assert_eq!(routes.claimant("/users"), Some("users/:id"));
        assert_eq!(routes.claimant("/admin"), None);
    }
}
