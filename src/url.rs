//! Request-target parsing.
//!
//! The dispatcher only needs three things from a URL: the path to route on,
//! the raw search string, and the decoded query. Nothing is percent-decoded
//! except the query.

use std::collections::HashMap;

use tracing::debug;

/// A request target split into its routing-relevant parts.
///
/// Computed once per request. When a request is delegated to a mounted
/// application the parent hands its (rewritten) `PathInfo` down so the child
/// does not parse the URL again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathInfo {
    /// Everything before `?`, never empty.
    pub pathname: String,
    /// `?` and everything after it, if present.
    pub search: Option<String>,
    /// Everything after `?`, if present.
    pub query: Option<String>,
}

impl PathInfo {
    pub fn parse(url: &str) -> Self {
        // Fragments never reach a server, but a hand-built request may carry one.
        let url = url.split_once('#').map_or(url, |(head, _)| head);
        let (pathname, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        Self {
            pathname: if pathname.is_empty() { "/".to_owned() } else { pathname.to_owned() },
            search: query.map(|q| format!("?{q}")),
            query: query.map(str::to_owned),
        }
    }
}

/// Decodes a query string into a multi-map.
///
/// Repeated keys keep every value in order: `a=1&a=2` → `{"a": ["1", "2"]}`.
pub fn decode_query(query: Option<&str>) -> HashMap<String, Vec<String>> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return HashMap::new();
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_else(|e| {
        debug!(query, "ignoring undecodable query string: {e}");
        Vec::new()
    });

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in pairs {
        map.entry(key).or_default().push(value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_path_and_query() {
        let info = PathInfo::parse("/users/42?fields=name&x=1");
        assert_eq!(info.pathname, "/users/42");
        assert_eq!(info.search.as_deref(), Some("?fields=name&x=1"));
        assert_eq!(info.query.as_deref(), Some("fields=name&x=1"));
    }

    #[test]
    fn missing_query_and_empty_path() {
        let info = PathInfo::parse("/plain");
        assert_eq!(info.search, None);
        assert_eq!(info.query, None);
        assert_eq!(PathInfo::parse("").pathname, "/");
        assert_eq!(PathInfo::parse("?a=1").pathname, "/");
    }

    #[test]
    fn drops_fragment() {
        let info = PathInfo::parse("/doc?page=2#intro");
        assert_eq!(info.pathname, "/doc");
        assert_eq!(info.query.as_deref(), Some("page=2"));
    }

    #[test]
    fn repeated_keys_collect_in_order() {
        let q = decode_query(Some("tag=a&tag=b&name=J%C3%B6rg+K"));
        assert_eq!(q["tag"], vec!["a", "b"]);
        assert_eq!(q["name"], vec!["Jörg K"]);
        assert!(decode_query(None).is_empty());
        assert!(decode_query(Some("")).is_empty());
    }
}
