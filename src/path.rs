//! Path string helpers shared by the registries and the dispatcher.
//!
//! Everything here works on raw (still percent-encoded) path strings and
//! never allocates unless it has to add a leading slash.

use std::borrow::Cow;

/// Ensures `s` starts with `/`.
///
/// ```text
/// lead("a")  → "/a"
/// lead("/d") → "/d"
/// lead("")   → "/"
/// ```
pub fn lead(s: &str) -> Cow<'_, str> {
    if s.starts_with('/') {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("/{s}"))
    }
}

/// Returns the first segment of `s`: everything before the second `/`.
///
/// This is the routing key shared by prefix middleware, mounted applications
/// and route conflict detection.
///
/// ```text
/// first_segment("/pqr/mnb")     → "/pqr"
/// first_segment("abc/test/xyz") → "abc"
/// first_segment("/pqr")         → "/pqr"
/// ```
pub fn first_segment(s: &str) -> &str {
    // A `/` at index 1 (as in "//a") does not open a new segment.
    match s.get(1..).and_then(|rest| rest.find('/')) {
        Some(i) if i > 0 => &s[..=i],
        _ => s,
    }
}

/// Cuts `prefix.len()` bytes off the front of `path`, falling back to `/`
/// when nothing is left.
///
/// The caller is expected to have matched `prefix` against `path` already;
/// no check is made here.
pub fn strip_prefix(prefix: &str, path: &str) -> String {
    match path.get(prefix.len()..) {
        Some(rest) if !rest.is_empty() => rest.to_owned(),
        _ => "/".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_adds_missing_slash() {
        assert_eq!(lead("a"), "/a");
        assert_eq!(lead("/d"), "/d");
        assert_eq!(lead(""), "/");
        assert!(matches!(lead("/x"), Cow::Borrowed(_)));
    }

    #[test]
    fn first_segment_stops_at_second_slash() {
        assert_eq!(first_segment("/pqr/mnb"), "/pqr");
        assert_eq!(first_segment("abc/test/xyz"), "abc");
        assert_eq!(first_segment("/pqr"), "/pqr");
        assert_eq!(first_segment("/"), "/");
        assert_eq!(first_segment(""), "");
        assert_eq!(first_segment("//a"), "//a");
        assert_eq!(first_segment("/api/"), "/api");
    }

    #[test]
    fn strip_prefix_removes_leading_bytes() {
        assert_eq!(strip_prefix("/api", "/api/items"), "/items");
        assert_eq!(strip_prefix("/api", "/api/items?x=1"), "/items?x=1");
        assert_eq!(strip_prefix("/api", "/api"), "/");
        assert_eq!(strip_prefix("/api", "/a"), "/");
    }

    #[test]
    fn strip_prefix_holds_for_every_prefix_of_a_path() {
        let path = "/admin/stats/daily";
        for cut in 0..=path.len() {
            let prefix = &path[..cut];
            let expected = if cut == path.len() { "/" } else { &path[cut..] };
            assert_eq!(strip_prefix(prefix, path), expected, "prefix {prefix:?}");
        }
    }
}
