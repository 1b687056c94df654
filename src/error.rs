//! Error types.
//!
//! Two kinds of failure exist and they never mix:
//!
//! - [`Error`] is returned by the registration API and by [`Server`](crate::Server).
//!   It means the application is misconfigured or the socket could not be set
//!   up. Startup should abort.
//! - [`HttpError`] travels inside [`Next::Error`](crate::Next::Error) while a
//!   request is being dispatched. It is always absorbed by the application's
//!   error handler and never escapes [`App::handle`](crate::App::handle).

use std::fmt;
use std::net::AddrParseError;

use http::StatusCode;

/// The error type returned by strand's fallible setup operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A route was registered under a path owned by a mounted application.
    #[error(
        "cannot register `{method} {pattern}` because an application is mounted at `{base}`; \
         register the route inside that application instead"
    )]
    RouteConflict {
        method: String,
        pattern: String,
        base: String,
    },

    /// An application was mounted under a path already claimed by a route.
    #[error("cannot mount an application at `{base}` because route `{pattern}` already claims it")]
    MountConflict { base: String, pattern: String },

    /// The mount prefix can never be selected by the dispatcher.
    #[error("cannot mount an application at `{base}`: {reason}")]
    InvalidMount { base: String, reason: &'static str },

    /// The route pattern uses syntax the router does not support.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    /// The radix tree refused the route (duplicate or overlapping pattern).
    #[error("invalid route `{pattern}`: {source}")]
    InvalidRoute {
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("invalid socket address: {0}")]
    Addr(#[from] AddrParseError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ── HttpError ─────────────────────────────────────────────────────────────────

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A request-time failure handed to the error handler.
///
/// Carries an optional status code and an optional message. The default
/// error handler answers with the status (500 when absent) and the message
/// (the status reason phrase when absent).
///
/// Any `std::error::Error + Send + Sync` converts into an `HttpError` with no
/// status, so fallible calls inside a handler map straight onto
/// [`Next::Error`](crate::Next::Error):
///
/// ```rust
/// use strand::{HttpError, Next, Request, Response};
///
/// async fn read_count(req: &mut Request, res: &mut Response) -> Next {
///     let count: u32 = match req.query("count").unwrap_or("1").parse() {
///         Ok(n) => n,
///         Err(e) => return Next::error(HttpError::from(e).with_status(400)),
///     };
///     res.text(count.to_string());
///     Next::Done
/// }
/// ```
pub struct HttpError {
    status: Option<u16>,
    message: Option<String>,
    source: Option<BoxError>,
}

impl HttpError {
    /// An error that only carries a status code.
    pub fn status(code: u16) -> Self {
        Self { status: Some(code), message: None, source: None }
    }

    /// An error with a status code and a message sent as the response body.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self { status: Some(code), message: Some(message.into()), source: None }
    }

    /// An error with a message and no status (answered with 500 by default).
    pub fn msg(message: impl Into<String>) -> Self {
        Self { status: None, message: Some(message.into()), source: None }
    }

    pub fn with_status(mut self, code: u16) -> Self {
        self.status = Some(code);
        self
    }

    /// The status code, if one was attached.
    pub fn code(&self) -> Option<u16> {
        self.status
    }

    /// The message, falling back to the wrapped source's `Display` output.
    pub fn message(&self) -> Option<String> {
        match (&self.message, &self.source) {
            (Some(m), _) => Some(m.clone()),
            (None, Some(src)) => Some(src.to_string()),
            (None, None) => None,
        }
    }

    /// The wrapped error, if this was built from one.
    pub fn source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// The status the default error handler answers with.
    pub(crate) fn status_or_500(&self) -> StatusCode {
        self.status
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl<E> From<E> for HttpError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        Self { status: None, message: None, source: Some(Box::new(e)) }
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.message()) {
            (Some(code), Some(msg)) => write!(f, "{code}: {msg}"),
            (Some(code), None) => write!(f, "status {code}"),
            (None, Some(msg)) => f.write_str(&msg),
            (None, None) => f.write_str("unknown error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_defaults_to_500() {
        assert_eq!(HttpError::msg("boom").status_or_500(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(HttpError::status(404).status_or_500(), StatusCode::NOT_FOUND);
        // out of range codes cannot be sent
        assert_eq!(HttpError::status(42).status_or_500(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn message_falls_back_to_source() {
        let parse = "x".parse::<u32>().unwrap_err();
        let err = HttpError::from(parse).with_status(400);
        assert_eq!(err.code(), Some(400));
        assert_eq!(err.message().as_deref(), Some("invalid digit found in string"));
        assert!(err.source().is_some());
        assert_eq!(HttpError::status(404).message(), None);
    }

    #[test]
    fn conflict_message_names_both_sides() {
        let err = Error::RouteConflict {
            method: "GET".into(),
            pattern: "/users/:id".into(),
            base: "/users".into(),
        };
        let text = err.to_string();
        assert!(text.contains("GET /users/:id"));
        assert!(text.contains("`/users`"));
    }
}
