//! The outgoing HTTP response, written in place by the handler chain.
//!
//! # One writer
//!
//! Every handler of a request, including the handlers of a mounted
//! sub-application, receives the same `&mut Response`. Whoever calls one of
//! the ending methods ([`end`](Response::end), [`text`](Response::text),
//! [`json`](Response::json), [`send`](Response::send)) first decides the
//! response; the dispatcher then skips any handler still queued. Later ending
//! calls are ignored and logged at `warn` level.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// An outgoing HTTP response under construction.
///
/// Starts as an empty `200 OK`.
///
/// ```rust
/// use strand::{Response, StatusCode};
///
/// let mut res = Response::new();
/// res.set_status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// assert!(res.is_finished());
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    finished: bool,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status as a bare number.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets a header, replacing any previous value. Invalid names or values
    /// are dropped with a warning.
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(name, "dropping invalid response header"),
        }
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// `true` once any handler has ended the response.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Appends to the body without ending the response.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
        if self.finished {
            warn!("write after the response was ended; ignoring");
        } else {
            self.body.extend_from_slice(chunk.as_ref());
        }
        self
    }

    /// Appends `body` and ends the response.
    pub fn end(&mut self, body: impl AsRef<[u8]>) {
        if self.finished {
            warn!(status = self.status.as_u16(), "response already ended; ignoring second end");
            return;
        }
        self.body.extend_from_slice(body.as_ref());
        self.finished = true;
    }

    /// Ends with a `text/plain; charset=utf-8` body.
    pub fn text(&mut self, body: impl Into<String>) {
        self.send("text/plain; charset=utf-8", body.into().into_bytes());
    }

    /// Ends with an `application/json` body.
    ///
    /// strand sends bytes; serialise however you like:
    /// - serde_json: `res.json(serde_json::to_vec(&user)?)`
    /// - hand-built: `res.json(format!(r#"{{"id":{id}}}"#).into_bytes())`
    pub fn json(&mut self, body: Vec<u8>) {
        self.send("application/json", body);
    }

    /// Ends with a `text/html; charset=utf-8` body.
    pub fn html(&mut self, body: impl Into<String>) {
        self.send("text/html; charset=utf-8", body.into().into_bytes());
    }

    /// Ends with `body` under an explicit content type.
    pub fn send(&mut self, content_type: &str, body: impl AsRef<[u8]>) {
        if !self.finished {
            self.header(CONTENT_TYPE.as_str(), content_type);
        }
        self.end(body);
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let len = self.body.len();
        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
        response
    }
}
