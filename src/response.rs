//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Every response starts from the same default header set (permissive CORS,
//! `text/html`, and a `verdict-status` header carrying the resolved domain
//! status, `0` until something [`tag`](Response::tag)s it). Constructors and
//! the builder override individual headers; they never drop the defaults.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::Error;
use crate::status::Status;

/// Name of the header that exposes the domain status of a response.
pub const STATUS_HEADER: &str = "verdict-status";

const DEFAULT_HEADERS: [(&str, &str); 4] = [
    ("access-control-allow-origin", "*"),
    ("content-type", "text/html; charset=utf-8"),
    (
        "access-control-allow-headers",
        "Origin, Accept, Content-Type, Authorization, X-Requested-With, Content-Range, Content-Disposition",
    ),
    (STATUS_HEADER, "0"),
];

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// Besides status, headers and body a response can carry *session effects*:
/// values to [`flash`](Response::flash) and whether its redirect target is
/// "wherever the visitor came from" ([`Response::back`]). Status callbacks
/// stay pure functions of their payload; the [`Kernel`](crate::Kernel)
/// applies these effects once, at the request boundary.
///
/// ```rust
/// use http::StatusCode;
/// use verdict::Response;
///
/// Response::html("<p>hi</p>");
/// Response::status(StatusCode::NO_CONTENT);
/// Response::back().flash("message", "Saved");
///
/// Response::builder()
///     .status(StatusCode::CONFLICT)
///     .header("retry-after", "1")
///     .json(br#"{"error":"duplicate"}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
    pub(crate) flashes: Vec<(String, Value)>,
    pub(crate) back: bool,
}

impl Response {
    /// `200 OK`: `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().bytes(ContentType::Html, body.into().into_bytes())
    }

    /// `200 OK`: `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK`: `application/json`, from already-serialised bytes.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`: `application/json`, serialising `value`.
    pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        Ok(Self::json(serde_json::to_vec(value)?))
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// `302 Found` to `location`.
    pub fn redirect(location: &str) -> Self {
        Self::builder()
            .status(StatusCode::FOUND)
            .header("location", location)
            .text("Redirecting")
    }

    /// `302 Found` back to the last page the visitor requested.
    ///
    /// The location is filled in by the kernel from the session; outside a
    /// kernel it falls back to `/`.
    pub fn back() -> Self {
        let mut response = Self::redirect("/");
        response.back = true;
        response
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    /// Queues a value to flash into the visitor's session.
    pub fn flash(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.flashes.push((key.to_owned(), value.into()));
        self
    }

    /// Records the domain status that produced this response.
    pub fn tag(&mut self, status: &Status) {
        self.set_header(STATUS_HEADER, &status.to_string());
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_owned(),
            None => self.headers.push((name.to_ascii_lowercase(), value.to_owned())),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The `verdict-status` header, as written by [`tag`](Response::tag).
    pub fn domain_status(&self) -> Option<&str> {
        self.header(STATUS_HEADER)
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;

        for (name, value) in &self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        response
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method: you always know what you're sending.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish(Some(ContentType::Json), body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(Some(ContentType::Text), body.into().into_bytes())
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(Some(content_type), body)
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        self.finish(None, Vec::new())
    }

    fn finish(self, content_type: Option<ContentType>, body: Vec<u8>) -> Response {
        let mut response = Response {
            body,
            headers: DEFAULT_HEADERS.iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            status: self.status,
            flashes: Vec::new(),
            back: false,
        };
        if let Some(content_type) = content_type {
            response.set_header("content-type", content_type.as_str());
        }
        for (name, value) in &self.headers {
            response.set_header(name, value);
        }
        response
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// `Result<R, Error>` converts too: this is the outermost error boundary.
/// Domain outcomes never reach it; only infrastructure faults (an
/// unregistered status, an unresolvable dependency, a failed store write)
/// do, and they are logged and answered with a bare `500`.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a bare status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl<R: IntoResponse> IntoResponse for Result<R, Error> {
    fn into_response(self) -> Response {
        match self {
            Ok(response) => response.into_response(),
            Err(e) => {
                error!(error = %e, "request failed");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_kept_and_overridden() {
        let response = Response::builder()
            .header("Content-Type", "application/xml")
            .header("x-extra", "1")
            .no_body();

        assert_eq!(response.header("content-type"), Some("application/xml"));
        assert_eq!(response.header("access-control-allow-origin"), Some("*"));
        assert_eq!(response.header("x-extra"), Some("1"));
        assert_eq!(response.domain_status(), Some("0"));
        assert_eq!(
            response.headers().iter().filter(|(k, _)| k.eq_ignore_ascii_case("content-type")).count(),
            1
        );
    }

    #[test]
    fn tagging_overwrites_the_status_header() {
        let mut response = Response::html("ok");
        response.tag(&Status::from([1007, 2001]));
        assert_eq!(response.domain_status(), Some("[1007, 2001]"));
    }

    #[test]
    fn errors_become_internal_server_errors() {
        let result: Result<Response, Error> =
            Err(Error::UnregisteredStatus { status: "42".to_owned() });
        assert_eq!(result.into_response().status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn back_redirects_carry_flashes() {
        let response = Response::back().flash("message", "Saved");
        assert_eq!(response.status_code(), StatusCode::FOUND);
        assert!(response.back);
        assert_eq!(response.flashes.len(), 1);
    }

    #[test]
    fn into_inner_copies_status_and_headers() {
        let inner = Response::status(StatusCode::NO_CONTENT).into_inner();
        assert_eq!(inner.status(), StatusCode::NO_CONTENT);
        assert_eq!(inner.headers().get(STATUS_HEADER).unwrap(), "0");
    }
}
