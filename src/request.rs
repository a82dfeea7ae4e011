//! Incoming HTTP request types.
//!
//! [`Incoming`] is what the transport hands the [`Kernel`](crate::Kernel):
//! method, URI, headers, body. [`Request`] is what a route handler receives
//! once the kernel has routed it: the same data plus the path parameters,
//! a merged input store, the visitor's session and the application.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::app::App;
use crate::error::Error;
use crate::method::Method;
use crate::session::Session;

/// A request as received from the transport, before routing.
#[derive(Clone, Debug)]
pub struct Incoming {
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Incoming {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self { method, uri: uri.into(), headers: Vec::new(), body: Bytes::new() }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a urlencoded form body and the matching content type.
    pub fn form(self, body: &str) -> Self {
        self.header("content-type", "application/x-www-form-urlencoded")
            .body(body.to_owned())
    }

    pub(crate) fn find_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A routed HTTP request, as seen by a handler.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) input: HashMap<String, String>,
    pub(crate) session: Session,
    pub(crate) app: Arc<App>,
}

impl Request {
    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn session(&self) -> &Session { &self.session }
    pub fn app(&self) -> &App { &self.app }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/todos/{id}`, `req.param("id")` on `/todos/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns a value from the input store: path parameters, query string
    /// and urlencoded form fields. Path parameters win over query and form
    /// fields of the same name.
    pub fn input(&self, key: &str) -> Option<&str> {
        self.input.get(key).map(String::as_str)
    }

    pub fn inputs(&self) -> &HashMap<String, String> {
        &self.input
    }

    /// Deserialises a urlencoded form body.
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_urlencoded::from_bytes(&self.body)?)
    }

    /// Deserialises a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Deserialises the body as JSON or as a form, by content type.
    pub fn fields<T: DeserializeOwned>(&self) -> Result<T, Error> {
        match self.header("content-type") {
            Some(ct) if ct.starts_with("application/json") => self.json(),
            _ => self.form(),
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
