//! The request kernel: routing, input, session and the error boundary.
//!
//! ```text
//! Incoming ──▶ Kernel::handle
//!               ├─ load session (cookie)          flash → deprecated
//!               ├─ router.lookup(method, path)    miss → 404 / 405
//!               ├─ input store ← query + form + path params
//!               ├─ handler(Request).await         Err(_) → 500
//!               ├─ apply response flashes, resolve `back` redirects
//!               ├─ remember HTML pages as the next `back` target
//!               └─ save session (+ set-cookie on first visit)
//! ```
//!
//! The kernel is the only place where session state changes hands; status
//! callbacks and procedures never see it.

use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, warn};

use crate::app::App;
use crate::request::{Incoming, Request};
use crate::response::Response;
use crate::router::Router;
use crate::session::{SESSION_COOKIE, SessionStore, session_id};

/// Session key holding the last HTML page the visitor requested.
///
/// Only recorded for visitors who already carry a session, so cookieless
/// clients such as health probes never leave a session behind.
pub const BACK_KEY: &str = "uri";

/// Routes requests to handlers and owns the per-request boundary work.
pub struct Kernel {
    router: Router,
    app: Arc<App>,
    sessions: SessionStore,
}

impl Kernel {
    pub fn new(app: App, router: Router) -> Self {
        Self { router, app: Arc::new(app), sessions: SessionStore::new() }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles one request end to end. Never fails: routing misses and
    /// infrastructure faults are turned into responses here.
    pub async fn handle(&self, incoming: Incoming) -> Response {
        let (path, query) = match incoming.uri.split_once('?') {
            Some((path, query)) => (path.to_owned(), query.to_owned()),
            None => (incoming.uri.clone(), String::new()),
        };

        let (session, issued) = self
            .sessions
            .load(incoming.find_header("cookie").and_then(session_id));

        let mut response = match self.router.lookup(incoming.method, &path) {
            Some((handler, params)) => match collect_input(&incoming, &query, &params) {
                Some(input) => {
                    let request = Request {
                        method: incoming.method,
                        path: path.clone(),
                        headers: incoming.headers.clone(),
                        body: incoming.body.clone(),
                        params,
                        input,
                        session: session.clone(),
                        app: Arc::clone(&self.app),
                    };
                    handler.call(request).await
                }
                None => Response::status(StatusCode::BAD_REQUEST),
            },
            None if self.router.matches_any(&path) => {
                debug!(method = %incoming.method, %path, "method not allowed");
                Response::status(StatusCode::METHOD_NOT_ALLOWED)
            }
            None => {
                warn!(method = %incoming.method, %path, "no route matched");
                Response::builder().status(StatusCode::NOT_FOUND).text("Not Found")
            }
        };

        for (key, value) in std::mem::take(&mut response.flashes) {
            session.flash(&key, value);
        }

        if response.back {
            let location = session
                .get(BACK_KEY)
                .and_then(|uri| uri.as_str().map(str::to_owned))
                .unwrap_or_else(|| "/".to_owned());
            response.set_header("location", &location);
        }

        if !issued && is_page(&incoming, &response) {
            session.set(BACK_KEY, incoming.uri.as_str());
        }

        if self.sessions.save(&session) && issued {
            response.set_header(
                "set-cookie",
                &format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", session.id()),
            );
        }

        debug!(
            method = %incoming.method,
            uri = %incoming.uri,
            status = response.status_code().as_u16(),
            domain_status = response.domain_status().unwrap_or("0"),
            "request handled"
        );
        response
    }
}

/// A successful HTML answer to a safe request: something a visitor can be
/// sent back to. API and health responses never qualify.
fn is_page(incoming: &Incoming, response: &Response) -> bool {
    incoming.method.is_safe()
        && response.status_code().is_success()
        && response.header("content-type").is_some_and(|ct| ct.starts_with("text/html"))
}

/// Builds the input store. Returns `None` when the query string or a
/// urlencoded body cannot be decoded.
fn collect_input(
    incoming: &Incoming,
    query: &str,
    params: &HashMap<String, String>,
) -> Option<HashMap<String, String>> {
    let mut input: HashMap<String, String> = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .ok()?
        .into_iter()
        .collect();

    let is_form = incoming
        .find_header("content-type")
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if is_form {
        input.extend(serde_urlencoded::from_bytes::<Vec<(String, String)>>(&incoming.body).ok()?);
    }

    input.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
    Some(input)
}
