//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A route is a method, a
//! path pattern and a handler; `{name}` segments bind path parameters that
//! the [`Kernel`](crate::Kernel) copies into the request's input store.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// The application route table.
///
/// Build it once at startup and hand it to [`Kernel::new`](crate::Kernel::new).
/// Every registration returns `self` so calls chain.
///
/// Matching rules:
/// - the method must match exactly; a `POST` never reaches a `GET` route;
/// - segments match positionally, `{name}` binds exactly one segment;
/// - a static segment takes precedence over a placeholder at the same
///   position (`/todos/new` beats `/todos/{id}`);
/// - two patterns that could match the same paths ambiguously are rejected
///   at registration.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// ```rust
    /// # use verdict::{Method, Request, Response, Router};
    /// # async fn show_todo(_: Request) -> Response { Response::text("") }
    /// # async fn add_todo(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get,  "/todos/{id}", show_todo)
    ///     .on(Method::Post, "/todos",      add_todo);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid pattern or conflicts with a route
    /// already registered for `method`. Both are wiring mistakes.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, path, handler)
    }

    /// Finds the handler for `method` + `path` and the parameters it binds.
    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Whether any method has a route matching `path`.
    pub(crate) fn matches_any(&self, path: &str) -> bool {
        self.routes.values().any(|tree| tree.at(path).is_ok())
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
