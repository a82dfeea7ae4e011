//! Status → response callback registry.
//!
//! The registry is the indirection between *what happened* and *what to
//! render*. A procedure returns `2001`; the application decides, once, at
//! startup, that `2001` means a 404 for the JSON API. Composite statuses
//! (`[1007, 2001]`) are keys in their own right and are matched exactly.

use std::collections::HashMap;
use std::sync::Arc;

use crate::container::Container;
use crate::error::Error;
use crate::payload::Payload;
use crate::response::Response;
use crate::status::Status;

/// A registered response-building callback.
pub type Callback = Arc<dyn Fn(&Container, Payload) -> Result<Response, Error> + Send + Sync>;

/// What a status callback may return: a response, or a fallible one.
pub trait Reply {
    fn into_reply(self) -> Result<Response, Error>;
}

impl Reply for Response {
    fn into_reply(self) -> Result<Response, Error> { Ok(self) }
}

impl<R: Reply> Reply for Result<R, Error> {
    fn into_reply(self) -> Result<Response, Error> { self.and_then(Reply::into_reply) }
}

/// Maps each [`Status`] to exactly one callback.
#[derive(Default)]
pub struct StatusRegistry {
    matched: HashMap<Status, Callback>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `status`.
    ///
    /// Fails with [`Error::AlreadyRegistered`] if an equal status was
    /// registered before.
    pub fn register<F, R>(&mut self, status: impl Into<Status>, callback: F) -> Result<(), Error>
    where
        F: Fn(&Container, Payload) -> R + Send + Sync + 'static,
        R: Reply,
    {
        let status = status.into();
        if self.matched.contains_key(&status) {
            return Err(Error::AlreadyRegistered { status: status.to_string() });
        }
        let callback: Callback = Arc::new(move |container: &Container, payload: Payload| {
            callback(container, payload).into_reply()
        });
        self.matched.insert(status, callback);
        Ok(())
    }

    /// Looks up the callback for `status`.
    pub fn resolve(&self, status: &Status) -> Result<Callback, Error> {
        self.matched
            .get(status)
            .cloned()
            .ok_or_else(|| Error::UnregisteredStatus { status: status.to_string() })
    }

    pub fn is_registered(&self, status: &Status) -> bool {
        self.matched.contains_key(status)
    }

    pub fn len(&self) -> usize {
        self.matched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}
