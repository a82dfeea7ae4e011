//! The application: procedures, status callbacks and the services they use.
//!
//! # Request flow
//!
//! ```text
//! handler
//!   └─ app.pipe(["add", "notify"], payload)
//!        ├─ run "add"     → (1001, {todo})      payload += {todo}
//!        ├─ run "notify"  → (1100, {sent})      payload += {sent}
//!        └─ statuses.resolve([1001, 1100])      exact, whole-sequence match
//!             └─ callback(container, payload) → Response
//!                                                 verdict-status: [1001, 1100]
//! ```
//!
//! Procedures run strictly in order and each one sees every field the
//! previous ones merged in. There is no per-step lookup, no retry and no
//! rollback: a step signals trouble with its status, and the registered
//! callback for the whole sequence decides what the visitor sees.

use std::collections::HashMap;

use tracing::debug;

use crate::container::Container;
use crate::error::Error;
use crate::payload::Payload;
use crate::procedure::{BoxedProcedure, Context, Outcome, Procedure};
use crate::response::Response;
use crate::statuses::{Reply, StatusRegistry};
use crate::status::Status;

/// Built once at startup, then shared read-only by every request.
#[derive(Default)]
pub struct App {
    container: Container,
    statuses: StatusRegistry,
    procedures: HashMap<String, BoxedProcedure>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(&self) -> &Container { &self.container }
    pub fn container_mut(&mut self) -> &mut Container { &mut self.container }
    pub fn statuses(&self) -> &StatusRegistry { &self.statuses }

    /// Registers `procedure` under a human-readable feature name.
    ///
    /// ```rust
    /// use verdict::{App, Payload};
    ///
    /// let mut app = App::new();
    /// app.when("i want to say hello", || (1_u32, Payload::new().with("greeting", "hello")))
    ///     .unwrap();
    /// ```
    pub fn when<P, Args>(&mut self, feature: &str, procedure: P) -> Result<&mut Self, Error>
    where
        P: Procedure<Args>,
        Args: 'static,
    {
        if self.procedures.contains_key(feature) {
            return Err(Error::DuplicateProcedure { name: feature.to_owned() });
        }
        self.procedures.insert(feature.to_owned(), procedure.into_boxed_procedure());
        Ok(self)
    }

    /// Registers the response callback for `status`.
    pub fn matching<F, R>(&mut self, status: impl Into<Status>, callback: F) -> Result<&mut Self, Error>
    where
        F: Fn(&Container, Payload) -> R + Send + Sync + 'static,
        R: Reply,
    {
        self.statuses.register(status, callback)?;
        Ok(self)
    }

    pub fn has_procedure(&self, feature: &str) -> bool {
        self.procedures.contains_key(feature)
    }

    /// Runs a single procedure against `payload` without resolving a
    /// response.
    pub fn make(&self, feature: &str, payload: &Payload) -> Result<Outcome, Error> {
        let procedure = self
            .procedures
            .get(feature)
            .ok_or_else(|| Error::UnknownProcedure { name: feature.to_owned() })?;

        let outcome = procedure.call(&Context::new(payload, &self.container))?;
        debug!(
            feature,
            procedure = procedure.name(),
            status = %outcome.status,
            "procedure ran"
        );
        Ok(outcome)
    }

    /// Runs one procedure and renders the callback registered for its
    /// (scalar) status, passing it the procedure's own payload.
    pub fn fulfill(&self, feature: &str, payload: Payload) -> Result<Response, Error> {
        let Outcome { status, payload: body } = self.make(feature, &payload)?;
        self.respond(&status, body)
    }

    /// Runs `features` in order against a shared payload and renders the
    /// callback registered for the full ordered sequence of their statuses.
    pub fn pipe(&self, features: &[&str], payload: Payload) -> Result<Response, Error> {
        let mut pipeline = self.pipeline(payload);
        for feature in features {
            pipeline.run(feature)?;
        }
        pipeline.finish()
    }

    /// Starts a pipeline to drive step by step.
    pub fn pipeline(&self, payload: Payload) -> Pipeline<'_> {
        Pipeline { app: self, statuses: Vec::new(), payload }
    }

    fn respond(&self, status: &Status, payload: Payload) -> Result<Response, Error> {
        let callback = self.statuses.resolve(status)?;
        let mut response = callback(&self.container, payload)?;
        response.tag(status);
        Ok(response)
    }
}

/// State of one in-flight [`App::pipe`]: the statuses seen so far and the
/// merged payload. Dropped once the response is produced.
pub struct Pipeline<'a> {
    app: &'a App,
    statuses: Vec<Status>,
    payload: Payload,
}

impl Pipeline<'_> {
    /// Runs one procedure, records its status and merges its payload.
    pub fn run(&mut self, feature: &str) -> Result<Status, Error> {
        let Outcome { status, payload } = self.app.make(feature, &self.payload)?;
        self.payload.merge(payload);
        self.statuses.push(status.clone());
        Ok(status)
    }

    pub fn statuses(&self) -> &[Status] { &self.statuses }
    pub fn payload(&self) -> &Payload { &self.payload }

    /// Resolves the callback for the whole status sequence and renders it
    /// with the merged payload.
    pub fn finish(self) -> Result<Response, Error> {
        let status = Status::Sequence(self.statuses);
        self.app.respond(&status, self.payload)
    }
}
