//! Unified error type.

use std::path::PathBuf;

use thiserror::Error;

/// The error type returned by verdict's fallible operations.
///
/// Domain outcomes ("not found", "duplicate description") are expressed as
/// [`Status`](crate::Status) codes and routed through the
/// [`StatusRegistry`](crate::StatusRegistry), never as `Error`s. This type
/// surfaces infrastructure failures: a misconfigured registry or container,
/// a broken store, a socket that will not bind.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("the status code {status} has already been matched")]
    AlreadyRegistered { status: String },

    #[error("the status code {status} has not been matched")]
    UnregisteredStatus { status: String },

    #[error("unable to resolve dependency `{name}`")]
    UnresolvableDependency { name: String },

    #[error("no procedure registered for `{name}`")]
    UnknownProcedure { name: String },

    #[error("a procedure is already registered for `{name}`")]
    DuplicateProcedure { name: String },

    #[error("payload field `{key}` has the wrong shape: {source}")]
    Payload {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store `{}`: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("view `{}`: {source}", path.display())]
    View {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("todo ids exhausted: {last} is the largest id")]
    IdsExhausted { last: u64 },

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn unresolvable(name: impl Into<String>) -> Self {
        Self::UnresolvableDependency { name: name.into() }
    }
}
