//! The todo list feature.
//!
//! - [`Todo`], [`NewTodo`], [`TodoId`]: the agreement types procedures
//!   exchange through the payload.
//! - [`TodoManager`]: what procedures need from storage.
//!   [`FlatFileTodoManager`] is the implementation bound at startup.
//! - [`procedures`]: the business rules, one function per feature.
//! - [`web`]: status callbacks, routes and bindings for the HTTP side.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::procedure::Field;

mod flatfile;
pub mod procedures;
pub mod web;

pub use flatfile::FlatFileTodoManager;

/// Identifier of a stored todo.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TodoId(pub u64);

impl TodoId {
    /// The id following `last`, or the first id when nothing is stored.
    pub fn after(last: Option<TodoId>) -> Result<TodoId, Error> {
        match last {
            None => Ok(TodoId(1)),
            Some(TodoId(last)) => last.checked_add(1).map(TodoId).ok_or(Error::IdsExhausted { last }),
        }
    }
}

impl Field for TodoId {
    const NAME: &'static str = "id";
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Todo {
    pub id: TodoId,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl Field for Todo {
    const NAME: &'static str = "todo";
}

/// A todo that has not been stored yet and so has no id.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NewTodo {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl Field for NewTodo {
    const NAME: &'static str = "new_todo";
}

/// Storage for todos.
///
/// Mutators persist before returning. Implementations are shared across
/// requests, so they synchronise internally; no transaction spans more than
/// one call.
pub trait TodoManager: Send + Sync {
    /// Every todo, ordered by id.
    fn all(&self) -> Vec<Todo>;

    fn find(&self, id: TodoId) -> Option<Todo>;

    /// Whether a todo with `todo.id` is stored.
    fn has(&self, todo: &Todo) -> bool;

    /// Whether a todo other than `except` already uses `description`.
    fn has_todo_with_description(&self, description: &str, except: Option<TodoId>) -> bool;

    /// The id the next added todo should get: one past the largest stored
    /// id. Fails with [`Error::IdsExhausted`] once that would overflow.
    fn next_id(&self) -> Result<TodoId, Error>;

    fn add(&self, todo: Todo) -> Result<(), Error>;

    fn update(&self, todo: Todo) -> Result<(), Error>;

    fn remove(&self, todo: &Todo) -> Result<(), Error>;
}
