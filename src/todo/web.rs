//! HTTP side of the todo list: bindings, status callbacks and routes.
//!
//! The same procedures back two audiences:
//!
//! - the HTML form on `/` posts to `POST /todos`, which uses
//!   [`App::fulfill`] and so scalar statuses: success and failure both
//!   redirect back with a flashed message;
//! - the JSON API (`GET`/`PUT`/`DELETE /todos…`) uses [`App::pipe`] and so
//!   sequence statuses: `[2001]` is a 404, `[2000]` a 409.
//!
//! Registering `2000` and `[2000]` separately is what lets one rule answer
//! both audiences differently.

use std::path::PathBuf;
use std::sync::Arc;

use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::procedures::{
    ADD_TODO, ADDED, DUPLICATE_DESCRIPTION, FOUND, LISTED, NOT_FOUND, REMOVE_TODO, REMOVED,
    SEE_TODO, SEE_TODOS, UPDATE_TODO, UPDATED,
};
use super::{FlatFileTodoManager, NewTodo, Todo, TodoId, TodoManager};
use crate::app::App;
use crate::container::Container;
use crate::error::Error;
use crate::payload::Payload;
use crate::procedure::Field;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::view::View;

/// Binds the flat-file store as the shared [`TodoManager`]. The file is
/// read on first use.
pub fn bind(app: &mut App, file: impl Into<PathBuf>) {
    let file = file.into();
    app.container_mut().share::<dyn TodoManager, _>(move |_| {
        Ok(Arc::new(FlatFileTodoManager::open(file.clone())) as Arc<dyn TodoManager>)
    });
}

/// Registers the response for every status the todo procedures produce.
pub fn statuses(app: &mut App) -> Result<(), Error> {
    // Form flow, via `fulfill`.
    app.matching(ADDED, |_, _| Response::back().flash("message", "Todo added"))?
        .matching(DUPLICATE_DESCRIPTION, |_, _| {
            Response::back().flash("error", "A todo with that description already exists")
        })?;

    // JSON API, via `pipe`.
    app.matching([LISTED], |_, payload: Payload| {
        Response::to_json(payload.get("todos").unwrap_or(&json!([])))
    })?
    .matching([FOUND], todo_json)?
    .matching([UPDATED], todo_json)?
    .matching([REMOVED], |_, _| Response::status(StatusCode::NO_CONTENT))?
    .matching([NOT_FOUND], |_, _| {
        error_json(StatusCode::NOT_FOUND, "todo not found")
    })?
    .matching([DUPLICATE_DESCRIPTION], |_, _| {
        error_json(StatusCode::CONFLICT, "a todo with that description already exists")
    })?;
    Ok(())
}

/// Adds the todo routes to `router`.
pub fn routes(router: Router) -> Router {
    router
        .get("/", index)
        .get("/todos", list)
        .post("/todos", create)
        .get("/todos/{id}", show)
        .put("/todos/{id}", update)
        .delete("/todos/{id}", destroy)
}

fn todo_json(_: &Container, payload: Payload) -> Result<Response, Error> {
    Response::to_json(payload.get(Todo::NAME).unwrap_or(&json!(null)))
}

fn error_json(status: StatusCode, message: &str) -> Result<Response, Error> {
    let body = serde_json::to_vec(&json!({ "error": message }))?;
    Ok(Response::builder().status(status).json(body))
}

fn todo_id(req: &Request) -> Option<TodoId> {
    req.param("id")?.parse().ok().map(TodoId)
}

// GET /: the HTML page, with whatever the last form post flashed.
async fn index(req: Request) -> Result<Response, Error> {
    let app = req.app();
    let mut params = app.make(SEE_TODOS, &Payload::new())?.payload;

    let count = params.field::<Vec<Todo>>("todos")?.map_or(0, |todos| todos.len());
    params.merge(
        Payload::new()
            .with("count", count)
            .with("message", req.session().get_or("message", ""))
            .with("error", req.session().get_or("error", "")),
    );

    app.container().resolve::<View>()?.make("index", &params)
}

// GET /todos
async fn list(req: Request) -> Result<Response, Error> {
    req.app().pipe(&[SEE_TODOS], Payload::new())
}

// GET /todos/{id}
async fn show(req: Request) -> Result<Response, Error> {
    let Some(id) = todo_id(&req) else {
        return error_json(StatusCode::NOT_FOUND, "todo not found");
    };
    req.app().pipe(&[SEE_TODO], Payload::new().with(TodoId::NAME, id.0))
}

// POST /todos: form body `description=…`
async fn create(req: Request) -> Result<Response, Error> {
    let todo: NewTodo = match req.fields() {
        Ok(todo) => todo,
        Err(_) => return Ok(Response::back().flash("error", "A todo needs a description")),
    };

    let mut payload = Payload::new();
    payload.insert(NewTodo::NAME, &todo)?;
    req.app().fulfill(ADD_TODO, payload)
}

#[derive(Deserialize)]
struct Changes {
    description: String,
    #[serde(default)]
    completed: bool,
}

// PUT /todos/{id}: form or JSON body `description`, `completed`
async fn update(req: Request) -> Result<Response, Error> {
    let Some(id) = todo_id(&req) else {
        return error_json(StatusCode::NOT_FOUND, "todo not found");
    };
    let changes: Changes = match req.fields() {
        Ok(changes) => changes,
        Err(e) => return error_json(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let todo = Todo { id, description: changes.description, completed: changes.completed };
    let mut payload = Payload::new();
    payload.insert(Todo::NAME, &todo)?;
    req.app().pipe(&[UPDATE_TODO], payload)
}

// DELETE /todos/{id}
async fn destroy(req: Request) -> Result<Response, Error> {
    let Some(id) = todo_id(&req) else {
        return error_json(StatusCode::NOT_FOUND, "todo not found");
    };
    req.app().pipe(&[REMOVE_TODO], Payload::new().with(TodoId::NAME, id.0))
}
