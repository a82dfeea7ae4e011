//! Business rules of the todo list.
//!
//! Every rule is a procedure registered under the sentence a user would say.
//! None of them know about HTTP; they report a status code and the fields
//! they produced.

use crate::app::App;
use crate::error::Error;
use crate::payload::Payload;
use crate::procedure::{Dep, Field};

use super::{NewTodo, Todo, TodoId, TodoManager};

pub const SEE_TODOS: &str = "i want to see my todos";
pub const SEE_TODO: &str = "i want to see a todo";
pub const ADD_TODO: &str = "i want to add a todo";
pub const UPDATE_TODO: &str = "i want to update a todo";
pub const REMOVE_TODO: &str = "i want to remove a todo";

pub const LISTED: u32 = 1000;
pub const ADDED: u32 = 1001;
pub const FOUND: u32 = 1002;
pub const UPDATED: u32 = 1007;
pub const REMOVED: u32 = 1008;
pub const DUPLICATE_DESCRIPTION: u32 = 2000;
pub const NOT_FOUND: u32 = 2001;

type Step = Result<(u32, Payload), Error>;

/// Registers every todo procedure on `app`.
pub fn register(app: &mut App) -> Result<(), Error> {
    app.when(SEE_TODOS, see_todos)?
        .when(SEE_TODO, see_todo)?
        .when(ADD_TODO, add_todo)?
        .when(UPDATE_TODO, update_todo)?
        .when(REMOVE_TODO, remove_todo)?;
    Ok(())
}

pub fn see_todos(manager: Dep<dyn TodoManager>) -> Step {
    let mut payload = Payload::new();
    payload.insert("todos", &manager.all())?;
    Ok((LISTED, payload))
}

pub fn see_todo(id: TodoId, manager: Dep<dyn TodoManager>) -> Step {
    let Some(todo) = manager.find(id) else {
        return Ok((NOT_FOUND, Payload::new()));
    };
    let mut payload = Payload::new();
    payload.insert(Todo::NAME, &todo)?;
    Ok((FOUND, payload))
}

pub fn add_todo(todo: NewTodo, manager: Dep<dyn TodoManager>) -> Step {
    if manager.has_todo_with_description(&todo.description, None) {
        return Ok((DUPLICATE_DESCRIPTION, Payload::new()));
    }

    let todo = Todo { id: manager.next_id()?, description: todo.description, completed: todo.completed };
    manager.add(todo.clone())?;

    let mut payload = Payload::new();
    payload.insert(Todo::NAME, &todo)?;
    Ok((ADDED, payload))
}

pub fn update_todo(todo: Todo, manager: Dep<dyn TodoManager>) -> Step {
    if !manager.has(&todo) {
        return Ok((NOT_FOUND, Payload::new()));
    }

    if manager.has_todo_with_description(&todo.description, Some(todo.id)) {
        return Ok((DUPLICATE_DESCRIPTION, Payload::new()));
    }

    manager.update(todo.clone())?;

    let mut payload = Payload::new();
    payload.insert(Todo::NAME, &todo)?;
    Ok((UPDATED, payload))
}

pub fn remove_todo(id: TodoId, manager: Dep<dyn TodoManager>) -> Step {
    let Some(todo) = manager.find(id) else {
        return Ok((NOT_FOUND, Payload::new()));
    };
    manager.remove(&todo)?;
    Ok((REMOVED, Payload::new()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use http::StatusCode;
    use parking_lot::Mutex;

    use super::*;
    use crate::response::Response;

    /// Counts mutator calls instead of writing anywhere.
    #[derive(Default)]
    struct Recording {
        todos: Mutex<BTreeMap<TodoId, Todo>>,
        updates: Mutex<Vec<Todo>>,
        removals: Mutex<usize>,
    }

    impl Recording {
        fn with(todos: &[Todo]) -> Self {
            let store = Self::default();
            store.todos.lock().extend(todos.iter().map(|t| (t.id, t.clone())));
            store
        }
    }

    impl TodoManager for Recording {
        fn all(&self) -> Vec<Todo> { self.todos.lock().values().cloned().collect() }
        fn find(&self, id: TodoId) -> Option<Todo> { self.todos.lock().get(&id).cloned() }
        fn has(&self, todo: &Todo) -> bool { self.todos.lock().contains_key(&todo.id) }

        fn has_todo_with_description(&self, description: &str, except: Option<TodoId>) -> bool {
            self.todos.lock().values().any(|t| t.description == description && Some(t.id) != except)
        }

        fn next_id(&self) -> Result<TodoId, Error> {
            TodoId::after(self.todos.lock().keys().next_back().copied())
        }

        fn add(&self, todo: Todo) -> Result<(), Error> {
            self.todos.lock().insert(todo.id, todo);
            Ok(())
        }

        fn update(&self, todo: Todo) -> Result<(), Error> {
            self.updates.lock().push(todo.clone());
            self.todos.lock().insert(todo.id, todo);
            Ok(())
        }

        fn remove(&self, todo: &Todo) -> Result<(), Error> {
            *self.removals.lock() += 1;
            self.todos.lock().remove(&todo.id);
            Ok(())
        }
    }

    fn todo(id: u64, description: &str) -> Todo {
        Todo { id: TodoId(id), description: description.to_owned(), completed: false }
    }

    fn app(store: Arc<Recording>) -> App {
        let mut app = App::new();
        app.container_mut().instance::<dyn TodoManager>(store);
        register(&mut app).unwrap();
        app.matching([NOT_FOUND], |_, _| Response::status(StatusCode::NOT_FOUND)).unwrap()
            .matching([DUPLICATE_DESCRIPTION], |_, _| Response::status(StatusCode::CONFLICT)).unwrap()
            .matching([UPDATED], |_, _| Response::status(StatusCode::OK)).unwrap();
        app
    }

    fn update(app: &App, todo: &Todo) -> Response {
        let mut payload = Payload::new();
        payload.insert(Todo::NAME, todo).unwrap();
        app.pipe(&[UPDATE_TODO], payload).unwrap()
    }

    #[test]
    fn updating_an_unknown_todo_is_not_found() {
        let store = Arc::new(Recording::with(&[todo(1, "milk")]));
        let response = update(&app(Arc::clone(&store)), &todo(9, "bread"));

        assert_eq!(response.domain_status(), Some("[2001]"));
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert!(store.updates.lock().is_empty());
        assert_eq!(store.all(), vec![todo(1, "milk")]);
    }

    #[test]
    fn updating_to_another_todos_description_is_a_duplicate() {
        let store = Arc::new(Recording::with(&[todo(1, "milk"), todo(2, "bread")]));
        let response = update(&app(Arc::clone(&store)), &todo(2, "milk"));

        assert_eq!(response.domain_status(), Some("[2000]"));
        assert!(store.updates.lock().is_empty());
        assert_eq!(store.find(TodoId(2)), Some(todo(2, "bread")));
    }

    #[test]
    fn updating_persists_exactly_once() {
        let store = Arc::new(Recording::with(&[todo(1, "milk")]));
        let changed = Todo { completed: true, ..todo(1, "milk") };
        let response = update(&app(Arc::clone(&store)), &changed);

        assert_eq!(response.domain_status(), Some("[1007]"));
        assert_eq!(*store.updates.lock(), vec![changed.clone()]);
        assert_eq!(store.find(TodoId(1)), Some(changed));
    }

    #[test]
    fn adding_assigns_the_next_id_and_rejects_duplicates() {
        let store = Arc::new(Recording::with(&[todo(4, "milk")]));
        let app = app(Arc::clone(&store));

        let fresh = NewTodo { description: "bread".to_owned(), completed: false };
        let mut payload = Payload::new();
        payload.insert(NewTodo::NAME, &fresh).unwrap();
        let outcome = app.make(ADD_TODO, &payload).unwrap();
        assert_eq!(outcome.status, ADDED.into());
        assert_eq!(outcome.payload.field::<Todo>(Todo::NAME).unwrap(), Some(todo(5, "bread")));

        let outcome = app.make(ADD_TODO, &payload).unwrap();
        assert_eq!(outcome.status, DUPLICATE_DESCRIPTION.into());
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn adding_past_the_largest_id_fails_without_writing() {
        let store = Arc::new(Recording::with(&[todo(u64::MAX, "milk")]));
        let app = app(Arc::clone(&store));

        let fresh = NewTodo { description: "bread".to_owned(), completed: false };
        let mut payload = Payload::new();
        payload.insert(NewTodo::NAME, &fresh).unwrap();

        let err = app.make(ADD_TODO, &payload).err().unwrap();
        assert!(matches!(err, Error::IdsExhausted { last: u64::MAX }));
        assert_eq!(store.all(), vec![todo(u64::MAX, "milk")]);
    }

    #[test]
    fn seeing_and_removing() {
        let store = Arc::new(Recording::with(&[todo(1, "milk")]));
        let app = app(Arc::clone(&store));
        let id = Payload::new().with(TodoId::NAME, 1);

        assert_eq!(app.make(SEE_TODO, &id).unwrap().status, FOUND.into());
        assert_eq!(app.make(REMOVE_TODO, &id).unwrap().status, REMOVED.into());
        assert_eq!(app.make(REMOVE_TODO, &id).unwrap().status, NOT_FOUND.into());
        assert_eq!(app.make(SEE_TODO, &id).unwrap().status, NOT_FOUND.into());
        assert_eq!(*store.removals.lock(), 1);

        let listed = app.make(SEE_TODOS, &Payload::new()).unwrap();
        assert_eq!(listed.status, LISTED.into());
        assert_eq!(listed.payload.field::<Vec<Todo>>("todos").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn missing_todo_field_is_unresolvable() {
        let store = Arc::new(Recording::default());
        let err = app(store).pipe(&[UPDATE_TODO], Payload::new()).unwrap_err();
        assert!(matches!(err, Error::UnresolvableDependency { ref name } if name == "todo"));
    }
}
