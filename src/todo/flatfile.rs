//! A [`TodoManager`] backed by a single JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{Todo, TodoId, TodoManager};
use crate::error::Error;

/// Keeps every todo in memory and rewrites the whole file after each
/// mutation.
///
/// The file holds a JSON array of todos. A missing file, or one that does
/// not hold such an array, starts an empty list. Separate processes writing
/// the same file overwrite each other; the last write wins.
pub struct FlatFileTodoManager {
    file: PathBuf,
    todos: Mutex<BTreeMap<TodoId, Todo>>,
}

impl FlatFileTodoManager {
    pub fn open(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let todos = load(&file);
        debug!(file = %file.display(), count = todos.len(), "todo store opened");
        Self { file, todos: Mutex::new(todos) }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    fn write(&self, todos: &BTreeMap<TodoId, Todo>) -> Result<(), Error> {
        let list: Vec<&Todo> = todos.values().collect();
        let bytes = serde_json::to_vec_pretty(&list)?;

        if let Some(dir) = self.file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| self.store_error(source))?;
        }
        fs::write(&self.file, bytes).map_err(|source| self.store_error(source))
    }

    fn store_error(&self, source: std::io::Error) -> Error {
        Error::Store { path: self.file.clone(), source }
    }
}

fn load(file: &Path) -> BTreeMap<TodoId, Todo> {
    let Ok(bytes) = fs::read(file) else {
        return BTreeMap::new();
    };
    match serde_json::from_slice::<Vec<Todo>>(&bytes) {
        Ok(list) => list.into_iter().map(|todo| (todo.id, todo)).collect(),
        Err(e) => {
            warn!(file = %file.display(), "ignoring unreadable todo store: {e}");
            BTreeMap::new()
        }
    }
}

impl TodoManager for FlatFileTodoManager {
    fn all(&self) -> Vec<Todo> {
        self.todos.lock().values().cloned().collect()
    }

    fn find(&self, id: TodoId) -> Option<Todo> {
        self.todos.lock().get(&id).cloned()
    }

    fn has(&self, todo: &Todo) -> bool {
        self.todos.lock().contains_key(&todo.id)
    }

    fn has_todo_with_description(&self, description: &str, except: Option<TodoId>) -> bool {
        self.todos
            .lock()
            .values()
            .any(|todo| todo.description == description && Some(todo.id) != except)
    }

    fn next_id(&self) -> Result<TodoId, Error> {
        let todos = self.todos.lock();
        TodoId::after(todos.keys().next_back().copied())
    }

    fn add(&self, todo: Todo) -> Result<(), Error> {
        let mut todos = self.todos.lock();
        todos.insert(todo.id, todo);
        self.write(&todos)
    }

    fn update(&self, todo: Todo) -> Result<(), Error> {
        let mut todos = self.todos.lock();
        todos.insert(todo.id, todo);
        self.write(&todos)
    }

    fn remove(&self, todo: &Todo) -> Result<(), Error> {
        let mut todos = self.todos.lock();
        todos.remove(&todo.id);
        self.write(&todos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(id: u64, description: &str) -> Todo {
        Todo { id: TodoId(id), description: description.to_owned(), completed: false }
    }

    #[test]
    fn missing_or_garbage_files_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FlatFileTodoManager::open(dir.path().join("absent.json")).all().is_empty());

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{\"not\": \"a list\"}").unwrap();
        assert!(FlatFileTodoManager::open(&garbage).all().is_empty());
    }

    #[test]
    fn mutations_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("db").join("todos.json");

        let store = FlatFileTodoManager::open(&file);
        store.add(todo(1, "milk")).unwrap();
        store.add(todo(2, "bread")).unwrap();
        store.update(Todo { completed: true, ..todo(1, "oat milk") }).unwrap();
        store.remove(&todo(2, "bread")).unwrap();

        let reopened = FlatFileTodoManager::open(&file);
        assert_eq!(reopened.all(), vec![Todo { completed: true, ..todo(1, "oat milk") }]);
    }

    #[test]
    fn reading_twice_without_mutation_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileTodoManager::open(dir.path().join("todos.json"));
        store.add(todo(3, "eggs")).unwrap();

        assert_eq!(store.all(), store.all());
    }

    #[test]
    fn description_checks_can_skip_one_todo() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileTodoManager::open(dir.path().join("todos.json"));
        store.add(todo(1, "milk")).unwrap();

        assert!(store.has_todo_with_description("milk", None));
        assert!(store.has_todo_with_description("milk", Some(TodoId(2))));
        assert!(!store.has_todo_with_description("milk", Some(TodoId(1))));
        assert!(!store.has_todo_with_description("bread", None));
    }

    #[test]
    fn ids_follow_the_highest_stored_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileTodoManager::open(dir.path().join("todos.json"));
        assert_eq!(store.next_id().unwrap(), TodoId(1));

        store.add(todo(7, "later")).unwrap();
        assert_eq!(store.next_id().unwrap(), TodoId(8));
        assert!(store.has(&todo(7, "whatever")));
        assert_eq!(store.find(TodoId(7)).map(|t| t.description), Some("later".to_owned()));
    }

    #[test]
    fn the_largest_id_has_no_successor() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("todos.json");
        fs::write(&file, format!(r#"[{{"id":{},"description":"x","completed":false}}]"#, u64::MAX)).unwrap();

        let store = FlatFileTodoManager::open(&file);
        assert_eq!(store.all().len(), 1);
        assert!(matches!(store.next_id(), Err(Error::IdsExhausted { last: u64::MAX })));
    }
}
