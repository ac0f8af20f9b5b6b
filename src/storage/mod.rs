use crate::models::{Category, NewTodo, Todo, TodoWithCategory};
use thiserror::Error;

#[cfg(test)]
pub(crate) mod test_utils;

mod migrations;
mod sqlite;
pub use sqlite::SqliteStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Record to {operation} does not exist: todo {id}")]
    RecordNotFound { operation: &'static str, id: i64 },
}

/// Row-level access to categories and todos.
///
/// Each method is one independent Store interaction; nothing is held
/// between calls, so a sequence of calls is not atomic.
pub trait Storage: Send + Sync {
    fn insert_category(&self, name: &str) -> Result<Category, StorageError>;
    /// Every category with its todos attached, in insertion order.
    fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    fn count_todos_in_category(&self, category_id: i64) -> Result<u64, StorageError>;
    fn insert_todo(&self, todo: &NewTodo) -> Result<Todo, StorageError>;
    fn get_todo(&self, id: i64) -> Result<Option<Todo>, StorageError>;
    fn list_todos(&self, category_id: Option<i64>)
        -> Result<Vec<TodoWithCategory>, StorageError>;
    /// Writes every field of `todo` to the row with the same id.
    fn update_todo(&self, todo: &Todo) -> Result<Todo, StorageError>;
    /// Fails with [`StorageError::RecordNotFound`] when no row has `id`.
    fn delete_todo(&self, id: i64) -> Result<(), StorageError>;
}
