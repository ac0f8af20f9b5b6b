use crate::models::{
    NewTodo, Status, Todo, TodoChanges, TodoWithCategory, CAPACITY_EXCEEDED_MESSAGE,
    MAX_TODOS_PER_CATEGORY,
};
use crate::storage::{Storage, StorageError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TODO_DELETED_MESSAGE: &str = "Todo deleted successfully";

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("{}", CAPACITY_EXCEEDED_MESSAGE)]
    CapacityExceeded { category_id: i64 },
    #[error("Todo not found")]
    NotFound(i64),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub message: String,
}

impl Default for DeleteConfirmation {
    fn default() -> Self {
        Self {
            message: TODO_DELETED_MESSAGE.to_string(),
        }
    }
}

/// Todo operations over a [`Storage`]. Holds no state of its own; every call
/// re-reads what it needs.
pub struct TodoManager<'a> {
    storage: &'a dyn Storage,
}

impl<'a> TodoManager<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Inserts a todo unless its category already holds the maximum.
    ///
    /// The count and the insert are separate store calls, so two concurrent
    /// creates for the same category can both pass the check.
    pub fn create(&self, name: String, category_id: i64, status: Status) -> Result<Todo, TodoError> {
        let count = self.storage.count_todos_in_category(category_id)?;
        if count >= MAX_TODOS_PER_CATEGORY {
            tracing::info!(category_id, count, "rejected todo: category is full");
            return Err(TodoError::CapacityExceeded { category_id });
        }

        let todo = self.storage.insert_todo(&NewTodo {
            name,
            category_id,
            status,
        })?;
        tracing::debug!(todo_id = todo.id, category_id, "created todo");
        Ok(todo)
    }

    pub fn get_all(&self, category_id: Option<i64>) -> Result<Vec<TodoWithCategory>, TodoError> {
        Ok(self.storage.list_todos(category_id)?)
    }

    /// Applies `changes` to an existing todo. A category change is not
    /// checked against the capacity limit.
    pub fn update(&self, id: i64, changes: TodoChanges) -> Result<Todo, TodoError> {
        let mut todo = self.storage.get_todo(id)?.ok_or_else(|| {
            tracing::info!(todo_id = id, "update for unknown todo");
            TodoError::NotFound(id)
        })?;

        changes.apply(&mut todo);
        let updated = self.storage.update_todo(&todo)?;
        tracing::debug!(todo_id = id, status = %updated.status, "updated todo");
        Ok(updated)
    }

    /// Removes a todo. A missing row surfaces as the store's own error.
    pub fn delete(&self, id: i64) -> Result<DeleteConfirmation, TodoError> {
        self.storage.delete_todo(id)?;
        tracing::debug!(todo_id = id, "deleted todo");
        Ok(DeleteConfirmation::default())
    }
}
