use crate::models::{Category, NewTodo, Status};
use crate::storage::{SqliteStorage, Storage};
use std::path::PathBuf;
use tempfile::TempDir;

/// A migrated SQLite store in a temporary directory that is removed on drop.
pub struct TestStorage {
    temp_dir: TempDir,
    storage: SqliteStorage,
}

impl TestStorage {
    pub fn new() -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix("capped_todos_test")
            .tempdir()
            .expect("Failed to create temporary directory");

        let storage = SqliteStorage::new(temp_dir.path().join("test.db"))
            .expect("Failed to create test storage");

        Self { temp_dir, storage }
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Adds a category holding `count` open todos named "Task 1".."Task n".
    pub fn seed_category(&self, name: &str, count: usize) -> Category {
        let mut category = self
            .storage
            .insert_category(name)
            .expect("Failed to add category");
        for i in 0..count {
            let todo = self
                .storage
                .insert_todo(&NewTodo {
                    name: format!("Task {}", i + 1),
                    category_id: category.id,
                    status: Status::NotDone,
                })
                .expect("Failed to add todo");
            category.todos.push(todo);
        }
        category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_initialization() {
        let test_storage = TestStorage::new();
        assert!(test_storage.path().join("test.db").exists());
        assert!(test_storage.storage().list_categories().unwrap().is_empty());
        assert!(test_storage.storage().list_todos(None).unwrap().is_empty());
    }

    #[test]
    fn test_seed_category() {
        let test_storage = TestStorage::new();
        let work = test_storage.seed_category("Work", 3);
        assert_eq!(work.todos.len(), 3);
        assert_eq!(
            test_storage.storage().count_todos_in_category(work.id).unwrap(),
            3
        );
    }
}
