use super::migrations;
use super::{Storage, StorageError};
use crate::models::{Category, CategorySummary, NewTodo, Status, Todo, TodoWithCategory};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct SqliteStorage {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path` and migrates it.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut conn = Connection::open(&path)
            .map_err(|e| StorageError::Storage(format!("Failed to open database: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StorageError::Storage(format!("Failed to enable foreign keys: {}", e)))?;
        migrations::apply_migrations(&mut conn)?;

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Storage(format!("Failed to lock connection: {}", e)))
    }

    fn status_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Status> {
        let raw: String = row.get(idx)?;
        raw.parse::<Status>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    }

    fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<Todo> {
        Ok(Todo {
            id: row.get(0)?,
            name: row.get(1)?,
            status: Self::status_from_column(row, 2)?,
            category_id: row.get(3)?,
        })
    }

    fn load_categories(&self, conn: &Connection) -> Result<Vec<Category>, StorageError> {
        let mut stmt = conn
            .prepare("SELECT id, name FROM categories ORDER BY id")
            .map_err(|e| {
                StorageError::Storage(format!("Failed to prepare categories query: {}", e))
            })?;

        let category_iter = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    todos: Vec::new(),
                })
            })
            .map_err(|e| StorageError::Storage(format!("Failed to query categories: {}", e)))?;

        let mut categories = Vec::new();
        for category in category_iter {
            categories.push(category.map_err(|e| {
                StorageError::Storage(format!("Failed to read category: {}", e))
            })?);
        }
        Ok(categories)
    }

    fn load_todos(&self, conn: &Connection) -> Result<Vec<Todo>, StorageError> {
        let mut stmt = conn
            .prepare("SELECT id, name, status, category_id FROM todos ORDER BY id")
            .map_err(|e| StorageError::Storage(format!("Failed to prepare todos query: {}", e)))?;

        let todo_iter = stmt
            .query_map([], Self::todo_from_row)
            .map_err(|e| StorageError::Storage(format!("Failed to query todos: {}", e)))?;

        let mut todos = Vec::new();
        for todo in todo_iter {
            todos.push(
                todo.map_err(|e| StorageError::Storage(format!("Failed to read todo: {}", e)))?,
            );
        }
        Ok(todos)
    }
}

impl Storage for SqliteStorage {
    fn insert_category(&self, name: &str) -> Result<Category, StorageError> {
        let conn = self.get_connection()?;
        conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
        Ok(Category {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            todos: Vec::new(),
        })
    }

    fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let conn = self.get_connection()?;
        let mut categories = self.load_categories(&conn)?;
        let todos = self.load_todos(&conn)?;

        let index: HashMap<i64, usize> = categories
            .iter()
            .enumerate()
            .map(|(pos, category)| (category.id, pos))
            .collect();
        for todo in todos {
            match index.get(&todo.category_id) {
                Some(&pos) => categories[pos].todos.push(todo),
                None => {
                    return Err(StorageError::InvalidData(format!(
                        "todo {} references missing category {}",
                        todo.id, todo.category_id
                    )))
                }
            }
        }

        Ok(categories)
    }

    fn count_todos_in_category(&self, category_id: i64) -> Result<u64, StorageError> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM todos WHERE category_id = ?1",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn insert_todo(&self, todo: &NewTodo) -> Result<Todo, StorageError> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO todos (name, status, category_id) VALUES (?1, ?2, ?3)",
            params![todo.name, todo.status.as_str(), todo.category_id],
        )?;
        Ok(Todo {
            id: conn.last_insert_rowid(),
            name: todo.name.clone(),
            status: todo.status,
            category_id: todo.category_id,
        })
    }

    fn get_todo(&self, id: i64) -> Result<Option<Todo>, StorageError> {
        let conn = self.get_connection()?;
        let todo = conn
            .query_row(
                "SELECT id, name, status, category_id FROM todos WHERE id = ?1",
                params![id],
                Self::todo_from_row,
            )
            .optional()?;
        Ok(todo)
    }

    fn list_todos(
        &self,
        category_id: Option<i64>,
    ) -> Result<Vec<TodoWithCategory>, StorageError> {
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.name, t.status, t.category_id, c.id, c.name
                 FROM todos t
                 JOIN categories c ON c.id = t.category_id
                 WHERE ?1 IS NULL OR t.category_id = ?1
                 ORDER BY t.id",
            )
            .map_err(|e| StorageError::Storage(format!("Failed to prepare todos query: {}", e)))?;

        let rows = stmt
            .query_map(params![category_id], |row| {
                Ok(TodoWithCategory {
                    todo: Self::todo_from_row(row)?,
                    category: CategorySummary {
                        id: row.get(4)?,
                        name: row.get(5)?,
                    },
                })
            })
            .map_err(|e| StorageError::Storage(format!("Failed to query todos: {}", e)))?;

        let mut todos = Vec::new();
        for row in rows {
            todos.push(
                row.map_err(|e| StorageError::Storage(format!("Failed to read todo: {}", e)))?,
            );
        }
        Ok(todos)
    }

    fn update_todo(&self, todo: &Todo) -> Result<Todo, StorageError> {
        let conn = self.get_connection()?;
        let changed = conn.execute(
            "UPDATE todos SET name = ?1, status = ?2, category_id = ?3 WHERE id = ?4",
            params![todo.name, todo.status.as_str(), todo.category_id, todo.id],
        )?;
        if changed == 0 {
            return Err(StorageError::RecordNotFound {
                operation: "update",
                id: todo.id,
            });
        }
        Ok(todo.clone())
    }

    fn delete_todo(&self, id: i64) -> Result<(), StorageError> {
        let conn = self.get_connection()?;
        let changed = conn.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::RecordNotFound {
                operation: "delete",
                id,
            });
        }
        Ok(())
    }
}
