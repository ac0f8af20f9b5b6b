use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of todos a single category may hold.
pub const MAX_TODOS_PER_CATEGORY: u64 = 5;

/// Clients match on this exact text to detect a full category.
pub const CAPACITY_EXCEEDED_MESSAGE: &str = "A category may contain at most 5 tasks";

pub const MAX_TODO_NAME_LEN: usize = 100;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    NotDone,
    Done,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotDone => "NOTDONE",
            Status::Done => "DONE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOTDONE" => Ok(Status::NotDone),
            "DONE" => Ok(Status::Done),
            _ => Err(StatusError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Invalid status value: {0}")]
    InvalidStatus(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub name: String,
    pub status: Status,
    pub category_id: i64,
}

/// A todo annotated with its owning category, as returned by todo listings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoWithCategory {
    #[serde(flatten)]
    pub todo: Todo,
    pub category: CategorySummary,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub todos: Vec<Todo>,
}

impl Category {
    pub fn summary(&self) -> CategorySummary {
        CategorySummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Fields for a todo that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub name: String,
    pub category_id: i64,
    pub status: Status,
}

/// Field overrides applied by an update. `status` is always written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoChanges {
    pub status: Status,
    pub name: Option<String>,
    pub category_id: Option<i64>,
}

impl TodoChanges {
    pub fn status(status: Status) -> Self {
        Self {
            status,
            name: None,
            category_id: None,
        }
    }

    pub fn apply(&self, todo: &mut Todo) {
        todo.status = self.status;
        if let Some(ref name) = self.name {
            todo.name = name.clone();
        }
        if let Some(category_id) = self.category_id {
            todo.category_id = category_id;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field problem found in one input, in field order.
#[derive(Debug, Error, Clone, PartialEq, Eq, Default)]
#[error("{}", self.joined())]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn push(&mut self, field: &str, message: &str) {
        self.fields.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn joined(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn validate_todo_name(name: &str, errors: &mut ValidationError) {
    if name.is_empty() {
        errors.push("name", "Name cannot be empty");
    } else if name.chars().count() > MAX_TODO_NAME_LEN {
        errors.push("name", "Name is too long (max 100 characters)");
    }
}

pub fn validate_category_id(category_id: i64, errors: &mut ValidationError) {
    if category_id < 1 {
        errors.push("categoryId", "Category ID must be greater than 0");
    }
}
