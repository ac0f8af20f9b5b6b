//! Request bodies and their validation.
//!
//! Bodies are deserialized loosely (every field as an optional JSON value) so
//! that a wrong type becomes a field error in the response instead of a
//! generic decode failure.

use crate::models::{
    validate_category_id, validate_todo_name, Status, TodoChanges, ValidationError,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub category_id: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub category_id: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TodoListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCreateTodo {
    pub name: String,
    pub category_id: i64,
    pub status: Status,
}

fn name_field(value: Option<&Value>, errors: &mut ValidationError) -> Option<String> {
    match value {
        Some(Value::String(name)) => {
            let before = errors.fields.len();
            validate_todo_name(name, errors);
            (errors.fields.len() == before).then(|| name.clone())
        }
        Some(_) => {
            errors.push("name", "Name must be a string");
            None
        }
        None => {
            errors.push("name", "Name cannot be empty");
            None
        }
    }
}

/// A JSON number with no fractional part that fits in `i64`; `1.0` counts.
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64)
            .map(|n| n as i64)
    })
}

fn category_id_field(value: Option<&Value>, errors: &mut ValidationError) -> Option<i64> {
    match value.and_then(whole_number) {
        Some(category_id) => {
            let before = errors.fields.len();
            validate_category_id(category_id, errors);
            (errors.fields.len() == before).then_some(category_id)
        }
        None => {
            errors.push("categoryId", "Category ID must be an integer");
            None
        }
    }
}

fn status_field(value: Option<&Value>, errors: &mut ValidationError) -> Option<Status> {
    let status = value
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<Status>().ok());
    if status.is_none() {
        errors.push("status", "Invalid status value");
    }
    status
}

impl CreateTodoRequest {
    pub fn validate(&self) -> Result<ValidatedCreateTodo, ValidationError> {
        let mut errors = ValidationError::default();
        let name = name_field(self.name.as_ref(), &mut errors);
        let category_id = category_id_field(self.category_id.as_ref(), &mut errors);
        let status = status_field(self.status.as_ref(), &mut errors);

        match (name, category_id, status) {
            (Some(name), Some(category_id), Some(status)) if errors.is_empty() => {
                Ok(ValidatedCreateTodo {
                    name,
                    category_id,
                    status,
                })
            }
            _ => Err(errors),
        }
    }
}

impl UpdateTodoRequest {
    /// `status` is required; `name` and `categoryId` are checked only when
    /// present.
    pub fn validate(&self) -> Result<TodoChanges, ValidationError> {
        let mut errors = ValidationError::default();
        let status = status_field(self.status.as_ref(), &mut errors);
        let name = self
            .name
            .as_ref()
            .and_then(|value| name_field(Some(value), &mut errors));
        let category_id = self
            .category_id
            .as_ref()
            .and_then(|value| category_id_field(Some(value), &mut errors));

        match status {
            Some(status) if errors.is_empty() => Ok(TodoChanges {
                status,
                name,
                category_id,
            }),
            _ => Err(errors),
        }
    }
}

impl TodoListQuery {
    /// An absent or empty `category` means no filter.
    pub fn category_id(&self) -> Result<Option<i64>, ValidationError> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| {
                let mut errors = ValidationError::default();
                errors.push("category", "Category must be a numeric id");
                errors
            }),
        }
    }
}
