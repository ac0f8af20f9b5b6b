use super::dto::{CreateTodoRequest, TodoListQuery, UpdateTodoRequest};
use super::error::ApiError;
use super::AppState;
use crate::category_manager::CategoryManager;
use crate::models::{Category, Todo, TodoWithCategory};
use crate::storage::Storage;
use crate::todo_manager::{DeleteConfirmation, TodoManager};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

/// Runs a store-backed operation on the blocking pool.
async fn with_storage<T, E, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
    F: FnOnce(&dyn Storage) -> Result<T, E> + Send + 'static,
{
    let storage = state.storage.clone();
    tokio::task::spawn_blocking(move || op(storage.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("Storage task failed: {}", e)))?
        .map_err(Into::into)
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| {
        ApiError::BadRequest("Validation failed (numeric string is expected)".to_string())
    })
}

pub(crate) async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories =
        with_storage(&state, |storage| CategoryManager::new(storage).list_categories()).await?;
    Ok(Json(categories))
}

pub(crate) async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(request) = payload?;
    let validated = request.validate()?;

    let todo = with_storage(&state, move |storage| {
        TodoManager::new(storage).create(validated.name, validated.category_id, validated.status)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

pub(crate) async fn list_todos(
    State(state): State<AppState>,
    query: Result<Query<TodoListQuery>, QueryRejection>,
) -> Result<Json<Vec<TodoWithCategory>>, ApiError> {
    let Query(query) = query?;
    let category_id = query.category_id()?;
    let todos =
        with_storage(&state, move |storage| TodoManager::new(storage).get_all(category_id)).await?;
    Ok(Json(todos))
}

pub(crate) async fn update_todo(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Path(id) = id?;
    let id = parse_id(&id)?;
    let Json(request) = payload?;
    let changes = request.validate()?;

    let todo =
        with_storage(&state, move |storage| TodoManager::new(storage).update(id, changes)).await?;
    Ok(Json(todo))
}

pub(crate) async fn delete_todo(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<DeleteConfirmation>, ApiError> {
    let Path(id) = id?;
    let id = parse_id(&id)?;
    let confirmation =
        with_storage(&state, move |storage| TodoManager::new(storage).delete(id)).await?;
    Ok(Json(confirmation))
}
