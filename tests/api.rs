use std::net::SocketAddr;
use std::sync::Arc;

use capped_todos::api::{build_router, AppState};
use capped_todos::models::{NewTodo, Status};
use capped_todos::storage::{SqliteStorage, Storage};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

struct TestServer {
    addr: SocketAddr,
    storage: Arc<SqliteStorage>,
    client: reqwest::Client,
    _temp_dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix("capped_todos_api")
            .tempdir()
            .expect("tempdir");
        let storage = Arc::new(SqliteStorage::new(temp_dir.path().join("api.db")).expect("open store"));
        let app = build_router(AppState::new(storage.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

        Self {
            addr,
            storage,
            client: reqwest::Client::new(),
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn category(&self, name: &str) -> i64 {
        self.storage.insert_category(name).expect("insert category").id
    }

    fn todo(&self, name: &str, category_id: i64) -> i64 {
        self.storage
            .insert_todo(&NewTodo {
                name: name.to_string(),
                category_id,
                status: Status::NotDone,
            })
            .expect("insert todo")
            .id
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.expect("send");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("send");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    async fn patch(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .patch(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("send");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.delete(self.url(path)).send().await.expect("send");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }
}

#[tokio::test]
async fn get_categories_returns_nested_todos() {
    let server = TestServer::start().await;
    let work = server.category("Work");
    server.todo("Write report", work);

    let (status, body) = server.get("/categories").await;

    assert_eq!(status, StatusCode::OK);
    let categories = body.as_array().expect("array");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["name"], "Work");
    assert_eq!(categories[0]["todos"][0]["name"], "Write report");
    assert_eq!(categories[0]["todos"][0]["categoryId"], work);
}

#[tokio::test]
async fn post_todo_creates_row() {
    let server = TestServer::start().await;
    let personal = server.category("Personal");

    let (status, body) = server
        .post(
            "/todos",
            json!({"name": "Buy milk", "categoryId": personal, "status": "NOTDONE"}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_i64().is_some());
    assert_eq!(body["name"], "Buy milk");
    assert_eq!(body["status"], "NOTDONE");
    assert_eq!(server.storage.count_todos_in_category(personal).unwrap(), 1);
}

#[tokio::test]
async fn post_todo_into_full_category_is_rejected() {
    let server = TestServer::start().await;
    let work = server.category("Work");
    for i in 0..5 {
        server.todo(&format!("Task {}", i + 1), work);
    }

    let (status, body) = server
        .post(
            "/todos",
            json!({"name": "The 6th Task", "categoryId": work, "status": "NOTDONE"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A category may contain at most 5 tasks");
    assert_eq!(server.storage.count_todos_in_category(work).unwrap(), 5);
}

#[tokio::test]
async fn post_todo_validation_errors() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post("/todos", json!({"name": "", "categoryId": 0, "status": "LATER"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .expect("fields")
        .iter()
        .filter_map(|f| f["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["name", "categoryId", "status"]);
}

#[tokio::test]
async fn post_todo_malformed_json_is_bad_request() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/todos"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("send");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json error body");
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn post_todo_for_unknown_category_is_server_error() {
    let server = TestServer::start().await;

    let (status, _) = server
        .post(
            "/todos",
            json!({"name": "Orphan", "categoryId": 42, "status": "NOTDONE"}),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn get_todos_with_and_without_filter() {
    let server = TestServer::start().await;
    let personal = server.category("Personal");
    let work = server.category("Work");
    server.todo("Personal task", personal);
    server.todo("Work task", work);

    let (status, body) = server.get("/todos").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["category"]["name"], "Personal");

    let (status, body) = server.get(&format!("/todos?category={}", personal)).await;
    assert_eq!(status, StatusCode::OK);
    let todos = body.as_array().unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0]["name"], "Personal task");
}

#[tokio::test]
async fn get_todos_for_category_without_todos_is_empty() {
    let server = TestServer::start().await;
    let work = server.category("Work");
    let other = server.category("Other");
    server.todo("Work task", work);

    let (status, body) = server.get(&format!("/todos?category={}", other)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn get_todos_with_non_numeric_category_is_bad_request() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/todos?category=work").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "category");
}

#[tokio::test]
async fn get_todos_with_repeated_category_returns_error_body() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/todos?category=1&category=2"))
        .send()
        .await
        .expect("send");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json error body");
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn post_todo_accepts_whole_float_category_id() {
    let server = TestServer::start().await;
    let work = server.category("Work");

    let (status, body) = server
        .post(
            "/todos",
            json!({"name": "Float id", "categoryId": work as f64, "status": "NOTDONE"}),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["categoryId"], work);
}

#[tokio::test]
async fn patch_todo_updates_status() {
    let server = TestServer::start().await;
    let work = server.category("Work");
    let id = server.todo("To be updated", work);

    let (status, body) = server
        .patch(&format!("/todos/{}", id), json!({"status": "DONE"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DONE");
    assert_eq!(body["name"], "To be updated");
    let stored = server.storage.get_todo(id).unwrap().expect("todo exists");
    assert_eq!(stored.status, Status::Done);
}

#[tokio::test]
async fn patch_can_rename_and_move_into_full_category() {
    let server = TestServer::start().await;
    let work = server.category("Work");
    let personal = server.category("Personal");
    for i in 0..5 {
        server.todo(&format!("Task {}", i + 1), work);
    }
    let id = server.todo("Groceries", personal);

    let (status, body) = server
        .patch(
            &format!("/todos/{}", id),
            json!({"status": "DONE", "name": "Expense report", "categoryId": work}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categoryId"], work);
    assert_eq!(body["name"], "Expense report");
    assert_eq!(body["status"], "DONE");
    assert_eq!(server.storage.count_todos_in_category(work).unwrap(), 6);
    assert_eq!(server.storage.count_todos_in_category(personal).unwrap(), 0);
}

#[tokio::test]
async fn patch_unknown_todo_is_not_found() {
    let server = TestServer::start().await;

    let (status, body) = server
        .patch("/todos/999", json!({"status": "DONE"}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Todo not found");
    assert!(server.storage.list_todos(None).unwrap().is_empty());
}

#[tokio::test]
async fn patch_with_invalid_status_is_bad_request() {
    let server = TestServer::start().await;
    let work = server.category("Work");
    let id = server.todo("Task", work);

    let (status, _) = server
        .patch(&format!("/todos/{}", id), json!({"status": "FINISHED"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let stored = server.storage.get_todo(id).unwrap().expect("todo exists");
    assert_eq!(stored.status, Status::NotDone);
}

#[tokio::test]
async fn patch_with_non_numeric_id_is_bad_request() {
    let server = TestServer::start().await;
    let (status, body) = server
        .patch("/todos/abc", json!({"status": "DONE"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn delete_todo_removes_row() {
    let server = TestServer::start().await;
    let work = server.category("Work");
    let id = server.todo("To be deleted", work);

    let (status, body) = server.delete(&format!("/todos/{}", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Todo deleted successfully"}));
    assert!(server.storage.get_todo(id).unwrap().is_none());

    let (_, body) = server.get("/todos").await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn delete_unknown_todo_is_server_error() {
    let server = TestServer::start().await;

    let (status, body) = server.delete("/todos/99").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Record to delete does not exist: todo 99");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let server = TestServer::start().await;

    let response = server
        .client
        .get(server.url("/categories"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .expect("send");
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-123")
    );

    let response = server
        .client
        .get(server.url("/categories"))
        .send()
        .await
        .expect("send");
    assert!(response.headers().contains_key("x-request-id"));
}
