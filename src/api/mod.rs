//! HTTP surface: routing, request tracing, and the mapping between JSON
//! bodies and the todo/category managers.

use crate::storage::Storage;
use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, patch};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

pub mod dto;
pub mod error;
mod handlers;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared handler dependencies.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/categories", get(handlers::list_categories))
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route(
            "/todos/:id",
            patch(handlers::update_todo).delete(handlers::delete_todo),
        )
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn request_tracing_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        route = %request.uri().path(),
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
