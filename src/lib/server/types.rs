use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::engine::{EngineError, ImageEngine};
use crate::tasks::TaskManager;

/// Shared by every HTTP handler and WebSocket session.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn ImageEngine>,
    pub tasks: Arc<Mutex<TaskManager>>,
    pub search_limit: u64,
}

pub struct ImageServer {
    pub state: AppState,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl AppState {
    pub fn new(engine: Arc<dyn ImageEngine>, search_limit: u64) -> Self {
        AppState {
            engine,
            tasks: Arc::new(Mutex::new(TaskManager::new())),
            search_limit,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
