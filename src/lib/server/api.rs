use std::collections::HashSet;

use axum::{
    Json, Router,
    extract::{Query, State as AxumState, ws::WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

use super::pull::handle_socket;
use super::types::{ApiError, AppState, ImageServer};
use crate::config::loader::MAX_SEARCH_LIMIT;
use crate::models::{Image, Task, TaskKey};
use crate::tasks::TaskManager;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u64>,
}

/// Fills `is_pulling` from the task table. A running pull means the image
/// is not (fully) pulled yet.
fn mark_pulling(image: &mut Image, tasks: &TaskManager) {
    if tasks.is_running(&TaskKey::new(image.name.clone(), image.tag.clone())) {
        image.start_pulling();
    } else {
        image.is_pulling = Some(false);
    }
}

impl ImageServer {
    pub fn new(state: AppState, address: &str, port: u16) -> Self {
        Self {
            state,
            address: address.to_string(),
            port,
        }
    }

    async fn list_images(
        AxumState(state): AxumState<AppState>,
    ) -> Result<Json<Vec<Image>>, ApiError> {
        let mut images = state.engine.list_images().await?;

        let tasks = state.tasks.lock().await;
        for image in &mut images {
            mark_pulling(image, &tasks);
        }
        Ok(Json(images))
    }

    async fn search_images(
        AxumState(state): AxumState<AppState>,
        Query(query): Query<SearchQuery>,
    ) -> Result<Json<Vec<Image>>, ApiError> {
        let term = query.q.trim();
        if term.is_empty() {
            return Err(ApiError::BadRequest(
                "Query parameter 'q' is required".to_string(),
            ));
        }
        let limit = query
            .limit
            .unwrap_or(state.search_limit)
            .clamp(1, MAX_SEARCH_LIMIT);

        let mut images = state.engine.search_images(term, limit).await?;
        let local: HashSet<String> = state
            .engine
            .list_images()
            .await?
            .iter()
            .map(Image::reference)
            .collect();

        let tasks = state.tasks.lock().await;
        for image in &mut images {
            image.is_pulled = Some(local.contains(&image.reference()));
            mark_pulling(image, &tasks);
        }
        Ok(Json(images))
    }

    async fn list_tasks(AxumState(state): AxumState<AppState>) -> Json<Vec<Task>> {
        Json(state.tasks.lock().await.list())
    }

    async fn pull_images(
        ws: WebSocketUpgrade,
        AxumState(state): AxumState<AppState>,
    ) -> impl IntoResponse {
        ws.on_upgrade(move |socket| handle_socket(socket, state))
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/images", get(ImageServer::list_images))
            .route("/api/images/search", get(ImageServer::search_images))
            .route("/api/tasks", get(ImageServer::list_tasks))
            .route("/ws/images/pull", get(ImageServer::pull_images))
            .with_state(self.state.clone())
    }

    pub async fn start_server(self) -> std::io::Result<()> {
        let app = self.router();
        let bind = format!("{}:{}", self.address, self.port);

        let listener = TcpListener::bind(&bind).await?;
        info!("Listening on {}", bind);

        axum::serve(listener, app).await
    }
}
