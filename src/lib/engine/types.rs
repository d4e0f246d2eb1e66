use async_trait::async_trait;
use bollard::Docker;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Image;

/// One progress message from an image pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullProgress {
    /// Layer id, or the tag for whole-image messages.
    pub id: Option<String>,
    pub status: Option<String>,
    pub progress: Option<String>,
}

pub type PullStream = BoxStream<'static, EngineResult<PullProgress>>;

/// Where images come from: the local daemon and the registry it talks to.
#[async_trait]
pub trait ImageEngine: Send + Sync {
    async fn list_images(&self) -> EngineResult<Vec<Image>>;

    async fn search_images(&self, term: &str, limit: u64) -> EngineResult<Vec<Image>>;

    /// Dropping the returned stream abandons the pull.
    fn pull_image(&self, repository: &str, tag: &str) -> PullStream;
}

#[derive(Debug, Clone)]
pub struct DockerClient {
    pub client: Docker,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to connect to docker at '{socket}': {source}")]
    Connect {
        socket: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("Docker request failed: {0}")]
    Request(#[from] bollard::errors::Error),

    /// Message reported by the daemon while pulling.
    #[error("{0}")]
    Pull(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
