use async_trait::async_trait;
use bollard::{
    API_DEFAULT_VERSION, Docker,
    image::{CreateImageOptions, ListImagesOptions, SearchImagesOptions},
};
use futures_util::stream::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::convert::{image_from_search, images_from_summary};
use super::types::{DockerClient, EngineError, EngineResult, ImageEngine, PullProgress, PullStream};
use crate::config::DockerConfig;
use crate::models::Image;

const PULL_BUFFER: usize = 32;

impl DockerClient {
    /// `timeout_seconds` applies to both the configured socket and the
    /// local defaults.
    pub fn connect(config: &DockerConfig) -> EngineResult<Self> {
        let client = match &config.socket {
            Some(socket) => {
                Docker::connect_with_unix(socket, config.timeout_seconds, API_DEFAULT_VERSION)
                    .map_err(|source| EngineError::Connect {
                        socket: socket.clone(),
                        source,
                    })?
            }
            None => Docker::connect_with_unix_defaults().map_err(|source| EngineError::Connect {
                socket: "unix defaults".to_string(),
                source,
            })?,
        }
        .with_timeout(config.timeout());

        info!("Docker client ready");
        Ok(DockerClient { client })
    }
}

fn pull_error(err: bollard::errors::Error) -> EngineError {
    match err {
        bollard::errors::Error::DockerStreamError { error } => EngineError::Pull(error),
        bollard::errors::Error::DockerResponseServerError { message, .. } => {
            EngineError::Pull(message)
        }
        other => EngineError::Request(other),
    }
}

#[async_trait]
impl ImageEngine for DockerClient {
    async fn list_images(&self) -> EngineResult<Vec<Image>> {
        let options = ListImagesOptions::<String> {
            all: false,
            ..Default::default()
        };

        let summaries = self.client.list_images(Some(options)).await?;
        debug!("Daemon reported {} local images", summaries.len());

        Ok(summaries.iter().flat_map(images_from_summary).collect())
    }

    async fn search_images(&self, term: &str, limit: u64) -> EngineResult<Vec<Image>> {
        let options = SearchImagesOptions {
            term: term.to_string(),
            limit: Some(limit),
            ..Default::default()
        };

        let results = self.client.search_images(options).await?;
        debug!("Search for {:?} returned {} results", term, results.len());

        Ok(results.into_iter().filter_map(image_from_search).collect())
    }

    fn pull_image(&self, repository: &str, tag: &str) -> PullStream {
        let docker = self.client.clone();
        let from_image = repository.to_string();
        let tag = tag.to_string();
        let (tx, rx) = mpsc::channel(PULL_BUFFER);

        tokio::spawn(async move {
            info!("Pulling image: {}:{}", from_image, tag);

            let options = CreateImageOptions {
                from_image: from_image.clone(),
                tag: tag.clone(),
                ..Default::default()
            };
            let mut stream = docker.create_image(Some(options), None, None);

            while let Some(msg) = stream.next().await {
                let item = msg.map(PullProgress::from).map_err(pull_error);
                let failed = item.is_err();

                if tx.send(item).await.is_err() {
                    debug!("Pull of {}:{} abandoned by receiver", from_image, tag);
                    return;
                }
                if failed {
                    warn!("Pull of {}:{} failed", from_image, tag);
                    return;
                }
            }

            info!("Image pulled: {}:{}", from_image, tag);
        });

        ReceiverStream::new(rx).boxed()
    }
}
