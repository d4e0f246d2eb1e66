#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc;

use r_harbor::{
    engine::{EngineError, EngineResult, ImageEngine, PullProgress, PullStream},
    models::Image,
    server::{AppState, Reply},
};

/// What the fake daemon does for each pull, in order.
#[derive(Debug, Clone)]
pub enum Step {
    Progress(PullProgress),
    Fail(String),
    /// Stop here and never finish.
    Hang,
}

#[derive(Debug, Default)]
pub struct FakeEngine {
    pub local: Vec<Image>,
    pub hub: Vec<Image>,
    pub script: Vec<Step>,
    pub unreachable: bool,
}

#[async_trait]
impl ImageEngine for FakeEngine {
    async fn list_images(&self) -> EngineResult<Vec<Image>> {
        if self.unreachable {
            return Err(EngineError::Pull("daemon unreachable".to_string()));
        }
        Ok(self.local.clone())
    }

    async fn search_images(&self, term: &str, limit: u64) -> EngineResult<Vec<Image>> {
        if self.unreachable {
            return Err(EngineError::Pull("registry unreachable".to_string()));
        }
        Ok(self
            .hub
            .iter()
            .filter(|image| image.name.contains(term))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn pull_image(&self, _repository: &str, _tag: &str) -> PullStream {
        let mut items = Vec::new();
        let mut hang = false;
        for step in &self.script {
            match step {
                Step::Progress(progress) => items.push(Ok(progress.clone())),
                Step::Fail(message) => items.push(Err(EngineError::Pull(message.clone()))),
                Step::Hang => {
                    hang = true;
                    break;
                }
            }
        }

        let items = stream::iter(items);
        if hang {
            items.chain(stream::pending()).boxed()
        } else {
            items.boxed()
        }
    }
}

pub fn progress(id: &str, status: &str) -> Step {
    Step::Progress(PullProgress {
        id: Some(id.to_string()),
        status: Some(status.to_string()),
        progress: None,
    })
}

pub fn local_image(name: &str, tag: &str) -> Image {
    let mut image = Image::new(
        format!("sha256:{}0123456789abcdef", name),
        name,
        format!("{}01234567", name),
        HashMap::new(),
        tag,
    );
    image.is_pulled = Some(true);
    image
}

pub fn hub_image(name: &str, stars: u64, official: bool) -> Image {
    let mut image = Image::new(name, name, name, HashMap::new(), "latest");
    image.star_count = Some(stars);
    image.is_official = Some(official);
    image
}

pub fn state_with(engine: FakeEngine) -> AppState {
    AppState::new(Arc::new(engine), 25)
}

pub async fn next_reply(inbox: &mut mpsc::Receiver<Reply>) -> Reply {
    tokio::time::timeout(Duration::from_secs(2), inbox.recv())
        .await
        .expect("timed out waiting for a reply")
        .expect("session channel closed")
}

/// Reads replies until `done` matches one, returning everything read.
pub async fn replies_until(
    inbox: &mut mpsc::Receiver<Reply>,
    done: impl Fn(&Reply) -> bool,
) -> Vec<Reply> {
    let mut seen = Vec::new();
    loop {
        let reply = next_reply(inbox).await;
        let finished = done(&reply);
        seen.push(reply);
        if finished {
            return seen;
        }
    }
}
