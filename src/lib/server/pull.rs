//! The `PullImages` WebSocket protocol.
//!
//! Clients create a pull task for a repository and tag, start it, and receive
//! the whole task list again every time a pull makes progress. Finished
//! pulls drop their task.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{
    Mutex,
    mpsc::{self, error::TrySendError},
};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::types::AppState;
use crate::engine::ImageEngine;
use crate::models::{Task, TaskKey, reference::DEFAULT_TAG};
use crate::tasks::{RunId, TaskError, TaskManager};

pub const NO_TASK_DETAIL: &str = "First, you need to create a task.";
pub const RUNNING_DETAIL: &str = "Task is already running.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullAction {
    List,
    Create,
    Start,
    Delete,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub action: PullAction,
    #[serde(default)]
    pub repository: String,
    #[serde(default = "default_tag")]
    pub tag: String,
}

/// Everything the server sends back over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Tasks(Vec<Task>),
    Detail { detail: String },
    Error { error: String },
    Status { status: Option<String> },
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

impl PullRequest {
    /// Parses a text frame. On failure returns the reply to send instead.
    pub fn parse(raw: &str) -> Result<Self, Reply> {
        let request: PullRequest = serde_json::from_str(raw).map_err(|e| Reply::Detail {
            detail: format!("Invalid request: {}", e),
        })?;

        let needs_target = matches!(
            request.action,
            PullAction::Create | PullAction::Start | PullAction::Delete
        );
        if needs_target {
            if request.repository.trim().is_empty() {
                return Err(Reply::Detail {
                    detail: "Field 'repository' is required.".to_string(),
                });
            }
            if request.tag.trim().is_empty() {
                return Err(Reply::Detail {
                    detail: "Field 'tag' is required.".to_string(),
                });
            }
        }

        Ok(request)
    }

    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.repository.trim(), self.tag.trim())
    }
}

/// Replies a client may have queued before the session stops reading.
pub const OUTBOX_CAPACITY: usize = 64;

/// One connected client. Replies go out through `outbox`.
pub struct PullSession {
    state: AppState,
    outbox: mpsc::Sender<Reply>,
    pub id: Uuid,
}

impl PullSession {
    pub fn new(state: AppState, outbox: mpsc::Sender<Reply>) -> Self {
        PullSession {
            state,
            outbox,
            id: Uuid::new_v4(),
        }
    }

    pub async fn on_receive(&self, raw: &str) {
        match PullRequest::parse(raw) {
            Ok(request) => self.match_and_perform_action(request).await,
            Err(reply) => deliver(&self.outbox, reply).await,
        }
    }

    /// Every request except a malformed one is answered with the task list,
    /// after any detail, status or error reply.
    async fn match_and_perform_action(&self, request: PullRequest) {
        let key = request.key();
        debug!("Received {:?} for {}", request.action, key);

        match request.action {
            PullAction::List => {}
            PullAction::Create => {
                self.state.tasks.lock().await.create(&key.repository, &key.tag);
            }
            PullAction::Start => self.start_task(key).await,
            PullAction::Delete => {
                self.state.tasks.lock().await.delete(&key);
            }
            PullAction::Unknown => deliver(&self.outbox, Reply::Status { status: None }).await,
        }

        let tasks = self.state.tasks.lock().await.list();
        deliver(&self.outbox, Reply::Tasks(tasks)).await;
    }

    async fn start_task(&self, key: TaskKey) {
        let started = self.state.tasks.lock().await.begin(&key);
        let run = match started {
            Ok(run) => run,
            Err(err) => {
                let detail = match err {
                    TaskError::NotFound(_) => NO_TASK_DETAIL,
                    TaskError::AlreadyRunning(_) => RUNNING_DETAIL,
                };
                let reply = Reply::Detail {
                    detail: detail.to_string(),
                };
                deliver(&self.outbox, reply).await;
                return;
            }
        };

        let engine = self.state.engine.clone();
        let tasks = self.state.tasks.clone();
        let outbox = self.outbox.clone();
        let span = info_span!("pull", session = %self.id, image = %key, run);

        tokio::spawn(run_pull(engine, tasks, outbox, key, run).instrument(span));
    }
}

async fn deliver(outbox: &mpsc::Sender<Reply>, reply: Reply) {
    if outbox.send(reply).await.is_err() {
        debug!("Session closed, dropping reply");
    }
}

/// Progress snapshots are skipped when the client is behind. The next
/// snapshot carries the full task list anyway.
fn offer_snapshot(outbox: &mpsc::Sender<Reply>, tasks: Vec<Task>) {
    match outbox.try_send(Reply::Tasks(tasks)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => debug!("Outbox full, skipping progress snapshot"),
        Err(TrySendError::Closed(_)) => debug!("Session closed, dropping progress snapshot"),
    }
}

/// Drives one pull to completion, publishing the task list after each step.
///
/// The pull keeps going if the client goes away, but stops as soon as its
/// task is deleted or replaced by a newer run.
pub async fn run_pull(
    engine: Arc<dyn ImageEngine>,
    tasks: Arc<Mutex<TaskManager>>,
    outbox: mpsc::Sender<Reply>,
    key: TaskKey,
    run: RunId,
) {
    info!("Starting pull");
    let mut stream = engine.pull_image(&key.repository, &key.tag);

    while let Some(item) = stream.next().await {
        match item {
            Ok(progress) => {
                let snapshot = {
                    let mut tasks = tasks.lock().await;
                    if !tasks.update(&key, run, &progress) {
                        info!("Task deleted, abandoning pull");
                        return;
                    }
                    tasks.list()
                };
                offer_snapshot(&outbox, snapshot);
            }
            Err(err) => {
                let message = err.to_string();
                warn!("Pull failed: {}", message);
                let snapshot = {
                    let mut tasks = tasks.lock().await;
                    if !tasks.fail(&key, run, &message) {
                        info!("Task deleted, dropping pull error");
                        return;
                    }
                    tasks.list()
                };
                deliver(&outbox, Reply::Error { error: message }).await;
                deliver(&outbox, Reply::Tasks(snapshot)).await;
                return;
            }
        }
    }

    let snapshot = {
        let mut tasks = tasks.lock().await;
        if tasks.finish(&key, run).is_none() {
            info!("Task deleted before the pull finished");
            return;
        }
        tasks.list()
    };
    info!("Pull complete");
    deliver(&outbox, Reply::Tasks(snapshot)).await;
}

/// Serves one upgraded socket until the client disconnects.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut inbox) = mpsc::channel::<Reply>(OUTBOX_CAPACITY);
    let session = PullSession::new(state, outbox);
    let span = info_span!("session", id = %session.id);

    async move {
        info!("Client connected");

        let writer = tokio::spawn(
            async move {
                while let Some(reply) = inbox.recv().await {
                    let text = match serde_json::to_string(&reply) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode reply: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => session.on_receive(text.as_str()).await,
                Message::Close(_) => break,
                _ => {}
            }
        }

        writer.abort();
        info!("Client disconnected");
    }
    .instrument(span)
    .await;
}
