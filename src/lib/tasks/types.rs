use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{Task, TaskKey};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_STARTING: &str = "starting";
pub const STATUS_ERROR: &str = "error";
pub const ACTION_PULL: &str = "pull";

/// Pull tasks shared by every connection, ordered by repository then tag.
#[derive(Debug, Clone, Default)]
pub struct TaskManager {
    pub(crate) tasks: BTreeMap<TaskKey, TaskEntry>,
    pub(crate) last_run: RunId,
}

/// Identifies one started pull. A task deleted and created again under the
/// same key gets a new id on its next start, so a stale pull cannot touch it.
pub type RunId = u64;

#[derive(Debug, Clone)]
pub(crate) struct TaskEntry {
    pub task: Task,
    pub running: bool,
    pub run: Option<RunId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("No task for {0}")]
    NotFound(TaskKey),

    #[error("Task for {0} is already running")]
    AlreadyRunning(TaskKey),
}

pub type TaskResult<T> = Result<T, TaskError>;
