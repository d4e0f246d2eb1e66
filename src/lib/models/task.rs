use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{ModelResult, require};

/// A background action (an image pull) tracked for a repository and tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub tag: String,
    pub repository: String,
    /// Raw progress output, appended to as the pull streams.
    pub stream_data: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Identity of a pull task.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub repository: String,
    pub tag: String,
}

impl TaskKey {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        TaskKey {
            repository: repository.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl Task {
    pub fn new(
        tag: impl Into<String>,
        repository: impl Into<String>,
        stream_data: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Task {
            tag: tag.into(),
            repository: repository.into(),
            stream_data: stream_data.into(),
            status: status.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn from_json(raw: &str) -> ModelResult<Self> {
        let task: Task = serde_json::from_str(raw)?;
        task.validate()?;
        Ok(task)
    }

    /// `stream_data` may be empty; a task that has not started has no output.
    pub fn validate(&self) -> ModelResult<()> {
        require("tag", &self.tag)?;
        require("repository", &self.repository)?;
        Ok(())
    }

    pub fn key(&self) -> TaskKey {
        TaskKey::new(self.repository.clone(), self.tag.clone())
    }

    pub fn append_stream(&mut self, line: &str) {
        if !self.stream_data.is_empty() && !self.stream_data.ends_with('\n') {
            self.stream_data.push('\n');
        }
        self.stream_data.push_str(line);
    }
}
