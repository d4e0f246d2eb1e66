use tracing::debug;

use super::types::{
    ACTION_PULL, RunId, STATUS_ERROR, STATUS_PENDING, STATUS_STARTING, TaskEntry, TaskError,
    TaskManager, TaskResult,
};
use crate::engine::PullProgress;
use crate::models::{Task, TaskKey};

impl TaskManager {
    pub fn new() -> Self {
        TaskManager::default()
    }

    /// Returns false when a task for the key already exists.
    pub fn create(&mut self, repository: &str, tag: &str) -> bool {
        let key = TaskKey::new(repository, tag);
        if self.tasks.contains_key(&key) {
            debug!("Task for {} already exists", key);
            return false;
        }

        let task = Task::new(tag, repository, "", STATUS_PENDING);
        debug!("Created task for {}", key);
        self.tasks.insert(key, TaskEntry {
            task,
            running: false,
            run: None,
        });
        true
    }

    pub fn delete(&mut self, key: &TaskKey) -> Option<Task> {
        let removed = self.tasks.remove(key).map(|entry| entry.task);
        if removed.is_some() {
            debug!("Deleted task for {}", key);
        }
        removed
    }

    pub fn exists(&self, key: &TaskKey) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn get(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.get(key).map(|entry| &entry.task)
    }

    pub fn is_running(&self, key: &TaskKey) -> bool {
        self.tasks.get(key).is_some_and(|entry| entry.running)
    }

    /// Marks the task running and hands out the id its pull must present.
    pub fn begin(&mut self, key: &TaskKey) -> TaskResult<RunId> {
        let entry = self
            .tasks
            .get_mut(key)
            .ok_or_else(|| TaskError::NotFound(key.clone()))?;

        if entry.running {
            return Err(TaskError::AlreadyRunning(key.clone()));
        }

        self.last_run += 1;
        entry.running = true;
        entry.run = Some(self.last_run);
        entry.task.action = Some(ACTION_PULL.to_string());
        entry.task.status = STATUS_STARTING.to_string();
        Ok(self.last_run)
    }

    fn current_run(&mut self, key: &TaskKey, run: RunId) -> Option<&mut TaskEntry> {
        self.tasks
            .get_mut(key)
            .filter(|entry| entry.running && entry.run == Some(run))
    }

    /// Folds one progress message into the task. False once the task is
    /// gone or belongs to another run.
    pub fn update(&mut self, key: &TaskKey, run: RunId, progress: &PullProgress) -> bool {
        let Some(entry) = self.current_run(key, run) else {
            return false;
        };

        if let Some(status) = &progress.status {
            entry.task.status = status.clone();
        }

        let line = progress_line(progress);
        if !line.is_empty() {
            entry.task.append_stream(&line);
        }
        true
    }

    pub fn fail(&mut self, key: &TaskKey, run: RunId, message: &str) -> bool {
        let Some(entry) = self.current_run(key, run) else {
            return false;
        };

        entry.running = false;
        entry.task.status = STATUS_ERROR.to_string();
        entry.task.append_stream(message);
        true
    }

    /// Drops the task of a completed run. Tasks of other runs are kept.
    pub fn finish(&mut self, key: &TaskKey, run: RunId) -> Option<Task> {
        self.current_run(key, run)?;
        self.delete(key)
    }

    pub fn list(&self) -> Vec<Task> {
        self.tasks.values().map(|entry| entry.task.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Renders a progress message the way `docker pull` prints it.
fn progress_line(progress: &PullProgress) -> String {
    let parts: Vec<&str> = [progress.status.as_deref(), progress.progress.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();
    let body = parts.join(" ");

    match progress.id.as_deref() {
        Some(id) if !id.is_empty() && !body.is_empty() => format!("{}: {}", id, body),
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(id: Option<&str>, status: &str, bar: Option<&str>) -> PullProgress {
        PullProgress {
            id: id.map(str::to_string),
            status: Some(status.to_string()),
            progress: bar.map(str::to_string),
        }
    }

    #[test]
    fn created_task_is_pending_without_action() {
        let mut manager = TaskManager::new();
        assert!(manager.create("nginx", "latest"));

        let task = manager.get(&TaskKey::new("nginx", "latest")).unwrap();
        assert_eq!(task.status, "pending");
        assert_eq!(task.stream_data, "");
        assert_eq!(task.action, None);
        assert!(!manager.is_running(&task.key()));
    }

    #[test]
    fn creating_twice_keeps_the_first_task() {
        let mut manager = TaskManager::new();
        assert!(manager.create("nginx", "latest"));
        let key = TaskKey::new("nginx", "latest");
        manager.begin(&key).unwrap();

        assert!(!manager.create("nginx", "latest"));
        assert_eq!(manager.len(), 1);
        assert!(manager.is_running(&key));
    }

    #[test]
    fn list_is_ordered_by_repository_then_tag() {
        let mut manager = TaskManager::new();
        manager.create("redis", "7");
        manager.create("nginx", "latest");
        manager.create("nginx", "1.18-alpine");

        let keys: Vec<String> = manager.list().iter().map(|t| t.key().to_string()).collect();
        assert_eq!(keys, vec!["nginx:1.18-alpine", "nginx:latest", "redis:7"]);
    }

    #[test]
    fn begin_requires_an_idle_existing_task() {
        let mut manager = TaskManager::new();
        let key = TaskKey::new("hello-world", "latest");

        assert_eq!(manager.begin(&key), Err(TaskError::NotFound(key.clone())));

        manager.create("hello-world", "latest");
        assert!(manager.begin(&key).is_ok());
        assert_eq!(manager.begin(&key), Err(TaskError::AlreadyRunning(key.clone())));

        let task = manager.get(&key).unwrap();
        assert_eq!(task.action.as_deref(), Some("pull"));
        assert_eq!(task.status, "starting");
    }

    #[test]
    fn update_tracks_status_and_accumulates_output() {
        let mut manager = TaskManager::new();
        let key = TaskKey::new("hello-world", "latest");
        manager.create("hello-world", "latest");
        let run = manager.begin(&key).unwrap();

        assert!(manager.update(
            &key,
            run,
            &progress(Some("latest"), "Pulling from library/hello-world", None)
        ));
        assert!(manager.update(
            &key,
            run,
            &progress(Some("c1ec31eb5944"), "Downloading", Some("[==>   ] 720B/2.4kB"))
        ));
        assert!(manager.update(&key, run, &progress(None, "Digest: sha256:d211f485", None)));

        let task = manager.get(&key).unwrap();
        assert_eq!(task.status, "Digest: sha256:d211f485");
        assert_eq!(
            task.stream_data,
            "latest: Pulling from library/hello-world\n\
             c1ec31eb5944: Downloading [==>   ] 720B/2.4kB\n\
             Digest: sha256:d211f485"
        );
    }

    #[test]
    fn update_on_deleted_task_reports_it_gone() {
        let mut manager = TaskManager::new();
        let key = TaskKey::new("nginx", "latest");
        manager.create("nginx", "latest");
        let run = manager.begin(&key).unwrap();

        let removed = manager.delete(&key).unwrap();
        assert_eq!(removed.repository, "nginx");
        assert!(!manager.update(&key, run, &progress(None, "Downloading", None)));
        assert!(manager.delete(&key).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn recreated_task_ignores_the_previous_run() {
        let mut manager = TaskManager::new();
        let key = TaskKey::new("nginx", "latest");
        manager.create("nginx", "latest");
        let old_run = manager.begin(&key).unwrap();
        manager.delete(&key);
        manager.create("nginx", "latest");

        assert!(!manager.update(&key, old_run, &progress(Some("old"), "Downloading", None)));
        assert!(!manager.fail(&key, old_run, "connection reset"));
        assert!(manager.finish(&key, old_run).is_none());

        let task = manager.get(&key).unwrap();
        assert_eq!(task.status, "pending");
        assert_eq!(task.stream_data, "");
        assert_eq!(task.action, None);

        let new_run = manager.begin(&key).unwrap();
        assert_ne!(new_run, old_run);
        assert!(!manager.update(&key, old_run, &progress(Some("old"), "Downloading", None)));
        assert!(manager.update(&key, new_run, &progress(Some("new"), "Downloading", None)));
        assert_eq!(manager.get(&key).unwrap().stream_data, "new: Downloading");

        assert!(manager.finish(&key, new_run).is_some());
        assert!(!manager.exists(&key));
    }

    #[test]
    fn failed_task_can_be_started_again() {
        let mut manager = TaskManager::new();
        let key = TaskKey::new("nosuchimage", "latest");
        manager.create("nosuchimage", "latest");
        let run = manager.begin(&key).unwrap();

        assert!(manager.fail(&key, run, "pull access denied for nosuchimage"));

        let task = manager.get(&key).unwrap();
        assert_eq!(task.status, "error");
        assert!(task.stream_data.ends_with("pull access denied for nosuchimage"));
        assert!(!manager.is_running(&key));
        assert!(manager.finish(&key, run).is_none());

        let retry = manager.begin(&key).unwrap();
        assert_ne!(retry, run);
    }
}
