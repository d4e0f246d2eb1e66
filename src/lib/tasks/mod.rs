pub mod manager;
pub mod types;

pub use types::{RunId, TaskError, TaskManager, TaskResult};
