pub mod convert;
pub mod docker;
pub mod types;

pub use types::{DockerClient, EngineError, EngineResult, ImageEngine, PullProgress, PullStream};
