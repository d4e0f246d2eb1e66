pub mod api;
pub mod pull;
pub mod types;

pub use pull::{PullAction, PullRequest, PullSession, Reply};
pub use types::{ApiError, AppState, ImageServer};
