pub mod error;
pub mod image;
pub mod reference;
pub mod task;

pub use error::{ModelError, ModelResult};
pub use image::Image;
pub use task::{Task, TaskKey};
