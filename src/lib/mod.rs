pub mod config;
pub mod engine;
pub mod logging;
pub mod models;
pub mod server;
pub mod tasks;
