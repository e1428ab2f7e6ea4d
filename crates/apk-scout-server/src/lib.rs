//! apk-scout server: HTTP front end and CLI for the apk-scout pipeline.

pub mod config;
pub mod error;
pub mod rest;

pub use config::ServerConfig;
pub use error::ApiError;
pub use rest::{router, serve, AppState};
