//! Shared errors and configuration for Filedock.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;

pub use config::{
    AppConfig, CorsConfig, DatabaseConfig, RetrySettings, ServerConfig, SigningConfig,
    StorageBackend, StorageSettings,
};
pub use error::{AppError, AppResult};
