//! Shared types for the Chat Hub backend.
//!
//! This crate provides the common surface used across all other crates:
//! - Application-wide error types with HTTP status mapping
//! - Configuration management (storage provider, attachment limits)

pub mod config;
pub mod error;

pub use config::{AppConfig, AttachmentSettings, StorageSettings};
pub use error::{AppError, AppResult};
