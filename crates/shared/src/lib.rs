//! Shared types, errors, and configuration for elib.
//!
//! - Typed IDs for books and users
//! - Application-wide error classification
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, StagingConfig, StorageProvider, StorageSettings};
pub use error::{AppError, ErrorClass};
pub use types::{BookId, UserId};
