//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - The book repository behind the catalog flows
//! - Database migrations
//! - Catalog wiring from configuration

pub mod bootstrap;
pub mod entities;
pub mod migration;
pub mod repositories;

pub use bootstrap::{BootstrapError, Catalog, build_catalog, open_catalog};
pub use repositories::BookRepository;

use std::time::Duration;

use elib_shared::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection using the configured limits.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
