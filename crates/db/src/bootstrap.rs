//! Catalog wiring from application configuration.
//!
//! Builds the production [`CatalogService`]: the `SeaORM` book repository,
//! the `OpenDAL` asset store and the local staging area, each from its own
//! section of [`AppConfig`].

use std::sync::Arc;

use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tracing::info;

use elib_core::catalog::CatalogService;
use elib_core::staging::LocalStaging;
use elib_core::storage::{AssetStore, AssetStoreConfig, StorageError};
use elib_shared::AppConfig;

use crate::{BookRepository, connect_with};

/// The catalog as deployed.
pub type Catalog = CatalogService<BookRepository, AssetStore, LocalStaging>;

/// Errors raised while assembling the catalog.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The database could not be reached.
    #[error("database: {0}")]
    Database(#[from] DbErr),

    /// The asset store could not be initialized.
    #[error("asset store: {0}")]
    Storage(#[from] StorageError),
}

/// Build the catalog over an existing connection.
///
/// # Errors
///
/// Returns an error if the storage provider cannot be initialized.
pub fn build_catalog(db: DatabaseConnection, config: &AppConfig) -> Result<Catalog, StorageError> {
    let assets = AssetStore::from_config(AssetStoreConfig::from(config.storage.clone()))?;
    let staging = LocalStaging::from_config(&config.staging);
    info!(
        provider = assets.provider_name(),
        staging_root = %staging.root().display(),
        "Catalog assembled"
    );

    Ok(CatalogService::new(
        Arc::new(BookRepository::new(db)),
        Arc::new(assets),
        Arc::new(staging),
    ))
}

/// Connect to the configured database and build the catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the storage provider
/// cannot be initialized.
pub async fn open_catalog(config: &AppConfig) -> Result<Catalog, BootstrapError> {
    let db = connect_with(&config.database).await?;
    info!("Connected to database");
    Ok(build_catalog(db, config)?)
}
