//! Asset store implementation using Apache OpenDAL.

use opendal::{ErrorKind, Operator, services};
use tracing::{debug, info};
use uuid::Uuid;

use super::config::{AssetStoreConfig, StorageProvider};
use super::error::StorageError;
use crate::catalog::{AssetKind, AssetStorage, StagedFile, UploadedAsset};

/// Image formats resolved with a direct lookup when deleting by handle.
const COMMON_IMAGE_FORMATS: [&str; 8] = [
    "jpeg", "png", "webp", "gif", "avif", "svg", "bmp", "tiff",
];

/// Remote store for book covers and documents.
///
/// Objects live at `{folder}/{name}.{format}`. Image handles omit the
/// format, raw handles are the full key.
pub struct AssetStore {
    operator: Operator,
    config: AssetStoreConfig,
}

impl AssetStore {
    /// Create a new asset store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: AssetStoreConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config.provider)?;
        info!(provider = config.provider.name(), "Asset store initialized");
        Ok(Self { operator, config })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );

                Operator::new(builder)
                    .map_err(|e| StorageError::configuration(e.to_string()))?
                    .finish()
                    .pipe(Ok)
            }
            StorageProvider::Memory => Operator::new(services::Memory::default())
                .map_err(|e| StorageError::configuration(e.to_string()))?
                .finish()
                .pipe(Ok),
        }
    }

    /// Validate an upload against the configured limits and its slot.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate_upload(
        &self,
        kind: AssetKind,
        content_type: &str,
        size: u64,
    ) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.config.max_file_size,
            ));
        }

        if !kind.accepts_mime(content_type) {
            return Err(StorageError::invalid_mime_type(content_type));
        }

        Ok(())
    }

    /// Fresh remote name for a staged file: `{override_name}-{uuid}`.
    ///
    /// Every upload gets its own name, so two staged files that share a stem
    /// never overwrite each other and never share a handle.
    #[must_use]
    pub fn object_name(file: &StagedFile) -> String {
        format!("{}-{}", file.override_name(), Uuid::new_v4().simple())
    }

    /// Object key for a remote name.
    ///
    /// Format: `{folder}/{name}.{format}`
    #[must_use]
    pub fn object_key(kind: AssetKind, name: &str, format: &str) -> String {
        format!("{}/{name}.{format}", kind.folder())
    }

    /// Handle returned for an uploaded object.
    #[must_use]
    pub fn handle_for(kind: AssetKind, name: &str, format: &str) -> String {
        if kind.is_raw() {
            Self::object_key(kind, name, format)
        } else {
            format!("{}/{name}", kind.folder())
        }
    }

    /// Check if an object exists in storage.
    pub async fn exists(&self, key: &str) -> bool {
        match self.operator.stat(key).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(_) => false,
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.config.provider.name()
    }

    async fn stat_exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.operator.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the object stored under an image handle.
    ///
    /// The handle carries no format. The usual image formats are looked up
    /// directly before falling back to a folder listing, and only
    /// `{handle}.{ext}` with a single extension ever matches.
    async fn delete_image(&self, handle: &str, folder: &str) -> Result<(), StorageError> {
        for format in COMMON_IMAGE_FORMATS {
            let key = format!("{handle}.{format}");
            if self.stat_exists(&key).await? {
                self.operator.delete(&key).await?;
                debug!(handle, key = %key, "Image asset deleted");
                return Ok(());
            }
        }

        let entries = match self.operator.list(&format!("{folder}/")).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{handle}.");
        let mut removed = 0usize;
        for entry in entries {
            let path = entry.path();
            let exact = path
                .strip_prefix(&prefix)
                .is_some_and(|ext| !ext.is_empty() && !ext.contains(['.', '/']));
            if exact {
                self.operator.delete(path).await?;
                removed += 1;
            }
        }

        debug!(handle, removed, "Image asset deleted");
        Ok(())
    }
}

impl AssetStorage for AssetStore {
    async fn upload(&self, file: &StagedFile) -> Result<UploadedAsset, StorageError> {
        let path = file.local_path.display().to_string();
        let staged_error = |source| StorageError::StagedFile {
            path: path.clone(),
            source,
        };

        let size = tokio::fs::metadata(&file.local_path)
            .await
            .map_err(staged_error)?
            .len();
        self.validate_upload(file.kind, &file.mime_type, size)?;

        let bytes = tokio::fs::read(&file.local_path)
            .await
            .map_err(staged_error)?;

        let name = Self::object_name(file);
        let format = file.format();
        let key = Self::object_key(file.kind, &name, &format);
        self.operator
            .write_with(&key, bytes)
            .content_type(&file.mime_type)
            .await?;

        debug!(kind = %file.kind, key = %key, size, "Asset uploaded");

        Ok(UploadedAsset {
            handle: Self::handle_for(file.kind, &name, &format),
            secure_url: self.config.public_url(&key),
        })
    }

    async fn delete(&self, handle: &str, kind: AssetKind) -> Result<(), StorageError> {
        let folder = kind.folder();
        let valid = handle
            .strip_prefix(folder)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."));
        if !valid {
            return Err(StorageError::invalid_key(format!(
                "'{handle}' is not a {kind} handle"
            )));
        }

        if kind.is_raw() {
            self.operator.delete(handle).await?;
            debug!(handle, "Raw asset deleted");
            Ok(())
        } else {
            self.delete_image(handle, folder).await
        }
    }
}

/// Sanitize a name for use in a storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension trait for pipe operator.
trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}
