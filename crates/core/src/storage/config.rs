//! Asset store configuration.

pub use elib_shared::StorageProvider;
use elib_shared::StorageSettings;

/// Asset store configuration.
#[derive(Debug, Clone)]
pub struct AssetStoreConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Base URL that prefixes every object key in a public reference.
    pub public_base_url: String,
    /// Maximum file size in bytes.
    pub max_file_size: u64,
}

impl AssetStoreConfig {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

    /// Create a new config with default limits.
    #[must_use]
    pub fn new(provider: StorageProvider, public_base_url: impl Into<String>) -> Self {
        Self {
            provider,
            public_base_url: public_base_url.into(),
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set maximum file size.
    #[must_use]
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Public URL for an object key.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}

impl From<StorageSettings> for AssetStoreConfig {
    fn from(settings: StorageSettings) -> Self {
        Self::new(settings.provider, settings.public_base_url)
            .with_max_file_size(settings.max_file_size)
    }
}
