//! Remote asset storage using Apache OpenDAL.
//!
//! Backends:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//! - Memory (tests)
//!
//! # Layout
//!
//! ```text
//! book-covers/{name}.{format}   handle: book-covers/{name}
//! book-pdfs/{name}.pdf          handle: book-pdfs/{name}.pdf
//! ```

mod config;
mod error;
mod service;

pub use config::{AssetStoreConfig, StorageProvider};
pub use error::StorageError;
pub use service::AssetStore;

pub(crate) use service::sanitize_filename;
