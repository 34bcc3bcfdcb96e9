//! Catalog book lifecycle.
//!
//! A book record references two remote assets: a cover image and a PDF
//! document. This module coordinates creating, updating, and deleting books
//! across three independently failing collaborators:
//!
//! - [`StagingArea`] - local files received from the client
//! - [`AssetStorage`] - the remote object store
//! - [`BookRepository`] - the database
//!
//! # Modules
//!
//! - `types` - Book, staged file, and flow input types
//! - `error` - Catalog error taxonomy
//! - `access` - Ownership rule
//! - `reference` - Handle derivation from stored URLs
//! - `saga` - Compensating actions
//! - `service` - The flows themselves

mod access;
mod error;
mod reference;
mod saga;
mod service;
mod types;


pub use access::{ensure_owner, is_owner};
pub use error::CatalogError;
pub use reference::{ReferenceError, derive_handle};
pub use service::{AssetStorage, BookRepository, CatalogService, StagingArea};
pub use types::{
    AssetKind, Book, BookChanges, BookMetadata, CreateBookInput, DeletedBook, MetadataPatch,
    NewBook, SlotUpdate, StagedFile, UpdateBookInput, UploadedAsset,
};
