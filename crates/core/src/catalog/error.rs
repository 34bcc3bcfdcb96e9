//! Catalog error types.

use std::path::PathBuf;

use thiserror::Error;

use elib_shared::{AppError, BookId, UserId};

use super::reference::ReferenceError;
use super::types::{AssetKind, Book};
use crate::storage::StorageError;

/// Errors returned by the create, update, and delete flows.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input rejected before any I/O.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Book not found.
    #[error("book not found: {0}")]
    NotFound(BookId),

    /// Caller is not the author of the book.
    #[error("user {caller_id} is not allowed to modify book {book_id}")]
    Forbidden {
        /// Book being modified.
        book_id: BookId,
        /// Caller who attempted it.
        caller_id: UserId,
    },

    /// Remote upload failed.
    #[error("{kind} upload failed: {source}")]
    Upload {
        /// Slot being uploaded.
        kind: AssetKind,
        /// Storage failure.
        #[source]
        source: StorageError,
    },

    /// Remote delete failed while deleting a book.
    #[error("{kind} delete failed: {source}")]
    RemoteDelete {
        /// Slot being deleted.
        kind: AssetKind,
        /// Storage failure.
        #[source]
        source: StorageError,
    },

    /// Repository operation failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Staged files could not be removed after the book was committed.
    #[error("book {book_id} saved but {} staged file(s) could not be removed", .paths.len())]
    Cleanup {
        /// The committed book.
        book_id: BookId,
        /// Files left behind in the staging area.
        paths: Vec<PathBuf>,
        /// The saved record, when the failing flow was an update.
        updated: Option<Box<Book>>,
    },

    /// A stored reference cannot be turned into a handle.
    #[error("invalid stored reference: {0}")]
    InvalidReference(#[from] ReferenceError),
}

impl CatalogError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a persistence error.
    #[must_use]
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create an upload error.
    #[must_use]
    pub fn upload(kind: AssetKind, source: StorageError) -> Self {
        Self::Upload { kind, source }
    }

    /// Create a remote delete error.
    #[must_use]
    pub fn remote_delete(kind: AssetKind, source: StorageError) -> Self {
        Self::RemoteDelete { kind, source }
    }

    /// The committed book, when the error happened after persistence.
    #[must_use]
    pub fn committed_book(&self) -> Option<BookId> {
        match self {
            Self::Cleanup { book_id, .. } => Some(*book_id),
            _ => None,
        }
    }

    /// The book as saved by an update that only failed its cleanup.
    #[must_use]
    pub fn updated_book(&self) -> Option<&Book> {
        match self {
            Self::Cleanup { updated, .. } => updated.as_deref(),
            _ => None,
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let msg = err.to_string();
        match err {
            CatalogError::Validation(_) => Self::Validation(msg),
            CatalogError::NotFound(_) => Self::NotFound(msg),
            CatalogError::Forbidden { .. } => Self::Forbidden(msg),
            CatalogError::Upload { .. } | CatalogError::RemoteDelete { .. } => {
                Self::ExternalService(msg)
            }
            CatalogError::Persistence(_) => Self::Database(msg),
            CatalogError::Cleanup { .. } | CatalogError::InvalidReference(_) => {
                Self::Internal(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elib_shared::ErrorClass;

    #[test]
    fn test_classification() {
        let class = |err: CatalogError| AppError::from(err).class();

        assert_eq!(class(CatalogError::validation("title is required")), ErrorClass::BadInput);
        assert_eq!(class(CatalogError::NotFound(BookId::new())), ErrorClass::NotFound);
        assert_eq!(
            class(CatalogError::Forbidden {
                book_id: BookId::new(),
                caller_id: UserId::new(),
            }),
            ErrorClass::Forbidden
        );
        assert_eq!(
            class(CatalogError::upload(
                AssetKind::Cover,
                StorageError::operation("timeout")
            )),
            ErrorClass::UpstreamFailure
        );
        assert_eq!(
            class(CatalogError::remote_delete(
                AssetKind::Document,
                StorageError::operation("denied")
            )),
            ErrorClass::UpstreamFailure
        );
        assert_eq!(class(CatalogError::persistence("down")), ErrorClass::Internal);
        assert_eq!(
            class(CatalogError::Cleanup {
                book_id: BookId::new(),
                paths: vec![PathBuf::from("up/a")],
                updated: None,
            }),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_cleanup_reports_committed_book() {
        let id = BookId::new();
        let err = CatalogError::Cleanup {
            book_id: id,
            paths: vec![PathBuf::from("up/a"), PathBuf::from("up/b")],
            updated: None,
        };
        assert_eq!(err.committed_book(), Some(id));
        assert_eq!(
            err.to_string(),
            format!("book {id} saved but 2 staged file(s) could not be removed")
        );
        assert!(err.updated_book().is_none());
        assert_eq!(CatalogError::NotFound(id).committed_book(), None);
    }
}
