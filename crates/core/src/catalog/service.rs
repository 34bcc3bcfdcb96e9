//! Book lifecycle coordination.
//!
//! A book is only as valid as its two remote assets, and no transaction spans
//! the object store, the database, and the staging directory. Every flow here
//! therefore orders its steps so that a failure leaves, at worst, a stale
//! local file or an orphaned remote asset, never a committed book pointing at
//! something that does not exist.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{info, warn};

use elib_shared::{BookId, UserId};

use super::access::ensure_owner;
use super::error::CatalogError;
use super::reference::derive_handle;
use super::saga::Saga;
use super::types::{
    AssetKind, Book, BookChanges, BookMetadata, CreateBookInput, DeletedBook, MetadataPatch,
    NewBook, SlotUpdate, StagedFile, UpdateBookInput, UploadedAsset,
};
use crate::staging::StagingError;
use crate::storage::StorageError;

/// Repository trait for book persistence.
///
/// Implemented by the db crate. Failures are reported as [`CatalogError::Persistence`].
pub trait BookRepository: Send + Sync {
    /// Insert a new book.
    fn create(&self, book: NewBook) -> impl Future<Output = Result<Book, CatalogError>> + Send;

    /// Find a book by ID.
    fn find_by_id(
        &self,
        id: BookId,
    ) -> impl Future<Output = Result<Option<Book>, CatalogError>> + Send;

    /// Apply changes; `None` if the book no longer exists.
    fn update(
        &self,
        id: BookId,
        changes: BookChanges,
    ) -> impl Future<Output = Result<Option<Book>, CatalogError>> + Send;

    /// Delete a book; `false` if it did not exist.
    fn delete(&self, id: BookId) -> impl Future<Output = Result<bool, CatalogError>> + Send;
}

/// Remote object store holding cover images and documents.
pub trait AssetStorage: Send + Sync {
    /// Upload a staged file into the folder of its kind.
    fn upload(
        &self,
        file: &StagedFile,
    ) -> impl Future<Output = Result<UploadedAsset, StorageError>> + Send;

    /// Delete an asset by handle.
    fn delete(
        &self,
        handle: &str,
        kind: AssetKind,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Local holding area for files between receipt and upload.
pub trait StagingArea: Send + Sync {
    /// Store bytes under a generated name derived from `declared_name`.
    fn put(
        &self,
        bytes: Bytes,
        declared_name: &str,
    ) -> impl Future<Output = Result<PathBuf, StagingError>> + Send;

    /// Remove a staged file; a file that is already gone is not an error.
    fn remove(&self, path: &Path) -> impl Future<Output = Result<(), StagingError>> + Send;

    /// Whether a staged file is present.
    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;
}

/// Coordinates the create, update, and delete flows of catalog books.
pub struct CatalogService<R, A, S> {
    repo: Arc<R>,
    assets: Arc<A>,
    staging: Arc<S>,
}

impl<R, A, S> CatalogService<R, A, S>
where
    R: BookRepository,
    A: AssetStorage + 'static,
    S: StagingArea,
{
    /// Create a new catalog service.
    #[must_use]
    pub fn new(repo: Arc<R>, assets: Arc<A>, staging: Arc<S>) -> Self {
        Self {
            repo,
            assets,
            staging,
        }
    }

    /// Create a book from metadata and two staged files.
    ///
    /// Uploads the cover, then the document, then inserts the book. A failed
    /// step undoes the uploads before it. Staged files are removed on every
    /// path; if that removal fails after the insert, the book stays and
    /// [`CatalogError::Cleanup`] names it.
    ///
    /// # Errors
    ///
    /// `Validation`, `Upload`, `Persistence`, or `Cleanup`.
    pub async fn create(&self, input: CreateBookInput) -> Result<BookId, CatalogError> {
        let CreateBookInput {
            author_id,
            metadata,
            cover,
            file,
        } = input;

        validate_metadata(&metadata)?;
        let cover = require_staged(cover, AssetKind::Cover)?;
        let file = require_staged(file, AssetKind::Document)?;
        let staged = [cover.local_path.clone(), file.local_path.clone()];

        let book = match self.upload_and_insert(author_id, metadata, &cover, &file).await {
            Ok(book) => book,
            Err(err) => {
                self.discard_staged(&staged).await;
                return Err(err);
            }
        };

        info!(book_id = %book.id, author_id = %author_id, "Book created");

        self.clear_staged(book.id, &staged).await?;
        Ok(book.id)
    }

    async fn upload_and_insert(
        &self,
        author_id: UserId,
        metadata: BookMetadata,
        cover: &StagedFile,
        file: &StagedFile,
    ) -> Result<Book, CatalogError> {
        let mut saga = Saga::new("create_book");

        let cover_asset = self.upload(cover).await?;
        saga.push(
            format!("delete cover {}", cover_asset.handle),
            self.undo_upload(AssetKind::Cover, &cover_asset),
        );

        let file_asset = match self.upload(file).await {
            Ok(asset) => asset,
            Err(err) => {
                saga.compensate().await;
                return Err(err);
            }
        };
        saga.push(
            format!("delete document {}", file_asset.handle),
            self.undo_upload(AssetKind::Document, &file_asset),
        );

        let new_book = NewBook {
            id: BookId::new(),
            author_id,
            metadata,
            cover_image: cover_asset.secure_url,
            file: file_asset.secure_url,
        };

        match self.repo.create(new_book).await {
            Ok(book) => {
                saga.commit();
                Ok(book)
            }
            Err(err) => {
                warn!(error = %err, uploads = saga.len(), "Book insert failed, undoing uploads");
                saga.compensate().await;
                Err(err)
            }
        }
    }

    /// Update metadata and optionally replace either asset.
    ///
    /// Replacement assets are uploaded first and the book is saved with
    /// their references; only then are the superseded assets deleted, on a
    /// best-effort basis. A slot therefore never loses its last valid asset.
    ///
    /// # Errors
    ///
    /// `Validation`, `NotFound`, `Forbidden`, `Upload`, `Persistence`, or
    /// `Cleanup`. The update itself was saved in that last case, and the
    /// error carries the saved book.
    pub async fn update(&self, input: UpdateBookInput) -> Result<Book, CatalogError> {
        let UpdateBookInput {
            book_id,
            caller_id,
            metadata,
            cover,
            file,
        } = input;

        validate_patch(&metadata)?;
        validate_slot(&cover, AssetKind::Cover)?;
        validate_slot(&file, AssetKind::Document)?;

        let replacements: Vec<StagedFile> = [cover, file]
            .into_iter()
            .filter_map(|slot| match slot {
                SlotUpdate::Unchanged => None,
                SlotUpdate::Replace(staged) => Some(staged),
            })
            .collect();

        let current = match self.load_owned(book_id, caller_id).await {
            Ok(book) => book,
            Err(err) => {
                self.discard_staged(&staged_paths(&replacements)).await;
                return Err(err);
            }
        };

        let mut saga = Saga::new("update_book");
        let mut changes = BookChanges {
            metadata,
            ..BookChanges::default()
        };
        let mut leftovers = Vec::new();

        for (index, staged) in replacements.iter().enumerate() {
            let asset = match self.upload(staged).await {
                Ok(asset) => asset,
                Err(err) => {
                    saga.compensate().await;
                    self.discard_staged(&staged_paths(&replacements[index..]))
                        .await;
                    return Err(err);
                }
            };
            saga.push(
                format!("delete {} {}", staged.kind, asset.handle),
                self.undo_upload(staged.kind, &asset),
            );

            if let Err(e) = self.staging.remove(&staged.local_path).await {
                warn!(
                    book_id = %book_id,
                    path = %staged.local_path.display(),
                    error = %e,
                    "Failed to remove staged file"
                );
                leftovers.push(staged.local_path.clone());
            }

            match staged.kind {
                AssetKind::Cover => changes.cover_image = Some(asset.secure_url),
                AssetKind::Document => changes.file = Some(asset.secure_url),
            }
        }

        let updated = match self.repo.update(book_id, changes).await {
            Ok(Some(book)) => book,
            Ok(None) => {
                warn!(book_id = %book_id, "Book vanished during update, undoing uploads");
                saga.compensate().await;
                return Err(CatalogError::NotFound(book_id));
            }
            Err(err) => {
                warn!(book_id = %book_id, error = %err, "Book update failed, undoing uploads");
                saga.compensate().await;
                return Err(err);
            }
        };
        saga.commit();

        for staged in &replacements {
            let kind = staged.kind;
            let previous = current.reference(kind);
            if previous != updated.reference(kind) {
                self.retire(book_id, kind, previous).await;
            }
        }

        info!(
            book_id = %book_id,
            replaced = replacements.len(),
            "Book updated"
        );

        if leftovers.is_empty() {
            Ok(updated)
        } else {
            Err(CatalogError::Cleanup {
                book_id,
                paths: leftovers,
                updated: Some(Box::new(updated)),
            })
        }
    }

    /// Delete a book and both of its assets.
    ///
    /// Both assets are deleted before the book. If either remote delete
    /// fails the book is kept, so its references stay available for a retry.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `InvalidReference`, `RemoteDelete`, or `Persistence`.
    pub async fn delete(
        &self,
        book_id: BookId,
        caller_id: UserId,
    ) -> Result<DeletedBook, CatalogError> {
        let book = self.load_owned(book_id, caller_id).await?;

        let mut targets = Vec::with_capacity(2);
        for kind in [AssetKind::Cover, AssetKind::Document] {
            let reference = book.reference(kind);
            if !reference.is_empty() {
                targets.push((kind, derive_handle(reference, kind)?));
            }
        }

        for (kind, handle) in &targets {
            if let Err(e) = self.assets.delete(handle, *kind).await {
                warn!(
                    book_id = %book_id,
                    kind = %kind,
                    handle = %handle,
                    error = %e,
                    "Remote delete failed, keeping book"
                );
                return Err(CatalogError::remote_delete(*kind, e));
            }
        }

        if !self.repo.delete(book_id).await? {
            return Err(CatalogError::NotFound(book_id));
        }

        info!(book_id = %book_id, "Book deleted");
        Ok(DeletedBook { id: book_id })
    }

    async fn load_owned(&self, book_id: BookId, caller_id: UserId) -> Result<Book, CatalogError> {
        let book = self
            .repo
            .find_by_id(book_id)
            .await?
            .ok_or(CatalogError::NotFound(book_id))?;
        ensure_owner(&book, caller_id)?;
        Ok(book)
    }

    async fn upload(&self, staged: &StagedFile) -> Result<UploadedAsset, CatalogError> {
        self.assets
            .upload(staged)
            .await
            .map_err(|e| CatalogError::upload(staged.kind, e))
    }

    fn undo_upload(
        &self,
        kind: AssetKind,
        asset: &UploadedAsset,
    ) -> BoxFuture<'static, Result<(), String>> {
        let assets = Arc::clone(&self.assets);
        let handle = asset.handle.clone();
        async move {
            assets
                .delete(&handle, kind)
                .await
                .map_err(|e| e.to_string())
        }
        .boxed()
    }

    /// Delete an asset that a committed update no longer references.
    async fn retire(&self, book_id: BookId, kind: AssetKind, reference: &str) {
        if reference.is_empty() {
            return;
        }
        let handle = match derive_handle(reference, kind) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(book_id = %book_id, kind = %kind, error = %e, "Cannot resolve superseded asset");
                return;
            }
        };
        if let Err(e) = self.assets.delete(&handle, kind).await {
            warn!(
                book_id = %book_id,
                kind = %kind,
                handle = %handle,
                error = %e,
                "Superseded asset left orphaned"
            );
        }
    }

    /// Remove staged files after a commit; any failure becomes `Cleanup`.
    async fn clear_staged(&self, book_id: BookId, paths: &[PathBuf]) -> Result<(), CatalogError> {
        let mut leftovers = Vec::new();
        for path in paths {
            if let Err(e) = self.staging.remove(path).await {
                warn!(
                    book_id = %book_id,
                    path = %path.display(),
                    error = %e,
                    "Failed to remove staged file"
                );
                leftovers.push(path.clone());
            }
        }
        if leftovers.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Cleanup {
                book_id,
                paths: leftovers,
                updated: None,
            })
        }
    }

    /// Remove staged files after an aborted flow; failures are only logged.
    async fn discard_staged(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = self.staging.remove(path).await {
                warn!(path = %path.display(), error = %e, "Failed to discard staged file");
            }
        }
    }
}

fn staged_paths(files: &[StagedFile]) -> Vec<PathBuf> {
    files.iter().map(|f| f.local_path.clone()).collect()
}

fn validate_metadata(metadata: &BookMetadata) -> Result<(), CatalogError> {
    if metadata.title.trim().is_empty() {
        return Err(CatalogError::validation("title is required"));
    }
    if metadata.genre.trim().is_empty() {
        return Err(CatalogError::validation("genre is required"));
    }
    Ok(())
}

fn validate_patch(patch: &MetadataPatch) -> Result<(), CatalogError> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(CatalogError::validation("title cannot be blank"));
    }
    if patch.genre.as_deref().is_some_and(|g| g.trim().is_empty()) {
        return Err(CatalogError::validation("genre cannot be blank"));
    }
    Ok(())
}

fn require_staged(staged: Option<StagedFile>, kind: AssetKind) -> Result<StagedFile, CatalogError> {
    let staged = staged.ok_or_else(|| CatalogError::validation(format!("{kind} file is required")))?;
    validate_staged(&staged, kind)?;
    Ok(staged)
}

fn validate_slot(slot: &SlotUpdate, kind: AssetKind) -> Result<(), CatalogError> {
    slot.staged()
        .map_or(Ok(()), |staged| validate_staged(staged, kind))
}

fn validate_staged(staged: &StagedFile, kind: AssetKind) -> Result<(), CatalogError> {
    if staged.kind != kind {
        return Err(CatalogError::validation(format!(
            "{} file supplied for the {kind} slot",
            staged.kind
        )));
    }
    if staged.local_path.as_os_str().is_empty() {
        return Err(CatalogError::validation(format!("{kind} file has no staged path")));
    }
    if !kind.accepts_mime(&staged.mime_type) {
        return Err(CatalogError::validation(format!(
            "MIME type '{}' is not allowed for the {kind} slot",
            staged.mime_type
        )));
    }
    Ok(())
}
