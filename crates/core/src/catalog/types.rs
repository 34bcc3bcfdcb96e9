//! Catalog types and data structures.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use elib_shared::{BookId, UserId};

use crate::storage::sanitize_filename;

/// The two asset slots every book carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Cover image, stored as an image asset.
    Cover,
    /// Book document (PDF), stored as a raw asset.
    Document,
}

impl AssetKind {
    /// Storage folder for this kind.
    #[must_use]
    pub const fn folder(self) -> &'static str {
        match self {
            Self::Cover => "book-covers",
            Self::Document => "book-pdfs",
        }
    }

    /// Raw assets keep their extension in the handle; image assets do not.
    #[must_use]
    pub const fn is_raw(self) -> bool {
        matches!(self, Self::Document)
    }

    /// Category name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Document => "document",
        }
    }

    /// Whether a declared MIME type is acceptable for this slot.
    #[must_use]
    pub fn accepts_mime(self, mime_type: &str) -> bool {
        match self {
            Self::Cover => mime_type
                .strip_prefix("image/")
                .is_some_and(|subtype| !subtype.is_empty()),
            Self::Document => mime_type == "application/pdf",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file sitting in the staging area, waiting to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Path inside the staging area.
    pub local_path: PathBuf,
    /// MIME type declared by the client.
    pub mime_type: String,
    /// Slot the file is meant for.
    pub kind: AssetKind,
}

impl StagedFile {
    /// Create a staged file reference.
    #[must_use]
    pub fn new(local_path: impl Into<PathBuf>, mime_type: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            local_path: local_path.into(),
            mime_type: mime_type.into(),
            kind,
        }
    }

    /// Staged cover image.
    #[must_use]
    pub fn cover(local_path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self::new(local_path, mime_type, AssetKind::Cover)
    }

    /// Staged PDF document.
    #[must_use]
    pub fn document(local_path: impl Into<PathBuf>) -> Self {
        Self::new(local_path, "application/pdf", AssetKind::Document)
    }

    /// Readable part of the remote name: the staged file's sanitized stem.
    ///
    /// Dots are folded to underscores so the format stays the only extension.
    #[must_use]
    pub fn override_name(&self) -> String {
        let stem = self
            .local_path
            .file_stem()
            .map(|s| dotless(&s.to_string_lossy()))
            .unwrap_or_default();
        if stem.is_empty() { "asset".to_string() } else { stem }
    }

    /// Format (extension) of the remote copy.
    ///
    /// Covers take the MIME subtype (`image/png` -> `png`); documents are always `pdf`.
    #[must_use]
    pub fn format(&self) -> String {
        match self.kind {
            AssetKind::Cover => {
                let subtype = self
                    .mime_type
                    .rsplit('/')
                    .next()
                    .and_then(|s| s.split('+').next())
                    .unwrap_or_default();
                dotless(subtype)
            }
            AssetKind::Document => "pdf".to_string(),
        }
    }
}

fn dotless(name: &str) -> String {
    sanitize_filename(name).replace('.', "_")
}

/// Result of a successful remote upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Key used to delete the asset again.
    pub handle: String,
    /// Public HTTPS reference stored on the book.
    pub secure_url: String,
}

/// What to do with one asset slot during an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SlotUpdate {
    /// Keep the current asset.
    #[default]
    Unchanged,
    /// Upload this staged file and retire the current asset.
    Replace(StagedFile),
}

impl SlotUpdate {
    /// The staged file, if the slot is being replaced.
    #[must_use]
    pub fn staged(&self) -> Option<&StagedFile> {
        match self {
            Self::Unchanged => None,
            Self::Replace(file) => Some(file),
        }
    }
}

/// Descriptive fields of a new book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    /// Title.
    pub title: String,
    /// Genre.
    pub genre: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Partial metadata for an update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPatch {
    /// New title.
    pub title: Option<String>,
    /// New genre.
    pub genre: Option<String>,
    /// New description.
    pub description: Option<String>,
}

/// A catalog book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Book ID.
    pub id: BookId,
    /// Title.
    pub title: String,
    /// Genre.
    pub genre: String,
    /// Description.
    pub description: String,
    /// The user who created the book; the only one allowed to change it.
    pub author_id: UserId,
    /// Public URL of the cover image.
    pub cover_image: String,
    /// Public URL of the document.
    pub file: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Stored reference for a slot.
    #[must_use]
    pub fn reference(&self, kind: AssetKind) -> &str {
        match kind {
            AssetKind::Cover => &self.cover_image,
            AssetKind::Document => &self.file,
        }
    }
}

/// Input for creating a book record in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    /// Pre-generated book ID.
    pub id: BookId,
    /// Author (caller) ID.
    pub author_id: UserId,
    /// Descriptive fields.
    pub metadata: BookMetadata,
    /// Public URL of the uploaded cover.
    pub cover_image: String,
    /// Public URL of the uploaded document.
    pub file: String,
}

/// Changes applied to a stored book; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    /// Metadata changes.
    pub metadata: MetadataPatch,
    /// New cover URL.
    pub cover_image: Option<String>,
    /// New document URL.
    pub file: Option<String>,
}

/// Input for the create flow.
#[derive(Debug, Clone)]
pub struct CreateBookInput {
    /// Authenticated caller, recorded as the author.
    pub author_id: UserId,
    /// Descriptive fields.
    pub metadata: BookMetadata,
    /// Staged cover image (required).
    pub cover: Option<StagedFile>,
    /// Staged document (required).
    pub file: Option<StagedFile>,
}

/// Input for the update flow.
#[derive(Debug, Clone)]
pub struct UpdateBookInput {
    /// Book to update.
    pub book_id: BookId,
    /// Authenticated caller.
    pub caller_id: UserId,
    /// Metadata changes.
    pub metadata: MetadataPatch,
    /// Cover slot.
    pub cover: SlotUpdate,
    /// Document slot.
    pub file: SlotUpdate,
}

/// Confirmation returned by the delete flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeletedBook {
    /// ID of the deleted book.
    pub id: BookId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AssetKind::Cover, "image/png", true)]
    #[case(AssetKind::Cover, "image/jpeg", true)]
    #[case(AssetKind::Cover, "image/", false)]
    #[case(AssetKind::Cover, "application/pdf", false)]
    #[case(AssetKind::Document, "application/pdf", true)]
    #[case(AssetKind::Document, "image/png", false)]
    fn test_accepts_mime(#[case] kind: AssetKind, #[case] mime: &str, #[case] expected: bool) {
        assert_eq!(kind.accepts_mime(mime), expected);
    }

    #[test]
    fn test_kind_storage_conventions() {
        assert_eq!(AssetKind::Cover.folder(), "book-covers");
        assert_eq!(AssetKind::Document.folder(), "book-pdfs");
        assert!(AssetKind::Document.is_raw());
        assert!(!AssetKind::Cover.is_raw());
    }

    #[test]
    fn test_cover_format_from_mime_subtype() {
        assert_eq!(StagedFile::cover("up/a1b2.jpg", "image/jpeg").format(), "jpeg");
        assert_eq!(StagedFile::cover("up/a1b2", "image/svg+xml").format(), "svg");
        assert_eq!(StagedFile::document("up/c3d4").format(), "pdf");
        assert_eq!(
            StagedFile::cover("up/fav", "image/vnd.microsoft.icon").format(),
            "vnd_microsoft_icon"
        );
    }

    #[test]
    fn test_override_name_uses_sanitized_stem() {
        assert_eq!(StagedFile::cover("up/a1b2.jpg", "image/jpeg").override_name(), "a1b2");
        assert_eq!(StagedFile::document("up/my book.pdf").override_name(), "my_book");
        assert_eq!(StagedFile::document("").override_name(), "asset");
        assert_eq!(StagedFile::cover("up/scan.v2.png", "image/png").override_name(), "scan_v2");
    }

    #[test]
    fn test_slot_update_staged() {
        assert!(SlotUpdate::Unchanged.staged().is_none());
        let file = StagedFile::document("up/x.pdf");
        assert_eq!(SlotUpdate::Replace(file.clone()).staged(), Some(&file));
    }
}
