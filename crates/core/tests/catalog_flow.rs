//! End-to-end catalog flows over the in-memory asset store and a temporary
//! staging directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::Utc;
use tempfile::TempDir;

use elib_core::catalog::{
    AssetKind, Book, BookChanges, BookMetadata, BookRepository, CatalogError, CatalogService,
    CreateBookInput, MetadataPatch, NewBook, SlotUpdate, StagedFile, StagingArea,
    UpdateBookInput, derive_handle,
};
use elib_core::staging::LocalStaging;
use elib_core::storage::{AssetStore, AssetStoreConfig, StorageProvider};
use elib_shared::{BookId, UserId};

#[derive(Default)]
struct InMemoryBooks {
    books: Mutex<HashMap<BookId, Book>>,
}

impl BookRepository for InMemoryBooks {
    async fn create(&self, book: NewBook) -> Result<Book, CatalogError> {
        let now = Utc::now();
        let book = Book {
            id: book.id,
            title: book.metadata.title,
            genre: book.metadata.genre,
            description: book.metadata.description,
            author_id: book.author_id,
            cover_image: book.cover_image,
            file: book.file,
            created_at: now,
            updated_at: now,
        };
        self.books.lock().unwrap().insert(book.id, book.clone());
        Ok(book)
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, CatalogError> {
        Ok(self.books.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, id: BookId, changes: BookChanges) -> Result<Option<Book>, CatalogError> {
        let mut books = self.books.lock().unwrap();
        let Some(book) = books.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.metadata.title {
            book.title = title;
        }
        if let Some(cover_image) = changes.cover_image {
            book.cover_image = cover_image;
        }
        if let Some(file) = changes.file {
            book.file = file;
        }
        book.updated_at = Utc::now();
        Ok(Some(book.clone()))
    }

    async fn delete(&self, id: BookId) -> Result<bool, CatalogError> {
        Ok(self.books.lock().unwrap().remove(&id).is_some())
    }
}

struct World {
    _dir: TempDir,
    books: Arc<InMemoryBooks>,
    assets: Arc<AssetStore>,
    staging: Arc<LocalStaging>,
    service: CatalogService<InMemoryBooks, AssetStore, LocalStaging>,
}

const BASE: &str = "https://cdn.example.com/elib";

fn world() -> World {
    let dir = TempDir::new().unwrap();
    let books = Arc::new(InMemoryBooks::default());
    let assets = Arc::new(
        AssetStore::from_config(AssetStoreConfig::new(StorageProvider::Memory, BASE)).unwrap(),
    );
    let staging = Arc::new(LocalStaging::new(dir.path().join("uploads")));
    let service = CatalogService::new(books.clone(), assets.clone(), staging.clone());
    World {
        _dir: dir,
        books,
        assets,
        staging,
        service,
    }
}

fn object_key(reference: &str) -> String {
    reference
        .strip_prefix(BASE)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_book_lifecycle() {
    let w = world();
    let author = UserId::new();

    let cover_path = w.staging.put(Bytes::from_static(b"png"), "cover.png").await.unwrap();
    let file_path = w.staging.put(Bytes::from_static(b"%PDF-1.7"), "book.pdf").await.unwrap();

    let id = w
        .service
        .create(CreateBookInput {
            author_id: author,
            metadata: BookMetadata {
                title: "Dune".to_string(),
                genre: "Science fiction".to_string(),
                description: String::new(),
            },
            cover: Some(StagedFile::cover(&cover_path, "image/png")),
            file: Some(StagedFile::document(&file_path)),
        })
        .await
        .unwrap();

    assert!(!w.staging.exists(&cover_path).await);
    assert!(!w.staging.exists(&file_path).await);

    let book = w.books.books.lock().unwrap().get(&id).cloned().unwrap();
    let old_cover_key = object_key(&book.cover_image);
    let old_file_key = object_key(&book.file);
    assert!(w.assets.exists(&old_cover_key).await);
    assert!(w.assets.exists(&old_file_key).await);
    assert!(derive_handle(&book.cover_image, AssetKind::Cover).is_ok());

    // Replace the cover.
    let new_cover = w.staging.put(Bytes::from_static(b"webp"), "new.webp").await.unwrap();
    let updated = w
        .service
        .update(UpdateBookInput {
            book_id: id,
            caller_id: author,
            metadata: MetadataPatch {
                title: Some("Dune Messiah".to_string()),
                ..MetadataPatch::default()
            },
            cover: SlotUpdate::Replace(StagedFile::cover(&new_cover, "image/webp")),
            file: SlotUpdate::Unchanged,
        })
        .await
        .unwrap();

    assert_eq!(updated.title, "Dune Messiah");
    assert_eq!(updated.file, book.file);
    let new_cover_key = object_key(&updated.cover_image);
    assert!(new_cover_key.ends_with(".webp"));
    assert!(w.assets.exists(&new_cover_key).await);
    assert!(!w.assets.exists(&old_cover_key).await);
    assert!(!w.staging.exists(&new_cover).await);

    // A stranger cannot delete it.
    let err = w.service.delete(id, UserId::new()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden { .. }));

    w.service.delete(id, author).await.unwrap();
    assert!(!w.assets.exists(&new_cover_key).await);
    assert!(!w.assets.exists(&old_file_key).await);
    assert!(w.books.books.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_upload_leaves_nothing_behind() {
    let dir = TempDir::new().unwrap();
    let remote = dir.path().join("remote");
    let books = Arc::new(InMemoryBooks::default());
    let config =
        AssetStoreConfig::new(StorageProvider::local_fs(&remote), BASE).with_max_file_size(4);
    let assets = Arc::new(AssetStore::from_config(config).unwrap());
    let staging = Arc::new(LocalStaging::new(dir.path().join("uploads")));
    let service = CatalogService::new(books.clone(), assets.clone(), staging.clone());

    let cover_path = staging.put(Bytes::from_static(b"png"), "cover.png").await.unwrap();
    let file_path = staging.put(Bytes::from_static(b"%PDF-1.7"), "book.pdf").await.unwrap();

    let err = service
        .create(CreateBookInput {
            author_id: UserId::new(),
            metadata: BookMetadata {
                title: "Too big".to_string(),
                genre: "Reference".to_string(),
                description: String::new(),
            },
            cover: Some(StagedFile::cover(&cover_path, "image/png")),
            file: Some(StagedFile::document(&file_path)),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Upload { kind: AssetKind::Document, .. }));
    let covers = std::fs::read_dir(remote.join("book-covers"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(covers, 0);
    assert!(books.books.lock().unwrap().is_empty());
    assert!(!staging.exists(&cover_path).await);
    assert!(!staging.exists(&file_path).await);
}

/// Stage a file under its client-side name, inside its own subdirectory.
fn stage_named(w: &World, subdir: &str, name: &str, contents: &[u8]) -> PathBuf {
    let dir = w.staging.root().join(subdir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

async fn create_book(w: &World, author: UserId, cover: StagedFile, file: StagedFile) -> Book {
    let id = w
        .service
        .create(CreateBookInput {
            author_id: author,
            metadata: BookMetadata {
                title: "Same names".to_string(),
                genre: "Testing".to_string(),
                description: String::new(),
            },
            cover: Some(cover),
            file: Some(file),
        })
        .await
        .unwrap();
    w.books.books.lock().unwrap().get(&id).cloned().unwrap()
}

#[tokio::test]
async fn test_books_with_same_file_names_keep_their_own_assets() {
    let w = world();
    let author = UserId::new();

    let first = create_book(
        &w,
        author,
        StagedFile::cover(stage_named(&w, "a", "cover.png", b"first"), "image/png"),
        StagedFile::document(stage_named(&w, "a", "book.pdf", b"%PDF first")),
    )
    .await;
    let second = create_book(
        &w,
        author,
        StagedFile::cover(stage_named(&w, "b", "cover.png", b"second"), "image/png"),
        StagedFile::document(stage_named(&w, "b", "book.pdf", b"%PDF second")),
    )
    .await;

    assert_ne!(first.cover_image, second.cover_image);
    assert_ne!(first.file, second.file);

    w.service.delete(second.id, author).await.unwrap();

    assert!(w.assets.exists(&object_key(&first.cover_image)).await);
    assert!(w.assets.exists(&object_key(&first.file)).await);
    assert!(!w.assets.exists(&object_key(&second.cover_image)).await);
    assert!(!w.assets.exists(&object_key(&second.file)).await);
}

#[tokio::test]
async fn test_deleting_book_spares_dotted_cover_with_same_prefix() {
    let w = world();
    let author = UserId::new();

    let plain = create_book(
        &w,
        author,
        StagedFile::cover(stage_named(&w, "a", "scan.png", b"scan"), "image/png"),
        StagedFile::document(stage_named(&w, "a", "a.pdf", b"%PDF")),
    )
    .await;
    let dotted = create_book(
        &w,
        author,
        StagedFile::cover(stage_named(&w, "b", "scan.v2.png", b"v2"), "image/png"),
        StagedFile::document(stage_named(&w, "b", "b.pdf", b"%PDF")),
    )
    .await;

    w.service.delete(plain.id, author).await.unwrap();

    assert!(w.assets.exists(&object_key(&dotted.cover_image)).await);
}

#[tokio::test]
async fn test_replacing_cover_with_same_stem_keeps_new_cover() {
    let w = world();
    let author = UserId::new();

    let book = create_book(
        &w,
        author,
        StagedFile::cover(stage_named(&w, "a", "cover.png", b"png"), "image/png"),
        StagedFile::document(stage_named(&w, "a", "book.pdf", b"%PDF")),
    )
    .await;

    let replacement = stage_named(&w, "b", "cover.jpg", b"jpeg");
    let updated = w
        .service
        .update(UpdateBookInput {
            book_id: book.id,
            caller_id: author,
            metadata: MetadataPatch::default(),
            cover: SlotUpdate::Replace(StagedFile::cover(&replacement, "image/jpeg")),
            file: SlotUpdate::Unchanged,
        })
        .await
        .unwrap();

    assert_ne!(updated.cover_image, book.cover_image);
    assert!(w.assets.exists(&object_key(&updated.cover_image)).await);
    assert!(!w.assets.exists(&object_key(&book.cover_image)).await);
}
