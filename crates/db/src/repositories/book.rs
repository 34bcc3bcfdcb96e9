//! Book repository for database operations.
//!
//! Implements the catalog's book persistence using SeaORM.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel, Set};

use crate::entities::books;
use elib_core::catalog::{
    Book, BookChanges, BookRepository as BookRepoTrait, CatalogError, NewBook,
};
use elib_shared::{BookId, UserId};

/// Book repository implementation.
#[derive(Debug)]
pub struct BookRepository {
    db: DatabaseConnection,
}

impl BookRepository {
    /// Create a new book repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl BookRepoTrait for BookRepository {
    async fn create(&self, book: NewBook) -> Result<Book, CatalogError> {
        let now = Utc::now().fixed_offset();
        let active_model = books::ActiveModel {
            id: Set(book.id.into_inner()),
            title: Set(book.metadata.title),
            genre: Set(book.metadata.genre),
            description: Set(book.metadata.description),
            author_id: Set(book.author_id.into_inner()),
            cover_image: Set(book.cover_image),
            file: Set(book.file),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| CatalogError::persistence(e.to_string()))?;

        Ok(model_to_book(model))
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, CatalogError> {
        let model = books::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| CatalogError::persistence(e.to_string()))?;

        Ok(model.map(model_to_book))
    }

    async fn update(&self, id: BookId, changes: BookChanges) -> Result<Option<Book>, CatalogError> {
        let Some(model) = books::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| CatalogError::persistence(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut active_model = model.into_active_model();
        if let Some(title) = changes.metadata.title {
            active_model.title = Set(title);
        }
        if let Some(genre) = changes.metadata.genre {
            active_model.genre = Set(genre);
        }
        if let Some(description) = changes.metadata.description {
            active_model.description = Set(description);
        }
        if let Some(cover_image) = changes.cover_image {
            active_model.cover_image = Set(cover_image);
        }
        if let Some(file) = changes.file {
            active_model.file = Set(file);
        }
        active_model.updated_at = Set(Utc::now().fixed_offset());

        match active_model.update(&self.db).await {
            Ok(model) => Ok(Some(model_to_book(model))),
            // Row deleted between the read and the write
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(CatalogError::persistence(e.to_string())),
        }
    }

    async fn delete(&self, id: BookId) -> Result<bool, CatalogError> {
        let result = books::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await
            .map_err(|e| CatalogError::persistence(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }
}

fn model_to_book(model: books::Model) -> Book {
    Book {
        id: BookId::from_uuid(model.id),
        title: model.title,
        genre: model.genre,
        description: model.description,
        author_id: UserId::from_uuid(model.author_id),
        cover_image: model.cover_image,
        file: model.file,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
