//! Books migration.
//!
//! Creates the books table. Asset references are the public URLs returned
//! by the remote store.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(BOOKS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS books CASCADE;")
            .await?;
        Ok(())
    }
}

const BOOKS_SQL: &str = r"
CREATE TABLE books (
    id UUID PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    genre VARCHAR(100) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    author_id UUID NOT NULL,
    cover_image TEXT NOT NULL,
    file TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_books_title_not_blank CHECK (btrim(title) <> ''),
    CONSTRAINT chk_books_genre_not_blank CHECK (btrim(genre) <> '')
);

-- Author's books, newest first
CREATE INDEX idx_books_author ON books(author_id, created_at DESC);
";
