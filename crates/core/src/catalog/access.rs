//! Ownership rule shared by the update and delete flows.

use elib_shared::UserId;

use super::error::CatalogError;
use super::types::Book;

/// Only the author of a book may change or delete it.
#[must_use]
pub fn is_owner(book: &Book, caller_id: UserId) -> bool {
    book.author_id == caller_id
}

/// [`is_owner`] as a flow guard.
///
/// # Errors
///
/// Returns [`CatalogError::Forbidden`] when the caller is not the author.
pub fn ensure_owner(book: &Book, caller_id: UserId) -> Result<(), CatalogError> {
    if is_owner(book, caller_id) {
        Ok(())
    } else {
        Err(CatalogError::Forbidden {
            book_id: book.id,
            caller_id,
        })
    }
}
