//! `SeaORM` entity definitions.

pub mod books;

pub mod prelude {
    //! Entity re-exports.
    pub use super::books::Entity as Books;
}
