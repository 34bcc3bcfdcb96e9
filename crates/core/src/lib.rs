//! Core book catalog logic for elib.
//!
//! This crate contains the book lifecycle with ZERO web or database dependencies.
//! Persistence is reached through the [`catalog::BookRepository`] trait, which
//! the db crate implements.
//!
//! # Modules
//!
//! - `catalog` - Book create/update/delete flows and their compensation
//! - `storage` - Remote asset store (OpenDAL)
//! - `staging` - Local staging area for uploaded files

pub mod catalog;
pub mod staging;
pub mod storage;
