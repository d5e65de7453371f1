//! Gutenberg Catalog - read-only book catalog API
//!
//! Exposes the Project Gutenberg catalog (books, authors, languages, subjects,
//! bookshelves and download formats) through a paginated `/books` listing with
//! facet filtering, plus a single-book lookup.

pub mod api;
pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod pagination;

pub use app::{AppState, build_app};
