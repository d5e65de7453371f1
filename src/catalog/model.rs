//! Catalog entities as read from the store

/// Book record from database
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub gutenberg_id: i64,
    pub title: Option<String>,
    pub download_count: Option<i64>,
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Bookshelf {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Language {
    pub id: i64,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

/// A downloadable rendition of one book.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Format {
    pub id: i64,
    pub mime_type: String,
    pub url: String,
    pub book_id: i64,
}

/// Everything related to one book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookRelations {
    pub authors: Vec<Author>,
    pub bookshelves: Vec<Bookshelf>,
    pub languages: Vec<Language>,
    pub subjects: Vec<Subject>,
    pub formats: Vec<Format>,
}

/// A book together with its related entities, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookGraph {
    pub book: Book,
    pub relations: BookRelations,
}
