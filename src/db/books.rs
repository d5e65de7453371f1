//! Book repository: the SQLite-backed catalog store

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::sql::{render_order, render_predicate};
use crate::catalog::{
    Author, Book, BookQuery, BookRelations, Bookshelf, CatalogResult, CatalogStore, Format,
    Language, Subject,
};
use crate::pagination::PageWindow;

const BOOK_COLUMNS: &str = "b.id, b.gutenberg_id, b.title, b.download_count, b.media_type";

pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn authors(&self, book_id: i64) -> Result<Vec<Author>, sqlx::Error> {
        sqlx::query_as::<_, Author>(
            r#"
            SELECT a.id, a.name, a.birth_year, a.death_year
            FROM books_author a
            JOIN books_book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = ?
            ORDER BY a.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn bookshelves(&self, book_id: i64) -> Result<Vec<Bookshelf>, sqlx::Error> {
        sqlx::query_as::<_, Bookshelf>(
            r#"
            SELECT s.id, s.name
            FROM books_bookshelf s
            JOIN books_book_bookshelves bs ON bs.bookshelf_id = s.id
            WHERE bs.book_id = ?
            ORDER BY s.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn languages(&self, book_id: i64) -> Result<Vec<Language>, sqlx::Error> {
        sqlx::query_as::<_, Language>(
            r#"
            SELECT l.id, l.code
            FROM books_language l
            JOIN books_book_languages bl ON bl.language_id = l.id
            WHERE bl.book_id = ?
            ORDER BY l.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn subjects(&self, book_id: i64) -> Result<Vec<Subject>, sqlx::Error> {
        sqlx::query_as::<_, Subject>(
            r#"
            SELECT s.id, s.name
            FROM books_subject s
            JOIN books_book_subjects bs ON bs.subject_id = s.id
            WHERE bs.book_id = ?
            ORDER BY s.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn formats(&self, book_id: i64) -> Result<Vec<Format>, sqlx::Error> {
        sqlx::query_as::<_, Format>(
            "SELECT id, mime_type, url, book_id FROM books_format WHERE book_id = ? ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl CatalogStore for BookRepository {
    async fn count_books(&self, query: &BookQuery) -> CatalogResult<u64> {
        let filter = render_predicate(&query.predicate);
        let sql = format!("SELECT COUNT(*) FROM books_book b WHERE {}", filter.sql);
        tracing::debug!(sql = %sql, "Executing count query");

        let count: i64 = sqlx::query_scalar_with(&sql, filter.arguments()?)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn fetch_books(
        &self,
        query: &BookQuery,
        window: &PageWindow,
    ) -> CatalogResult<Vec<Book>> {
        let filter = render_predicate(&query.predicate);
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books_book b WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
            filter.sql,
            render_order(query.order),
            window.limit,
            i64::try_from(window.offset).unwrap_or(i64::MAX),
        );
        tracing::debug!(sql = %sql, "Executing book query");

        let books = sqlx::query_as_with::<_, Book, _>(&sql, filter.arguments()?)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn fetch_book(&self, id: i64) -> CatalogResult<Option<Book>> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books_book b WHERE b.id = ?");
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn load_relations(&self, book_id: i64) -> CatalogResult<BookRelations> {
        let (authors, bookshelves, languages, subjects, formats) = tokio::try_join!(
            self.authors(book_id),
            self.bookshelves(book_id),
            self.languages(book_id),
            self.subjects(book_id),
            self.formats(book_id),
        )?;

        Ok(BookRelations {
            authors,
            bookshelves,
            languages,
            subjects,
            formats,
        })
    }
}
