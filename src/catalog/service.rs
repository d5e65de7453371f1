//! Catalog service: validate → compile → count → window → fetch → expand.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, instrument};

use super::compiler::{BookQuery, compile};
use super::error::{CatalogError, CatalogResult};
use super::facets::{RawFacets, validate};
use super::model::{Book, BookGraph, BookRelations};
use crate::pagination::{Page, PageRequest, PageWindow};

/// Read access to the catalog store.
///
/// Implementations must be safe to call concurrently; the catalog holds no
/// per-request state of its own.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Number of distinct books matching `query`.
    async fn count_books(&self, query: &BookQuery) -> CatalogResult<u64>;

    /// The books in `window` of the ordered, de-duplicated result of `query`.
    async fn fetch_books(&self, query: &BookQuery, window: &PageWindow)
    -> CatalogResult<Vec<Book>>;

    /// A single book by its catalog id.
    async fn fetch_book(&self, id: i64) -> CatalogResult<Option<Book>>;

    /// The related entities of the book with id `book_id`, and only that book.
    async fn load_relations(&self, book_id: i64) -> CatalogResult<BookRelations>;
}

/// Entry point for catalog reads.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
    query_timeout: Duration,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>, query_timeout: Duration) -> Self {
        Self {
            store,
            query_timeout,
        }
    }

    /// List one page of books matching the facets in `raw`.
    ///
    /// Facets are validated before anything touches the store; an invalid
    /// facet fails the whole request. All store work for the request shares
    /// one deadline.
    #[instrument(skip_all, fields(service = "catalog"))]
    pub async fn list_books(
        &self,
        raw: &RawFacets,
        request: PageRequest,
    ) -> CatalogResult<Page<BookGraph>> {
        let facets = validate(raw)?;
        let query = compile(&facets);
        debug!(predicate = ?query.predicate, "Compiled book query");

        self.with_deadline(async {
            let total = self.store.count_books(&query).await?;
            let window = request.resolve(total);

            let books = if window.is_past_end(total) {
                Vec::new()
            } else {
                self.store.fetch_books(&query, &window).await?
            };
            let items = self.expand(books).await?;

            debug!(
                total,
                page = window.page,
                returned = items.len(),
                "Listed books"
            );
            Ok(Page::new(items, total, &window))
        })
        .await
    }

    /// Fetch one book, with its relations, by catalog id.
    #[instrument(skip(self), fields(service = "catalog"))]
    pub async fn get_book(&self, id: i64) -> CatalogResult<Option<BookGraph>> {
        self.with_deadline(async {
            match self.store.fetch_book(id).await? {
                Some(book) => Ok(self.expand(vec![book]).await?.pop()),
                None => Ok(None),
            }
        })
        .await
    }

    /// Attach relations to each book. Every row is resolved with its own
    /// lookup scoped to that row's id.
    async fn expand(&self, books: Vec<Book>) -> CatalogResult<Vec<BookGraph>> {
        try_join_all(books.into_iter().map(|book| async move {
            let relations = self.store.load_relations(book.id).await?;
            Ok::<_, CatalogError>(BookGraph { book, relations })
        }))
        .await
    }

    async fn with_deadline<T>(
        &self,
        work: impl Future<Output = CatalogResult<T>>,
    ) -> CatalogResult<T> {
        tokio::time::timeout(self.query_timeout, work)
            .await
            .map_err(|_| CatalogError::Timeout(self.query_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::Format;
    use crate::catalog::predicate::Predicate;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store over a fixed list of books, filtering only by Gutenberg id.
    #[derive(Default)]
    struct FixedStore {
        books: Vec<Book>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    fn book(id: i64) -> Book {
        Book {
            id,
            gutenberg_id: id * 10,
            title: Some(format!("Book {id}")),
            download_count: Some(100 - id),
            media_type: "Text".to_string(),
        }
    }

    impl FixedStore {
        fn with_books(n: i64) -> Self {
            Self {
                books: (1..=n).map(book).collect(),
                ..Default::default()
            }
        }

        fn matching(&self, query: &BookQuery) -> Vec<Book> {
            let ids = match &query.predicate {
                Predicate::AllOf(clauses) => clauses.iter().find_map(|c| match c {
                    Predicate::GutenbergIdIn(ids) => Some(ids.clone()),
                    _ => None,
                }),
                _ => None,
            };
            self.books
                .iter()
                .filter(|b| ids.as_ref().is_none_or(|ids| ids.contains(&b.gutenberg_id)))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl CatalogStore for FixedStore {
        async fn count_books(&self, query: &BookQuery) -> CatalogResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.matching(query).len() as u64)
        }

        async fn fetch_books(
            &self,
            query: &BookQuery,
            window: &PageWindow,
        ) -> CatalogResult<Vec<Book>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .matching(query)
                .into_iter()
                .skip(window.offset as usize)
                .take(window.limit as usize)
                .collect())
        }

        async fn fetch_book(&self, id: i64) -> CatalogResult<Option<Book>> {
            Ok(self.books.iter().find(|b| b.id == id).cloned())
        }

        async fn load_relations(&self, book_id: i64) -> CatalogResult<BookRelations> {
            Ok(BookRelations {
                formats: vec![Format {
                    id: book_id,
                    mime_type: "text/html".to_string(),
                    url: format!("https://example.org/{book_id}.html"),
                    book_id,
                }],
                ..Default::default()
            })
        }
    }

    fn catalog(store: FixedStore) -> (Catalog, Arc<FixedStore>) {
        let store = Arc::new(store);
        (
            Catalog::new(store.clone(), Duration::from_secs(5)),
            store,
        )
    }

    #[tokio::test]
    async fn test_invalid_facet_never_reaches_store() {
        let (catalog, store) = catalog(FixedStore::with_books(3));
        let raw = RawFacets::from_pairs([("author", "123")]);
        let err = catalog
            .list_books(&raw, PageRequest::default())
            .await
            .unwrap_err();
        assert_matches!(err, CatalogError::FacetValidation { facet: "author", .. });
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_books_pages_and_expands() {
        let (catalog, _) = catalog(FixedStore::with_books(12));
        let page = catalog
            .list_books(&RawFacets::default(), PageRequest::new(2, 5))
            .await
            .unwrap();

        assert_eq!(page.total_results, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
        let ids: Vec<_> = page.items.iter().map(|g| g.book.id).collect();
        assert_eq!(ids, vec![6, 7, 8, 9, 10]);
        for graph in &page.items {
            assert!(graph.relations.formats.iter().all(|f| f.book_id == graph.book.id));
        }
    }

    #[tokio::test]
    async fn test_page_past_end_skips_fetch() {
        let (catalog, store) = catalog(FixedStore::with_books(4));
        let page = catalog
            .list_books(&RawFacets::default(), PageRequest::new(7, 10))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_results, 4);
        assert_eq!(page.current_page, 7);
        // Count only.
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_book() {
        let (catalog, _) = catalog(FixedStore::with_books(4));
        let graph = catalog.get_book(2).await.unwrap().unwrap();
        assert_eq!(graph.book.id, 2);
        assert_eq!(graph.relations.formats[0].book_id, 2);
        assert!(catalog.get_book(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = FixedStore {
            delay: Some(Duration::from_secs(30)),
            ..FixedStore::with_books(1)
        };
        let catalog = Catalog::new(Arc::new(store), Duration::from_millis(50));
        let err = catalog
            .list_books(&RawFacets::default(), PageRequest::default())
            .await
            .unwrap_err();
        assert_matches!(err, CatalogError::Timeout(d) if d == Duration::from_millis(50));
    }
}
