//! Book listing and detail endpoints

use axum::{
    Json, Router,
    extract::{OriginalUri, Path, RawQuery, State},
    http::{HeaderMap, header::HOST},
    routing::get,
};
use serde::Serialize;
use url::{Url, form_urlencoded};

use super::error::{ApiError, ApiResult};
use crate::AppState;
use crate::catalog::{Author, BookGraph, RawFacets};
use crate::pagination::{Page, PageRequest};

#[derive(Debug, Serialize)]
pub struct PersonResponse {
    pub name: String,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
}

impl From<Author> for PersonResponse {
    fn from(author: Author) -> Self {
        Self {
            name: author.name,
            birth_year: author.birth_year,
            death_year: author.death_year,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LanguageResponse {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct NamedResponse {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadLinkResponse {
    pub mime_type: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: i64,
    pub gutenberg_id: i64,
    pub title: Option<String>,
    pub authors: Vec<PersonResponse>,
    pub languages: Vec<LanguageResponse>,
    pub subjects: Vec<NamedResponse>,
    pub bookshelves: Vec<NamedResponse>,
    pub download_links: Vec<DownloadLinkResponse>,
    pub download_count: Option<i64>,
    pub media_type: String,
}

impl From<BookGraph> for BookResponse {
    fn from(graph: BookGraph) -> Self {
        let BookGraph { book, relations } = graph;
        Self {
            id: book.id,
            gutenberg_id: book.gutenberg_id,
            title: book.title,
            authors: relations.authors.into_iter().map(Into::into).collect(),
            languages: relations
                .languages
                .into_iter()
                .map(|l| LanguageResponse { code: l.code })
                .collect(),
            subjects: relations
                .subjects
                .into_iter()
                .map(|s| NamedResponse { name: s.name })
                .collect(),
            bookshelves: relations
                .bookshelves
                .into_iter()
                .map(|s| NamedResponse { name: s.name })
                .collect(),
            download_links: relations
                .formats
                .into_iter()
                .map(|f| DownloadLinkResponse {
                    mime_type: f.mime_type,
                    url: f.url,
                })
                .collect(),
            download_count: book.download_count,
            media_type: book.media_type,
        }
    }
}

/// One page of the listing.
#[derive(Debug, Serialize)]
pub struct BookListResponse {
    pub total_results: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<BookResponse>,
}

/// `GET /books` - one page of books matching the facet parameters.
async fn list_books(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<BookListResponse>> {
    let params: Vec<(String, String)> = query
        .as_deref()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let raw = RawFacets::from_pairs(params.iter().cloned());

    let request = PageRequest::parse(
        raw.first("page"),
        raw.first("page_size"),
        &state.config.page_limits,
    )?;
    let page = state.catalog.list_books(&raw, request).await?;

    let base = base_url(&state, &headers)?;
    let links = PageLinks {
        base: &base,
        path: uri.path(),
        params: &params,
    };
    Ok(Json(BookListResponse {
        next: page.next_page().map(|n| links.to_page(n)),
        previous: page.previous_page().map(|n| links.to_page(n)),
        total_results: page.total_results,
        total_pages: page.total_pages,
        current_page: page.current_page,
        results: Page::map(page, BookResponse::from).items,
    }))
}

/// `GET /books/{id}` - a single book by catalog id.
async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BookResponse>> {
    let id: i64 = id.parse().map_err(|_| ApiError::not_found())?;
    match state.catalog.get_book(id).await? {
        Some(graph) => Ok(Json(graph.into())),
        None => Err(ApiError::not_found()),
    }
}

/// Base URL for pagination links: configured public URL, else the request's
/// `Host`, else the local listen address.
fn base_url(state: &AppState, headers: &HeaderMap) -> ApiResult<Url> {
    if let Some(url) = &state.config.public_url {
        return Ok(url.clone());
    }
    let from_host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(|host| Url::parse(&format!("http://{host}")).ok());
    match from_host {
        Some(url) => Ok(url),
        None => Url::parse(&format!("http://localhost:{}", state.config.port)).map_err(|e| {
            tracing::error!(error = %e, "Failed to build base URL");
            ApiError::internal("Failed to build pagination links.")
        }),
    }
}

/// Builds absolute links to sibling pages of the current request.
struct PageLinks<'a> {
    base: &'a Url,
    path: &'a str,
    params: &'a [(String, String)],
}

impl PageLinks<'_> {
    /// The current request URL with `page` replaced. Page 1 drops the
    /// parameter. Parameters are sorted by name.
    fn to_page(&self, page: u64) -> String {
        let mut url = self.base.clone();
        url.set_path(&format!(
            "{}{}",
            self.base.path().trim_end_matches('/'),
            self.path
        ));

        let mut params: Vec<(&str, String)> = self
            .params
            .iter()
            .filter(|(k, _)| k != "page")
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        if page > 1 {
            params.push(("page", page.to_string()));
        }
        params.sort_by(|a, b| a.0.cmp(b.0));

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
        url.to_string()
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books))
        .route("/books/", get(list_books))
        .route("/books/{id}", get(get_book))
        .route("/books/{id}/", get(get_book))
}
