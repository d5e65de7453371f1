//! Page-number pagination for catalog listings
//!
//! Requests name a 1-based page and a page size; the store is asked for the
//! matching offset/limit window of the fully ordered result. A page past the
//! end is not an error, it is simply empty.

use crate::catalog::{CatalogError, CatalogResult};

/// Page size used when the request does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Largest page size a request may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Host-configured page size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

/// Which page the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(u64),
    /// Whatever the last page turns out to be once the result is counted.
    Last,
}

/// A validated pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: PageNumber,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    pub fn new(page: u64, page_size: u32) -> Self {
        Self {
            page: PageNumber::Number(page.max(1)),
            page_size: page_size.max(1),
        }
    }

    /// Parse the `page` and `page_size` request parameters.
    ///
    /// A missing, malformed or zero `page_size` falls back to the default and
    /// an oversized one is clamped. `page` must be a positive integer or `last`.
    pub fn parse(
        page: Option<&str>,
        page_size: Option<&str>,
        limits: &PageLimits,
    ) -> CatalogResult<Self> {
        let page_size = page_size
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(limits.default_size)
            .clamp(1, limits.max_size.max(1));

        let page = match page.map(str::trim) {
            None => PageNumber::Number(1),
            Some("last") => PageNumber::Last,
            Some(s) => match s.parse::<u64>() {
                Ok(n) if n >= 1 => PageNumber::Number(n),
                _ => {
                    return Err(CatalogError::InvalidPage {
                        parameter: "page",
                        message: "Invalid page.",
                    });
                }
            },
        };

        Ok(Self { page, page_size })
    }

    /// Resolve this request against the total number of matching rows.
    pub fn resolve(&self, total: u64) -> PageWindow {
        let size = u64::from(self.page_size);
        let total_pages = total.div_ceil(size).max(1);
        let page = match self.page {
            PageNumber::Number(n) => n,
            PageNumber::Last => total_pages,
        };

        PageWindow {
            page,
            total_pages,
            offset: (page - 1).saturating_mul(size),
            limit: self.page_size,
        }
    }
}

/// The slice of the ordered result one page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub total_pages: u64,
    pub offset: u64,
    pub limit: u32,
}

impl PageWindow {
    /// Returns `true` if the window starts past the last row.
    pub fn is_past_end(&self, total: u64) -> bool {
        self.offset >= total
    }
}

/// One page of results plus the metadata needed to navigate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_results: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_results: u64, window: &PageWindow) -> Self {
        Self {
            items,
            total_results,
            total_pages: window.total_pages,
            current_page: window.page,
        }
    }

    /// Number of the following page, if there is one.
    pub fn next_page(&self) -> Option<u64> {
        (self.current_page < self.total_pages).then(|| self.current_page + 1)
    }

    /// Number of the preceding page, if there is one. From past the end
    /// this points back at the last real page.
    pub fn previous_page(&self) -> Option<u64> {
        (self.current_page > 1).then(|| (self.current_page - 1).min(self.total_pages))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_results: self.total_results,
            total_pages: self.total_pages,
            current_page: self.current_page,
        }
    }
}
