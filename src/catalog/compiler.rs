//! Filter compiler
//!
//! Folds the validated facets of a request into one [BookQuery]: a single
//! composed [Predicate] plus the catalog's fixed ordering.
//!
//! Combination rules:
//! - facets are AND-ed; a facet that was not supplied adds nothing
//! - values inside one facet are OR-ed
//! - `gutenberg_id`, `language` and `mime_type` use exact set membership,
//!   `topic`, `author` and `title` use case-insensitive substring matching
//!
//! Every association test is an existence check, so a book that matches
//! through several related rows still appears once.

use super::facets::{FacetValues, ValidatedFacets};
use super::predicate::{Predicate, Relation, TextMatch};

/// Sort direction for ORDER BY terms.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OrderDirection {
    /// Ascending order (A-Z, 1-9)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1)
    Desc,
}

impl OrderDirection {
    /// Convert to SQL order string
    pub fn to_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Book columns the catalog can be ordered by.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SortKey {
    DownloadCount,
    Id,
}

/// One ORDER BY term. Rows with no value for `key` always sort after rows that have one.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OrderTerm {
    pub key: SortKey,
    pub direction: OrderDirection,
}

/// Most downloaded first, books without a download count last, then by id.
///
/// The trailing `id` term makes the order total, which keeps page windows
/// stable across requests.
pub const DEFAULT_ORDER: &[OrderTerm] = &[
    OrderTerm {
        key: SortKey::DownloadCount,
        direction: OrderDirection::Desc,
    },
    OrderTerm {
        key: SortKey::Id,
        direction: OrderDirection::Asc,
    },
];

/// A compiled catalog query, ready to hand to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct BookQuery {
    pub predicate: Predicate,
    pub order: &'static [OrderTerm],
}

impl BookQuery {
    /// The unfiltered catalog in default order.
    pub fn all() -> Self {
        Self {
            predicate: Predicate::everything(),
            order: DEFAULT_ORDER,
        }
    }
}

/// Compile validated facets into a single query.
pub fn compile(facets: &ValidatedFacets) -> BookQuery {
    let predicate = facets
        .iter()
        .fold(Predicate::everything(), |composed, (spec, values)| {
            composed.and((spec.predicate)(values))
        });

    BookQuery {
        predicate,
        order: DEFAULT_ORDER,
    }
}

pub(crate) fn gutenberg_id_predicate(values: &FacetValues) -> Predicate {
    Predicate::GutenbergIdIn(values.integers().to_vec())
}

pub(crate) fn language_predicate(values: &FacetValues) -> Predicate {
    Predicate::Related(Relation::Languages, TextMatch::OneOf(values.text().to_vec()))
}

pub(crate) fn mime_type_predicate(values: &FacetValues) -> Predicate {
    Predicate::Related(Relation::Formats, TextMatch::OneOf(values.text().to_vec()))
}

/// A topic matches a subject name or a bookshelf name.
pub(crate) fn topic_predicate(values: &FacetValues) -> Predicate {
    Predicate::any_of(values.text().iter().map(|topic| {
        Predicate::any_of([
            Predicate::Related(Relation::Subjects, TextMatch::Contains(topic.clone())),
            Predicate::Related(Relation::Bookshelves, TextMatch::Contains(topic.clone())),
        ])
    }))
}

pub(crate) fn author_predicate(values: &FacetValues) -> Predicate {
    Predicate::any_of(
        values
            .text()
            .iter()
            .map(|name| Predicate::Related(Relation::Authors, TextMatch::Contains(name.clone()))),
    )
}

pub(crate) fn title_predicate(values: &FacetValues) -> Predicate {
    Predicate::any_of(
        values
            .text()
            .iter()
            .map(|title| Predicate::TitleContains(title.clone())),
    )
}
