//! The book catalog: facet validation, filter compilation and listing.
//!
//! A listing request flows through:
//! 1. [facets::validate] - per-facet validation of the raw parameters
//! 2. [compiler::compile] - one composed predicate + default ordering
//! 3. [CatalogStore] - counting and windowed fetching
//! 4. relation loading, one scoped lookup per result row

pub mod compiler;
pub mod error;
pub mod facets;
pub mod model;
pub mod predicate;
mod service;

pub use compiler::{BookQuery, DEFAULT_ORDER, OrderDirection, OrderTerm, SortKey, compile};
pub use error::{CatalogError, CatalogResult};
pub use facets::{FACETS, FacetSpec, FacetValues, RawFacets, ValidatedFacets, validate};
pub use model::{Author, Book, BookGraph, BookRelations, Bookshelf, Format, Language, Subject};
pub use predicate::{Predicate, Relation, TextMatch};
pub use service::{Catalog, CatalogStore};
