//! Facet validation
//!
//! Every filterable dimension of the catalog is described by one [FacetSpec]
//! row in [FACETS]: the query parameters it reads, how raw values are split
//! into tokens, how tokens are normalized and validated, and which predicate
//! builder turns the validated values into a filter. Adding a facet means
//! adding a row.

use super::compiler;
use super::error::{CatalogError, CatalogResult};
use super::predicate::Predicate;

/// Raw request parameters, in the order the client sent them.
///
/// Repeated parameters keep every occurrence, so `language=en&language=fr`
/// yields two values for `language`.
#[derive(Debug, Clone, Default)]
pub struct RawFacets {
    params: Vec<(String, String)>,
}

impl RawFacets {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// All values supplied for `name`, in request order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.params
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The first value supplied for `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// How a raw parameter value is broken into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// `a,b` is two tokens, exactly as if the parameter had been repeated.
    Comma,
    /// The whole value is one token.
    Whole,
}

/// The validated, normalized values of one facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetValues {
    Integers(Vec<i64>),
    Text(Vec<String>),
}

impl FacetValues {
    pub fn integers(&self) -> &[i64] {
        match self {
            FacetValues::Integers(values) => values,
            FacetValues::Text(_) => &[],
        }
    }

    pub fn text(&self) -> &[String] {
        match self {
            FacetValues::Text(values) => values,
            FacetValues::Integers(_) => &[],
        }
    }
}

/// Declarative description of one facet.
pub struct FacetSpec {
    /// Name reported in validation errors.
    pub name: &'static str,
    /// Query parameters collected into this facet, in order.
    pub params: &'static [&'static str],
    pub split: Split,
    /// Normalizes a token. `None` drops it.
    pub normalize: fn(&str) -> Option<String>,
    /// Validates the normalized tokens. Only called with at least one token.
    pub validate: fn(Vec<String>) -> Result<FacetValues, &'static str>,
    /// Builds the facet's predicate from its validated values.
    pub predicate: fn(&FacetValues) -> Predicate,
}

impl std::fmt::Debug for FacetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("split", &self.split)
            .finish()
    }
}

impl FacetSpec {
    /// Collect this facet's normalized tokens from the raw request.
    pub fn tokens(&self, raw: &RawFacets) -> Vec<String> {
        self.params
            .iter()
            .flat_map(|param| raw.values(*param))
            .flat_map(|value| match self.split {
                Split::Comma => value.split(',').collect::<Vec<_>>(),
                Split::Whole => vec![value],
            })
            .filter_map(self.normalize)
            .collect()
    }
}

/// All recognized facets, in validation order.
pub static FACETS: &[FacetSpec] = &[
    FacetSpec {
        name: "gutenberg_id",
        params: &["gutenberg_id"],
        split: Split::Comma,
        normalize: trimmed,
        validate: all_integers,
        predicate: compiler::gutenberg_id_predicate,
    },
    FacetSpec {
        name: "language",
        params: &["language", "languages"],
        split: Split::Comma,
        normalize: language_code,
        validate: any_text,
        predicate: compiler::language_predicate,
    },
    FacetSpec {
        name: "mime_type",
        params: &["mime_type"],
        split: Split::Whole,
        normalize: lowercased,
        validate: any_text,
        predicate: compiler::mime_type_predicate,
    },
    FacetSpec {
        name: "topic",
        params: &["topic"],
        split: Split::Whole,
        normalize: verbatim,
        validate: any_text,
        predicate: compiler::topic_predicate,
    },
    FacetSpec {
        name: "author",
        params: &["author"],
        split: Split::Whole,
        normalize: verbatim,
        validate: author_names,
        predicate: compiler::author_predicate,
    },
    FacetSpec {
        name: "title",
        params: &["title"],
        split: Split::Whole,
        normalize: verbatim,
        validate: any_text,
        predicate: compiler::title_predicate,
    },
];

/// The facets present in one request, validated, in [FACETS] order.
#[derive(Debug, Default)]
pub struct ValidatedFacets {
    entries: Vec<(&'static FacetSpec, FacetValues)>,
}

impl ValidatedFacets {
    pub fn iter(&self) -> impl Iterator<Item = (&'static FacetSpec, &FacetValues)> {
        self.entries.iter().map(|(spec, values)| (*spec, values))
    }

    /// Values for the facet called `name`, if it was supplied.
    pub fn get(&self, name: &str) -> Option<&FacetValues> {
        self.entries
            .iter()
            .find(|(spec, _)| spec.name == name)
            .map(|(_, values)| values)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validate every recognized facet in `raw`.
///
/// Facets without tokens are skipped. Stops at the first facet that fails and
/// reports only that one.
pub fn validate(raw: &RawFacets) -> CatalogResult<ValidatedFacets> {
    let mut entries = Vec::new();
    for spec in FACETS {
        let tokens = spec.tokens(raw);
        if tokens.is_empty() {
            continue;
        }
        let values = (spec.validate)(tokens).map_err(|message| {
            tracing::debug!(facet = spec.name, reason = message, "Rejected facet filter");
            CatalogError::FacetValidation {
                facet: spec.name,
                message,
            }
        })?;
        entries.push((spec, values));
    }
    Ok(ValidatedFacets { entries })
}

fn trimmed(token: &str) -> Option<String> {
    Some(token.trim().to_string())
}

fn language_code(token: &str) -> Option<String> {
    let code = token.trim();
    (!code.is_empty()).then(|| code.to_lowercase())
}

fn lowercased(token: &str) -> Option<String> {
    Some(token.to_lowercase())
}

fn verbatim(token: &str) -> Option<String> {
    Some(token.to_string())
}

fn is_all_digits(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_numeric)
}

fn all_integers(tokens: Vec<String>) -> Result<FacetValues, &'static str> {
    tokens
        .iter()
        .map(|token| {
            is_all_digits(token)
                .then(|| token.parse::<i64>().ok())
                .flatten()
        })
        .collect::<Option<Vec<_>>>()
        .map(FacetValues::Integers)
        .ok_or("All Gutenberg IDs must be integers.")
}

fn any_text(tokens: Vec<String>) -> Result<FacetValues, &'static str> {
    Ok(FacetValues::Text(tokens))
}

fn author_names(tokens: Vec<String>) -> Result<FacetValues, &'static str> {
    if tokens.iter().any(|token| is_all_digits(token)) {
        return Err("Author filter must be a string, not a numeric ID.");
    }
    Ok(FacetValues::Text(tokens))
}
