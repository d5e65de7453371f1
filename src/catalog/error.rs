//! Catalog error types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Everything that can go wrong while answering a catalog request.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// One facet's input failed its validation rule. Raised before any query runs.
    #[error("invalid `{facet}` filter: {message}")]
    FacetValidation {
        facet: &'static str,
        message: &'static str,
    },

    /// A pagination parameter could not be interpreted.
    #[error("invalid `{parameter}` parameter: {message}")]
    InvalidPage {
        parameter: &'static str,
        message: &'static str,
    },

    /// The store rejected or failed the composed query.
    #[error("catalog query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// The store did not answer within the request deadline.
    #[error("catalog query exceeded the {0:?} deadline")]
    Timeout(Duration),
}

impl CatalogError {
    /// The request parameter and message to report back to the caller, for
    /// errors caused by the request itself.
    pub fn rejected_parameter(&self) -> Option<(&'static str, &'static str)> {
        match self {
            CatalogError::FacetValidation { facet, message } => Some((facet, message)),
            CatalogError::InvalidPage { parameter, message } => Some((parameter, message)),
            CatalogError::Query(_) | CatalogError::Timeout(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_parameter_for_client_errors() {
        let err = CatalogError::FacetValidation {
            facet: "author",
            message: "Author filter must be a string, not a numeric ID.",
        };
        assert_eq!(
            err.rejected_parameter(),
            Some(("author", "Author filter must be a string, not a numeric ID."))
        );

        let err = CatalogError::InvalidPage {
            parameter: "page",
            message: "Invalid page.",
        };
        assert_eq!(err.rejected_parameter(), Some(("page", "Invalid page.")));
    }

    #[test]
    fn test_store_failures_are_not_scoped_to_a_parameter() {
        let err = CatalogError::Query(sqlx::Error::RowNotFound);
        assert!(err.rejected_parameter().is_none());

        let err = CatalogError::Timeout(Duration::from_secs(3));
        assert!(err.rejected_parameter().is_none());
    }
}
