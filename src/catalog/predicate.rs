//! Composable filter predicates over the book collection
//!
//! A [Predicate] is a plain value describing which books match. It knows
//! nothing about SQL; the store renders it (see `crate::db::sql`). Predicates
//! are built by folding clauses together with [Predicate::and] and
//! [Predicate::any_of], so AND/OR nesting is fixed by the shape of the value
//! rather than by the order filters were applied.
//!
//! Association predicates ([Predicate::Related]) are existence tests: a book
//! matches when *at least one* related row matches. A book therefore appears
//! once no matter how many related rows satisfy the test.

/// An association from a book to a related entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Authors,
    Bookshelves,
    Formats,
    Languages,
    Subjects,
}

/// How a related entity's text column is compared against user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    /// Exact match against any of the given values.
    OneOf(Vec<String>),
    /// Case-insensitive substring match.
    Contains(String),
}

/// A boolean condition on a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The book's Gutenberg catalog id is one of the given ids.
    GutenbergIdIn(Vec<i64>),
    /// The book's title contains the text (case-insensitive). Untitled books never match.
    TitleContains(String),
    /// At least one related entity's key column matches.
    Related(Relation, TextMatch),
    /// Every clause holds. An empty list matches every book.
    AllOf(Vec<Predicate>),
    /// At least one clause holds. An empty list matches no book.
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    /// The predicate that matches the full collection.
    pub fn everything() -> Self {
        Predicate::AllOf(Vec::new())
    }

    /// Disjunction of `clauses`.
    pub fn any_of(clauses: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::AnyOf(clauses.into_iter().collect())
    }

    /// Returns a predicate requiring both `self` and `other`.
    ///
    /// Conjunctions are kept flat: `a.and(b).and(c)` is `AllOf([a, b, c])`.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::AllOf(mut clauses) => {
                clauses.push(other);
                Predicate::AllOf(clauses)
            }
            single => Predicate::AllOf(vec![single, other]),
        }
    }

    /// Returns `true` if this predicate places no constraint on the collection.
    pub fn is_everything(&self) -> bool {
        match self {
            Predicate::AllOf(clauses) => clauses.iter().all(Predicate::is_everything),
            _ => false,
        }
    }
}
