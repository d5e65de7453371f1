//! SQL rendering for compiled catalog queries
//!
//! Turns a [Predicate] into a parameterized WHERE fragment over the book
//! table (aliased `b`). Association tests render as `EXISTS` subqueries,
//! which is what keeps each matching book to a single row however many
//! related rows match. Case-insensitive containment binds the escaped user
//! text as a `(?i)` pattern for the `REGEXP` function the pool registers, so
//! case folding covers non-ASCII letters and `%`/`_` stay literal.

use sqlx::Arguments;
use sqlx::sqlite::SqliteArguments;

use crate::catalog::{OrderTerm, Predicate, Relation, SortKey, TextMatch};

/// Represents a SQL value that can be bound to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Int(i64),
}

/// A SQL fragment and the values for its `?` placeholders, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl SqlFragment {
    /// Build sqlx arguments for this fragment's placeholders.
    pub fn arguments<'q>(&self) -> Result<SqliteArguments<'q>, sqlx::Error> {
        let mut args = SqliteArguments::default();
        for value in &self.values {
            match value {
                SqlValue::String(s) => args.add(s.clone()),
                SqlValue::Int(i) => args.add(*i),
            }
            .map_err(sqlx::Error::Encode)?;
        }
        Ok(args)
    }

    fn push_placeholders(&mut self, values: impl IntoIterator<Item = SqlValue>) {
        let mut first = true;
        for value in values {
            if !first {
                self.sql.push_str(", ");
            }
            first = false;
            self.sql.push('?');
            self.values.push(value);
        }
    }
}

/// Table layout of one book association.
struct Association {
    table: &'static str,
    /// Join table and its foreign key to `table`. `None` when `table` points at the book directly.
    join: Option<(&'static str, &'static str)>,
    /// Column compared against user input.
    column: &'static str,
}

fn association(relation: Relation) -> Association {
    match relation {
        Relation::Authors => Association {
            table: "books_author",
            join: Some(("books_book_authors", "author_id")),
            column: "name",
        },
        Relation::Bookshelves => Association {
            table: "books_bookshelf",
            join: Some(("books_book_bookshelves", "bookshelf_id")),
            column: "name",
        },
        Relation::Languages => Association {
            table: "books_language",
            join: Some(("books_book_languages", "language_id")),
            column: "code",
        },
        Relation::Subjects => Association {
            table: "books_subject",
            join: Some(("books_book_subjects", "subject_id")),
            column: "name",
        },
        Relation::Formats => Association {
            table: "books_format",
            join: None,
            column: "mime_type",
        },
    }
}

/// Render `predicate` as a boolean SQL expression over `books_book b`.
pub fn render_predicate(predicate: &Predicate) -> SqlFragment {
    let mut out = SqlFragment::default();
    render_into(predicate, &mut out);
    out
}

fn render_into(predicate: &Predicate, out: &mut SqlFragment) {
    match predicate {
        Predicate::AllOf(clauses) => render_junction(clauses, " AND ", "1 = 1", out),
        Predicate::AnyOf(clauses) => render_junction(clauses, " OR ", "1 = 0", out),
        Predicate::GutenbergIdIn(ids) if ids.is_empty() => out.sql.push_str("1 = 0"),
        Predicate::GutenbergIdIn(ids) => {
            out.sql.push_str("b.gutenberg_id IN (");
            out.push_placeholders(ids.iter().copied().map(SqlValue::Int));
            out.sql.push(')');
        }
        Predicate::TitleContains(text) => {
            render_contains("b.title", text, out);
        }
        Predicate::Related(relation, matcher) => render_exists(*relation, matcher, out),
    }
}

fn render_junction(clauses: &[Predicate], op: &str, empty: &str, out: &mut SqlFragment) {
    match clauses {
        [] => out.sql.push_str(empty),
        [single] => render_into(single, out),
        many => {
            out.sql.push('(');
            for (i, clause) in many.iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(op);
                }
                render_into(clause, out);
            }
            out.sql.push(')');
        }
    }
}

/// Unicode case-insensitive pattern matching `text` literally.
pub(crate) fn contains_pattern(text: &str) -> String {
    format!("(?i){}", regex::escape(text))
}

fn render_contains(column: &str, text: &str, out: &mut SqlFragment) {
    out.sql.push_str(&format!("{column} REGEXP ?"));
    out.values.push(SqlValue::String(contains_pattern(text)));
}

fn render_exists(relation: Relation, matcher: &TextMatch, out: &mut SqlFragment) {
    if let TextMatch::OneOf(values) = matcher
        && values.is_empty()
    {
        out.sql.push_str("1 = 0");
        return;
    }

    let assoc = association(relation);
    match assoc.join {
        Some((join_table, fk)) => out.sql.push_str(&format!(
            "EXISTS (SELECT 1 FROM {join_table} j JOIN {table} r ON r.id = j.{fk} \
             WHERE j.book_id = b.id AND ",
            table = assoc.table
        )),
        None => out.sql.push_str(&format!(
            "EXISTS (SELECT 1 FROM {table} r WHERE r.book_id = b.id AND ",
            table = assoc.table
        )),
    }

    let column = format!("r.{}", assoc.column);
    match matcher {
        TextMatch::OneOf(values) => {
            out.sql.push_str(&column);
            out.sql.push_str(" IN (");
            out.push_placeholders(values.iter().cloned().map(SqlValue::String));
            out.sql.push(')');
        }
        TextMatch::Contains(text) => render_contains(&column, text, out),
    }
    out.sql.push(')');
}

/// Render an ORDER BY list. Missing values always sort last.
pub fn render_order(terms: &[OrderTerm]) -> String {
    terms
        .iter()
        .map(|term| {
            let column = match term.key {
                SortKey::DownloadCount => "b.download_count",
                SortKey::Id => "b.id",
            };
            format!(
                "{column} IS NULL, {column} {}",
                term.direction.to_sql()
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_ORDER;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> SqlValue {
        SqlValue::String(v.to_string())
    }

    #[test]
    fn test_everything_renders_true() {
        let frag = render_predicate(&Predicate::everything());
        assert_eq!(frag.sql, "1 = 1");
        assert!(frag.values.is_empty());
    }

    #[test]
    fn test_empty_disjunction_renders_false() {
        assert_eq!(render_predicate(&Predicate::any_of([])).sql, "1 = 0");
        assert_eq!(
            render_predicate(&Predicate::GutenbergIdIn(Vec::new())).sql,
            "1 = 0"
        );
        assert_eq!(
            render_predicate(&Predicate::Related(
                Relation::Languages,
                TextMatch::OneOf(Vec::new())
            ))
            .sql,
            "1 = 0"
        );
    }

    #[test]
    fn test_gutenberg_ids() {
        let frag = render_predicate(&Predicate::GutenbergIdIn(vec![11, 76]));
        assert_eq!(frag.sql, "b.gutenberg_id IN (?, ?)");
        assert_eq!(frag.values, vec![SqlValue::Int(11), SqlValue::Int(76)]);
    }

    #[test]
    fn test_language_membership_is_exists() {
        let frag = render_predicate(&Predicate::Related(
            Relation::Languages,
            TextMatch::OneOf(vec!["en".into(), "fr".into()]),
        ));
        assert_eq!(
            frag.sql,
            "EXISTS (SELECT 1 FROM books_book_languages j JOIN books_language r ON r.id = j.language_id \
             WHERE j.book_id = b.id AND r.code IN (?, ?))"
        );
        assert_eq!(frag.values, vec![s("en"), s("fr")]);
    }

    #[test]
    fn test_formats_are_scoped_by_book_id() {
        let frag = render_predicate(&Predicate::Related(
            Relation::Formats,
            TextMatch::OneOf(vec!["text/html".into()]),
        ));
        assert_eq!(
            frag.sql,
            "EXISTS (SELECT 1 FROM books_format r WHERE r.book_id = b.id AND r.mime_type IN (?))"
        );
    }

    #[test]
    fn test_nesting_follows_structure() {
        let predicate = Predicate::everything()
            .and(Predicate::any_of([
                Predicate::Related(Relation::Subjects, TextMatch::Contains("sea".into())),
                Predicate::Related(Relation::Bookshelves, TextMatch::Contains("sea".into())),
            ]))
            .and(Predicate::TitleContains("Moby".into()));
        let frag = render_predicate(&predicate);

        assert!(frag.sql.starts_with("((EXISTS (SELECT 1 FROM books_book_subjects"));
        assert!(frag.sql.contains(") OR EXISTS (SELECT 1 FROM books_book_bookshelves"));
        assert!(frag.sql.ends_with(") AND b.title REGEXP ?)"));
        assert_eq!(frag.values, vec![s("(?i)sea"), s("(?i)sea"), s("(?i)Moby")]);
    }

    #[test]
    fn test_user_text_is_bound_not_inlined() {
        let frag = render_predicate(&Predicate::TitleContains("100% '; DROP".into()));
        assert_eq!(frag.sql, "b.title REGEXP ?");
        assert_eq!(frag.values, vec![s("(?i)100% '; DROP")]);
    }

    #[test]
    fn test_arguments_match_placeholders() {
        let frag = render_predicate(
            &Predicate::everything()
                .and(Predicate::GutenbergIdIn(vec![1, 2, 3]))
                .and(Predicate::TitleContains("x".into())),
        );
        assert_eq!(frag.sql.matches('?').count(), frag.values.len());
        let args = frag.arguments().unwrap();
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_contains_pattern_escapes_metacharacters() {
        assert_eq!(contains_pattern("Brontë"), "(?i)Brontë");
        assert_eq!(contains_pattern("a.b*(c)"), r"(?i)a\.b\*\(c\)");
        assert_eq!(contains_pattern(""), "(?i)");

        let re = regex::Regex::new(&contains_pattern("BRONTË")).unwrap();
        assert!(re.is_match("Brontë, Charlotte"));
        assert!(!regex::Regex::new(&contains_pattern("a.b")).unwrap().is_match("axb"));
    }

    #[test]
    fn test_default_order() {
        assert_eq!(
            render_order(DEFAULT_ORDER),
            "b.download_count IS NULL, b.download_count DESC, b.id IS NULL, b.id ASC"
        );
    }
}
