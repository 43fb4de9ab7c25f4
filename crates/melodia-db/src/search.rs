//! Full-text predicates shared by search and listing queries.

use sea_orm::sea_query::{Expr, SimpleExpr};

/// Text-search configuration used both here and by the GIN indexes created
/// in the migrations. The two must match for the indexes to be used.
pub const TEXT_SEARCH_CONFIG: &str = "english";

/// `to_tsvector(<config>, "<table>"."<column>") @@ websearch_to_tsquery(<config>, $1)`
///
/// `table` and `column` are compile-time identifiers, never user input. The
/// search term is always bound as a parameter.
pub fn text_search(table: &'static str, column: &'static str, term: &str) -> SimpleExpr {
    Expr::cust_with_values(
        format!(
            r#"to_tsvector('{TEXT_SEARCH_CONFIG}', "{table}"."{column}") @@ websearch_to_tsquery('{TEXT_SEARCH_CONFIG}', $1)"#
        ),
        [term.to_string()],
    )
}
