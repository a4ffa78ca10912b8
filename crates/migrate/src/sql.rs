//! Statement splitting for multi-statement script bodies.
//!
//! Postgres prepared statements accept a single statement at a time, while
//! migration and seed files routinely carry several. Scripts are split with
//! a real SQL parser, with a naive semicolon split as the fallback for
//! dialect constructs the parser does not know.

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Split a script body into individually executable statements.
pub fn split_statements(sql: &str) -> Vec<String> {
    if sql.trim().is_empty() {
        return Vec::new();
    }

    let dialect = GenericDialect {};
    match Parser::parse_sql(&dialect, sql) {
        Ok(parsed) => parsed
            .into_iter()
            .map(|stmt| format!("{};", stmt))
            .collect(),
        Err(e) => {
            tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            sql.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("{};", s))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_multiple_statements() {
        let stmts = split_statements("SELECT 1; SELECT 2");
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("SELECT 1"));
        assert!(stmts[1].starts_with("SELECT 2"));
    }

    #[test]
    fn empty_body_yields_no_statements() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("   \n  ").is_empty());
    }

    #[test]
    fn unparsable_sql_falls_back_to_semicolon_split() {
        let stmts = split_statements("FROB TABLE x; TWIDDLE y");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "FROB TABLE x;");
        assert_eq!(stmts[1], "TWIDDLE y;");
    }

    #[test]
    fn every_statement_is_terminated() {
        for stmt in split_statements("CREATE TABLE t (id INT); INSERT INTO t VALUES (1)") {
            assert!(stmt.ends_with(';'));
        }
    }
}
