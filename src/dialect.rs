use compact_str::CompactString;
use phf::{phf_set, Set};

use crate::error::SqlembedError;

/// Reserved words shared by every dialect.
static ANSI_KEYWORDS: Set<&'static str> = phf_set! {
    "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASCADE", "CASE",
    "CHECK", "COLUMN", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "DEFAULT",
    "DELETE", "DESC", "DISTINCT", "DO", "DROP", "ELSE", "END", "EXCEPT", "EXISTS", "FALSE",
    "FETCH", "FILTER", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IF",
    "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LATERAL",
    "LEFT", "LIKE", "LIMIT", "NATURAL", "NOT", "NOTHING", "NULL", "NULLS", "OFFSET", "ON",
    "ONLY", "OR", "ORDER", "OUTER", "OVER", "PARTITION", "PRECEDING", "PRIMARY", "RANGE",
    "RECURSIVE", "REFERENCES", "REPLACE", "RIGHT", "ROWS", "SELECT", "SET", "SOME", "TABLE",
    "THEN", "TRUE", "TRUNCATE", "UNBOUNDED", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES",
    "VIEW", "WHEN", "WHERE", "WINDOW", "WITH",
};

static POSTGRES_KEYWORDS: Set<&'static str> = phf_set! {
    "ILIKE", "RETURNING", "SIMILAR", "MATERIALIZED", "CONCURRENTLY", "EXCLUDED",
};

static MYSQL_KEYWORDS: Set<&'static str> = phf_set! {
    "AUTO_INCREMENT", "DUPLICATE", "IGNORE", "REGEXP", "RLIKE", "STRAIGHT_JOIN", "DIV",
};

static SQLITE_KEYWORDS: Set<&'static str> = phf_set! {
    "AUTOINCREMENT", "GLOB", "PRAGMA", "RETURNING", "ROWID", "VACUUM", "ABORT",
};

static NO_KEYWORDS: Set<&'static str> = phf_set! {};

/// Longest reserved word we ever need to recognize.
const MAX_KEYWORD_LEN: usize = 24;

/// A SQL dialect contributes reserved words on top of the shared ANSI set.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dialect-specific reserved words, uppercase.
    fn extra_keywords(&self) -> &'static Set<&'static str> {
        &NO_KEYWORDS
    }

    /// Case-insensitive reserved word check.
    fn is_keyword(&self, word: &str) -> bool {
        let Some(upper) = ascii_upper(word) else {
            return false;
        };
        let upper = upper.as_str();
        ANSI_KEYWORDS.contains(upper) || self.extra_keywords().contains(upper)
    }
}

/// Uppercase a short ASCII word without allocating on the heap.
fn ascii_upper(word: &str) -> Option<CompactString> {
    if word.is_empty() || word.len() > MAX_KEYWORD_LEN || !word.is_ascii() {
        return None;
    }
    let mut upper = CompactString::from(word);
    upper.as_mut_str().make_ascii_uppercase();
    Some(upper)
}

/// The default dialect: the shared reserved words only.
pub struct Ansi;

impl Dialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }
}

pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn extra_keywords(&self) -> &'static Set<&'static str> {
        &POSTGRES_KEYWORDS
    }
}

pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn extra_keywords(&self) -> &'static Set<&'static str> {
        &MYSQL_KEYWORDS
    }
}

pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn extra_keywords(&self) -> &'static Set<&'static str> {
        &SQLITE_KEYWORDS
    }
}

/// Create a dialect from a string name.
pub fn dialect_from_name(name: &str) -> Result<Box<dyn Dialect>, SqlembedError> {
    match name.to_ascii_lowercase().as_str() {
        "ansi" | "polyglot" => Ok(Box::new(Ansi)),
        "postgres" | "postgresql" => Ok(Box::new(Postgres)),
        "mysql" | "mariadb" => Ok(Box::new(MySql)),
        "sqlite" => Ok(Box::new(Sqlite)),
        _ => Err(SqlembedError::Config(format!("Unknown dialect: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_are_case_insensitive() {
        let dialect = Ansi;
        assert!(dialect.is_keyword("select"));
        assert!(dialect.is_keyword("SeLeCt"));
        assert!(dialect.is_keyword("FROM"));
        assert!(!dialect.is_keyword("users"));
        assert!(!dialect.is_keyword(""));
    }

    #[test]
    fn test_dialect_extras() {
        assert!(!Ansi.is_keyword("ilike"));
        assert!(Postgres.is_keyword("ilike"));
        assert!(Postgres.is_keyword("returning"));
        assert!(MySql.is_keyword("regexp"));
        assert!(Sqlite.is_keyword("pragma"));
        assert!(!MySql.is_keyword("pragma"));
    }

    #[test]
    fn test_non_ascii_is_never_keyword() {
        assert!(!Ansi.is_keyword("séléct"));
    }

    #[test]
    fn test_dialect_from_name() {
        assert_eq!(dialect_from_name("ansi").unwrap().name(), "ansi");
        assert_eq!(dialect_from_name("PostgreSQL").unwrap().name(), "postgres");
        assert_eq!(dialect_from_name("mysql").unwrap().name(), "mysql");
        assert_eq!(dialect_from_name("sqlite").unwrap().name(), "sqlite");
        assert!(dialect_from_name("oracle").is_err());
    }
}
