use tracing::{debug, warn};

use crate::error::SqlembedError;
use crate::occurrence::{FormattedResult, QuoteStyle, StringOccurrence};

/// Source text after rewriting, plus the occurrences that could not be
/// written back.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub text: String,
    pub failures: Vec<SqlembedError>,
}

/// Check that `replacement` can sit between the occurrence's delimiters
/// without changing how the host language reads the literal.
pub fn check_quoting(occurrence: &StringOccurrence, replacement: &str) -> Result<(), SqlembedError> {
    let style = occurrence.style;
    let reason = match style {
        QuoteStyle::Single | QuoteStyle::Double if replacement.contains('\n') => {
            Some("formatted SQL spans several lines".to_string())
        }
        QuoteStyle::Single | QuoteStyle::Double if replacement.ends_with('\\') => {
            Some("formatted SQL ends with a backslash".to_string())
        }
        QuoteStyle::TripleSingle | QuoteStyle::TripleDouble => {
            let delimiter = style.delimiter();
            if replacement.contains(delimiter) {
                Some(format!("formatted SQL contains {}", delimiter))
            } else if replacement.ends_with(&delimiter[..1]) {
                Some(format!("formatted SQL ends with {}", &delimiter[..1]))
            } else if replacement.ends_with('\\') {
                Some("formatted SQL ends with a backslash".to_string())
            } else {
                None
            }
        }
        QuoteStyle::Backtick if replacement.ends_with('\\') => {
            Some("formatted SQL ends with a backslash".to_string())
        }
        _ => None,
    };

    match reason {
        Some(reason) => Err(SqlembedError::QuotingIncompatible {
            start: occurrence.span.start,
            end: occurrence.span.end,
            style,
            reason,
        }),
        None => Ok(()),
    }
}

/// Splice every changed, quoting-compatible replacement into `source`.
/// Incompatible occurrences are left as they were and reported.
pub fn rewrite(source: &str, results: &[FormattedResult]) -> RewriteOutcome {
    let mut failures = Vec::new();
    let mut accepted: Vec<&FormattedResult> = Vec::new();

    for result in results.iter().filter(|r| r.changed) {
        match check_quoting(&result.occurrence, &result.replacement) {
            Ok(()) => accepted.push(result),
            Err(err) => {
                debug!("{}", err);
                failures.push(err);
            }
        }
    }
    accepted.sort_by_key(|r| r.occurrence.span.start);

    let mut text = String::with_capacity(source.len());
    let mut cursor = 0;
    for result in accepted {
        let span = result.occurrence.span.clone();
        if span.start < cursor || source.get(span.clone()) != Some(result.occurrence.text.as_str()) {
            warn!(?span, "literal no longer matches the source; skipped");
            continue;
        }
        text.push_str(&source[cursor..span.start]);
        text.push_str(&result.replacement);
        cursor = span.end;
    }
    text.push_str(&source[cursor..]);

    RewriteOutcome { text, failures }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_at(source: &str, needle: &str, replacement: &str, style: QuoteStyle) -> FormattedResult {
        let start = source.find(needle).unwrap();
        FormattedResult {
            occurrence: StringOccurrence::new(needle, None, start..start + needle.len(), style),
            replacement: replacement.to_string(),
            changed: needle != replacement,
        }
    }

    #[test]
    fn test_rewrite_replaces_only_content() {
        let source = "a = 'select  1'\nb = 'keep'\n";
        let results = vec![result_at(source, "select  1", "SELECT 1", QuoteStyle::Single)];
        let outcome = rewrite(source, &results);
        assert_eq!(outcome.text, "a = 'SELECT 1'\nb = 'keep'\n");
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_multiline_into_single_line_literal_fails() {
        let source = "q = \"select a from t\"";
        let results = vec![result_at(source, "select a from t", "SELECT a\nFROM t\n", QuoteStyle::Double)];
        let outcome = rewrite(source, &results);
        assert_eq!(outcome.text, source);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0],
            SqlembedError::QuotingIncompatible { start: 5, end: 20, style: QuoteStyle::Double, .. }
        ));
    }

    #[test]
    fn test_failures_are_per_occurrence() {
        let source = "x = 'select a'; y = \"\"\"select b\"\"\"";
        let results = vec![
            result_at(source, "select a", "SELECT\n  a\n", QuoteStyle::Single),
            result_at(source, "select b", "SELECT b", QuoteStyle::TripleDouble),
        ];
        let outcome = rewrite(source, &results);
        assert_eq!(outcome.text, "x = 'select a'; y = \"\"\"SELECT b\"\"\"");
        assert_eq!(outcome.failures.len(), 1);
    }

    #[test]
    fn test_triple_quote_rules() {
        let occ = StringOccurrence::detached("x", None, QuoteStyle::TripleDouble);
        assert!(check_quoting(&occ, "SELECT\n  a\n").is_ok());
        assert!(check_quoting(&occ, "SELECT '\"\"\"'").is_err());
        assert!(check_quoting(&occ, "SELECT \"a\"").is_err());
        assert!(check_quoting(&occ, "SELECT '\\").is_err());

        let occ = StringOccurrence::detached("x", None, QuoteStyle::TripleSingle);
        assert!(check_quoting(&occ, "SELECT \"a\"").is_ok());
        assert!(check_quoting(&occ, "SELECT 'a'").is_err());
    }

    #[test]
    fn test_backtick_rules() {
        let occ = StringOccurrence::detached("x", None, QuoteStyle::Backtick);
        assert!(check_quoting(&occ, "SELECT\n  a\n").is_ok());
        assert!(check_quoting(&occ, "SELECT a\\").is_err());
    }

    #[test]
    fn test_single_line_trailing_backslash() {
        let occ = StringOccurrence::detached("x", None, QuoteStyle::Double);
        assert!(check_quoting(&occ, "SELECT a FROM t WHERE b = 1 \\").is_err());
        assert!(check_quoting(&occ, "SELECT 'a\\'b' FROM t").is_ok());

        let source = "q = 'select a from t \\ '";
        let results = vec![result_at(source, "select a from t \\ ", "SELECT a FROM t \\", QuoteStyle::Single)];
        let outcome = rewrite(source, &results);
        assert_eq!(outcome.text, source);
        assert_eq!(outcome.failures.len(), 1);
    }

    #[test]
    fn test_unchanged_results_are_ignored() {
        let source = "q = 'SELECT 1'";
        let results = vec![FormattedResult::unchanged(&StringOccurrence::new(
            "SELECT 1",
            None,
            5..13,
            QuoteStyle::Single,
        ))];
        let outcome = rewrite(source, &results);
        assert_eq!(outcome.text, source);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_stale_span_is_skipped() {
        let source = "q = 'SELECT 1'";
        let results = vec![FormattedResult {
            occurrence: StringOccurrence::new("select 2", None, 5..13, QuoteStyle::Single),
            replacement: "SELECT 2".to_string(),
            changed: true,
        }];
        assert_eq!(rewrite(source, &results).text, source);
    }
}
