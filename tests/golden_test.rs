use sqlembed::{format_source, Language, Mode};
use std::fs;
use std::path::Path;

const SENTINEL: &str = ")))))__SQLEMBED_OUTPUT__(((((";

/// Read a golden test data file and return (source, expected) tuple.
///
/// - If the file contains the sentinel, lines above = source, lines below = expected
/// - If no sentinel, the file is preformatted: expected = source
/// - Source is trimmed + "\n"; expected preserves exact whitespace
fn read_test_data(path: &str) -> (String, String) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read test file {}: {}", path, e));

    let mut source_lines: Vec<&str> = Vec::new();
    let mut formatted_lines: Vec<&str> = Vec::new();
    let mut found_sentinel = false;

    for line in content.lines() {
        if line.trim() == SENTINEL {
            found_sentinel = true;
            continue;
        }
        if found_sentinel {
            formatted_lines.push(line);
        } else {
            source_lines.push(line);
        }
    }

    let source = format!("{}\n", source_lines.join("\n").trim());
    let expected = if found_sentinel {
        let mut result = formatted_lines.join("\n");
        if content.ends_with('\n') {
            result.push('\n');
        }
        result
    } else {
        source.clone()
    };

    (source, expected)
}

fn run_golden_test(path: &str, mode: &Mode) {
    let language = Language::from_path(Path::new(path))
        .unwrap_or_else(|| panic!("No host language for {}", path));
    let (source, expected) = read_test_data(path);

    let actual = format_source(&source, language, mode)
        .unwrap_or_else(|e| panic!("format_source failed for {}: {}", path, e));
    assert!(
        actual.failures.is_empty(),
        "Unexpected rewrite failures for {}: {:?}",
        path,
        actual.failures
    );
    assert_eq!(
        expected, actual.formatted,
        "\n\nFormatting mismatch for {}\n\n--- expected ---\n{}\n--- actual ---\n{}\n",
        path, expected, actual.formatted
    );

    // Idempotency check
    let second = format_source(&actual.formatted, language, mode)
        .unwrap_or_else(|e| panic!("Idempotency format failed for {}: {}", path, e));
    assert_eq!(
        expected, second.formatted,
        "\n\nIdempotency failed for {}\n\n--- expected ---\n{}\n--- second pass ---\n{}\n",
        path, expected, second.formatted
    );
}

macro_rules! golden_tests {
    (mode: $mode_fn:expr, $($name:ident => $path:expr),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                run_golden_test($path, &$mode_fn);
            }
        )*
    };
}

// =============================================================================
// Preformatted golden tests
// These files have no sentinel and must pass through unchanged.
// =============================================================================

golden_tests! {
    mode: Mode::default(),
    golden_preformatted_001_no_sql => "tests/data/preformatted/001_no_sql.py",
    golden_preformatted_002_formatted_sql => "tests/data/preformatted/002_formatted_sql.py",
    golden_preformatted_003_formatted_sql => "tests/data/preformatted/003_formatted_sql.js",
}

// =============================================================================
// Unformatted golden tests
// =============================================================================

golden_tests! {
    mode: Mode::default(),
    golden_unformatted_101_name_signal => "tests/data/unformatted/101_name_signal.py",
    golden_unformatted_102_block_literal => "tests/data/unformatted/102_block_literal.py",
    golden_unformatted_103_subquery => "tests/data/unformatted/103_subquery.py",
    golden_unformatted_104_template => "tests/data/unformatted/104_template.js",
}
