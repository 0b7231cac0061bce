use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::error::SqlembedError;
use crate::extract::{extract, Language};
use crate::formatter::format_tokens;
use crate::lexer::Lexer;
use crate::mode::{Mode, MultiStatement};
use crate::occurrence::{FormattedResult, StringOccurrence};
use crate::report::{FileResult, FileStatus, Report};
use crate::rewriter::rewrite;
use crate::token::{Token, TokenKind};

/// Format bare SQL text according to the given mode.
pub fn format_string(sql: &str, mode: &Mode) -> Result<String, SqlembedError> {
    let lexer = Lexer::from_mode(mode)?;
    Ok(format_sql(sql, &lexer, mode))
}

/// Tokenize and pretty-print SQL text, honouring the multi-statement policy.
pub fn format_sql(sql: &str, lexer: &Lexer, mode: &Mode) -> String {
    let tokens = lexer.tokenize(sql);
    if mode.multi_statement == MultiStatement::First {
        if let Some(split) = first_statement_end(&tokens) {
            let head = format_tokens(&tokens[..split], mode);
            let rest = tokens[split - 1].offset + 1;
            return format!("{}{}", head.trim_end_matches('\n'), &sql[rest..]);
        }
    }
    format_tokens(&tokens, mode)
}

/// Token index just past the first top-level `;` that has more SQL after it.
fn first_statement_end(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0isize;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punctuation {
            continue;
        }
        match token.text.as_str() {
            "(" | "[" => depth += 1,
            ")" | "]" => depth = (depth - 1).max(0),
            ";" if depth == 0 => {
                let more = tokens[i + 1..].iter().any(|t| t.kind.is_significant());
                return more.then_some(i + 1);
            }
            _ => {}
        }
    }
    None
}

/// Classify one occurrence and, when it holds SQL, format it.
pub fn format_occurrence(
    occurrence: &StringOccurrence,
    lexer: &Lexer,
    mode: &Mode,
) -> FormattedResult {
    let verdict = classify(occurrence, lexer, mode);
    debug!(
        identifier = ?occurrence.identifier,
        span = ?occurrence.span,
        reason = ?verdict.reason,
        "classified literal"
    );
    if !verdict.is_sql() {
        return FormattedResult::unchanged(occurrence);
    }

    let mut replacement = format_sql(&occurrence.text, lexer, mode);
    if occurrence.style.is_block() && occurrence.text.starts_with('\n') && replacement.contains('\n') {
        replacement.insert(0, '\n');
    }
    FormattedResult {
        changed: replacement != occurrence.text,
        occurrence: occurrence.clone(),
        replacement,
    }
}

/// Everything that happened to one source text.
#[derive(Debug)]
pub struct SourceOutcome {
    pub formatted: String,
    pub results: Vec<FormattedResult>,
    pub failures: Vec<SqlembedError>,
}

/// Extract, classify, format and rewrite every literal in `source`.
pub fn format_source(
    source: &str,
    language: Language,
    mode: &Mode,
) -> Result<SourceOutcome, SqlembedError> {
    let lexer = Lexer::from_mode(mode)?;
    Ok(format_source_with(source, language, &lexer, mode))
}

pub fn format_source_with(
    source: &str,
    language: Language,
    lexer: &Lexer,
    mode: &Mode,
) -> SourceOutcome {
    let results: Vec<FormattedResult> = extract(source, language)
        .iter()
        .map(|occurrence| format_occurrence(occurrence, lexer, mode))
        .collect();
    let outcome = rewrite(source, &results);
    SourceOutcome {
        formatted: outcome.text,
        results,
        failures: outcome.failures,
    }
}

/// Run the formatter on a collection of files.
pub fn run(files: &[PathBuf], mode: &Mode) -> Result<Report, SqlembedError> {
    let lexer = Lexer::from_mode(mode)?;
    let matching_paths = get_matching_paths(files, mode)?;
    let progress = progress_bar(mode, matching_paths.len());

    let process = |path: &PathBuf| {
        let result = format_file(path, &lexer, mode);
        progress.inc(1);
        result
    };

    let results: Vec<FileResult> = if mode.single_process || matching_paths.len() <= 1 {
        matching_paths.iter().map(&process).collect()
    } else {
        // 0 threads lets rayon use every core
        match rayon::ThreadPoolBuilder::new().num_threads(mode.threads).build() {
            Ok(pool) => pool.install(|| matching_paths.par_iter().map(&process).collect()),
            Err(e) => {
                warn!("could not start thread pool, running sequentially: {}", e);
                matching_paths.iter().map(&process).collect()
            }
        }
    };
    progress.finish_and_clear();

    let mut report = Report::new();
    for result in results {
        report.add(result);
    }
    Ok(report)
}

fn progress_bar(mode: &Mode, file_count: usize) -> ProgressBar {
    if !mode.show_progress(file_count) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(file_count as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} files") {
        bar.set_style(style);
    }
    bar
}

/// Format a single file.
fn format_file(path: &Path, lexer: &Lexer, mode: &Mode) -> FileResult {
    let Some(language) = Language::from_path(path) else {
        return FileResult::error(path.to_path_buf(), "Unsupported file type".to_string());
    };
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => return FileResult::error(path.to_path_buf(), format!("Read error: {}", e)),
    };

    let outcome = format_source_with(&source, language, lexer, mode);
    let failures: Vec<String> = outcome.failures.iter().map(ToString::to_string).collect();

    let status = if outcome.formatted == source {
        FileStatus::Unchanged
    } else if mode.check || mode.diff {
        if mode.diff {
            print_diff(path, &source, &outcome.formatted, mode);
        }
        FileStatus::Changed
    } else {
        if let Err(e) = std::fs::write(path, &outcome.formatted) {
            return FileResult {
                failures,
                ..FileResult::error(path.to_path_buf(), format!("Write error: {}", e))
            };
        }
        info!(path = %path.display(), "rewrote embedded SQL");
        FileStatus::Changed
    };

    FileResult {
        failures,
        ..FileResult::new(path.to_path_buf(), status)
    }
}

/// Get all host source files that match the given inputs. Directories are
/// walked recursively, skipping hidden entries; inputs that do not exist
/// are expanded as glob patterns.
pub fn get_matching_paths(paths: &[PathBuf], mode: &Mode) -> Result<Vec<PathBuf>, SqlembedError> {
    let exclude = build_exclude_set(&mode.exclude)?;
    let mut result = BTreeSet::new();

    for path in paths {
        if path.exists() {
            collect_path(path, &exclude, &mut result);
            continue;
        }
        let Some(pattern) = path.to_str() else {
            continue;
        };
        match glob::glob(pattern) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    collect_path(&entry, &exclude, &mut result);
                }
            }
            Err(e) => warn!("invalid path pattern {}: {}", pattern, e),
        }
    }

    Ok(result.into_iter().collect())
}

fn build_exclude_set(patterns: &[String]) -> Result<GlobSet, SqlembedError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            SqlembedError::Config(format!("Invalid exclude pattern {}: {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| SqlembedError::Config(format!("Invalid exclude patterns: {}", e)))
}

fn is_excluded(path: &Path, exclude: &GlobSet) -> bool {
    exclude.is_match(path) || path.file_name().is_some_and(|name| exclude.is_match(name))
}

fn collect_path(path: &Path, exclude: &GlobSet, result: &mut BTreeSet<PathBuf>) {
    if is_excluded(path, exclude) {
        return;
    }
    if path.is_dir() {
        collect_source_files(path, exclude, result);
    } else if Language::from_path(path).is_some() {
        result.insert(path.to_path_buf());
    }
}

/// Recursively collect host source files from a directory.
fn collect_source_files(dir: &Path, exclude: &GlobSet, result: &mut BTreeSet<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("cannot read directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if !hidden {
            collect_path(&path, exclude, result);
        }
    }
}

/// Print a coloured diff between original and formatted content.
fn print_diff(path: &Path, original: &str, formatted: &str, mode: &Mode) {
    let choice = if mode.force_color {
        ColorChoice::Always
    } else if mode.color() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let stream = StandardStream::stderr(choice);
    let mut out = stream.lock();
    if let Err(e) = write_diff(&mut out, path, original, formatted) {
        warn!("failed to print diff for {}: {}", path.display(), e);
    }
}

fn write_diff(
    out: &mut impl WriteColor,
    path: &Path,
    original: &str,
    formatted: &str,
) -> io::Result<()> {
    use similar::{ChangeTag, TextDiff};

    writeln!(out, "--- {}", path.display())?;
    writeln!(out, "+++ {}", path.display())?;

    let diff = TextDiff::from_lines(original, formatted);
    for change in diff.iter_all_changes() {
        let (sign, color) = match change.tag() {
            ChangeTag::Delete => ("-", Some(Color::Red)),
            ChangeTag::Insert => ("+", Some(Color::Green)),
            ChangeTag::Equal => (" ", None),
        };
        out.set_color(ColorSpec::new().set_fg(color))?;
        write!(out, "{}{}", sign, change)?;
        if change.missing_newline() {
            writeln!(out)?;
        }
    }
    out.reset()
}
