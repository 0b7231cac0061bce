use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

use crate::error::SqlembedError;

/// How SQL keywords are cased in formatted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCase {
    #[default]
    Upper,
    Lower,
    Preserve,
}

/// Where the separating comma goes when a list is split one item per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CommaPosition {
    /// `a,` / `b`
    #[default]
    End,
    /// `a` / `, b`
    Start,
}

/// What to do with literals holding several `;`-separated statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MultiStatement {
    /// Format every statement.
    #[default]
    All,
    /// Format the first statement and keep the rest verbatim.
    First,
}

macro_rules! impl_from_str {
    ($ty:ty, $what:literal) => {
        impl FromStr for $ty {
            type Err = SqlembedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as ValueEnum>::from_str(s, true).map_err(|_| {
                    SqlembedError::Config(format!("Invalid {}: {}", $what, s))
                })
            }
        }
    };
}

impl_from_str!(KeywordCase, "keyword_case");
impl_from_str!(CommaPosition, "comma_position");
impl_from_str!(MultiStatement, "multi_statement");

/// Mode holds all classification, formatting and driver configuration.
#[derive(Debug, Clone)]
pub struct Mode {
    /// Width budget for a single-line rendering and for clause lines.
    pub line_length: usize,

    /// Spaces per indentation level.
    pub indent_width: usize,

    pub dialect_name: String,

    pub keyword_case: KeywordCase,

    pub comma_position: CommaPosition,

    /// Never split a GROUP BY list over several lines.
    pub group_by_single_line: bool,

    /// Line up the `AS` of aliased items when a SELECT list is split.
    pub align_aliases: bool,

    pub multi_statement: MultiStatement,

    /// A SELECT list with more items than this goes one item per line.
    pub max_inline_columns: usize,

    /// A WHERE/HAVING condition chain wider than this goes one condition per line.
    pub condition_width: usize,

    /// Identifier words that mark a literal as SQL.
    pub name_keywords: Vec<String>,

    /// Keywords a SQL literal may start with.
    pub statement_keywords: Vec<String>,

    /// Keywords a SQL literal must also contain.
    pub structural_keywords: Vec<String>,

    /// Additional reserved words for the lexer.
    pub extra_keywords: Vec<String>,

    pub check: bool,

    pub diff: bool,

    /// Glob patterns to exclude.
    pub exclude: Vec<String>,

    pub verbose: bool,

    pub quiet: bool,

    pub no_progressbar: bool,

    pub no_color: bool,

    pub force_color: bool,

    /// Number of threads for parallel processing (0 = all cores).
    pub threads: usize,

    pub single_process: bool,
}

fn default_line_length() -> usize {
    80
}
fn default_indent_width() -> usize {
    2
}
fn default_dialect() -> String {
    "ansi".to_string()
}
fn default_max_inline_columns() -> usize {
    3
}
fn default_condition_width() -> usize {
    40
}
fn default_name_keywords() -> Vec<String> {
    vec!["sql".to_string()]
}
fn default_statement_keywords() -> Vec<String> {
    ["SELECT", "INSERT", "UPDATE", "DELETE", "WITH", "CREATE", "ALTER", "DROP"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_structural_keywords() -> Vec<String> {
    ["FROM", "WHERE", "JOIN", "VALUES", "SET"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Mode {
    /// Whether color output is enabled.
    pub fn color(&self) -> bool {
        if self.force_color {
            return true;
        }
        if self.no_color {
            return false;
        }
        if std::env::var("NO_COLOR").is_ok() {
            return false;
        }
        true
    }

    /// Whether a progress bar should be drawn for `file_count` files.
    pub fn show_progress(&self, file_count: usize) -> bool {
        !self.no_progressbar && !self.quiet && !self.verbose && file_count > 1
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            line_length: default_line_length(),
            indent_width: default_indent_width(),
            dialect_name: default_dialect(),
            keyword_case: KeywordCase::default(),
            comma_position: CommaPosition::default(),
            group_by_single_line: false,
            align_aliases: false,
            multi_statement: MultiStatement::default(),
            max_inline_columns: default_max_inline_columns(),
            condition_width: default_condition_width(),
            name_keywords: default_name_keywords(),
            statement_keywords: default_statement_keywords(),
            structural_keywords: default_structural_keywords(),
            extra_keywords: Vec::new(),
            check: false,
            diff: false,
            exclude: Vec::new(),
            verbose: false,
            quiet: false,
            no_progressbar: false,
            no_color: false,
            force_color: false,
            threads: 0,
            single_process: false,
        }
    }
}
