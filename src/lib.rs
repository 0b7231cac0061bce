pub mod api;
pub mod classifier;
pub mod clause;
pub mod config;
pub mod dialect;
pub mod error;
pub mod extract;
pub mod formatter;
pub mod lexer;
pub mod line;
pub mod mode;
pub mod occurrence;
pub mod report;
pub mod rewriter;
mod string_utils;
pub mod token;

// Re-export the main public API
pub use api::{format_source, format_string, get_matching_paths, run, SourceOutcome};
pub use config::load_config;
pub use error::SqlembedError;
pub use extract::Language;
pub use mode::Mode;
