use thiserror::Error;

use crate::occurrence::QuoteStyle;

/// User-facing errors.
#[derive(Error, Debug)]
pub enum SqlembedError {
    #[error("sqlembed config error: {0}")]
    Config(String),

    /// The formatted SQL cannot be written back inside the literal's quotes.
    /// Raised per occurrence; the literal is left untouched.
    #[error("cannot rewrite {style} literal at bytes {start}..{end}: {reason}")]
    QuotingIncompatible {
        start: usize,
        end: usize,
        style: QuoteStyle,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SqlembedError>;
