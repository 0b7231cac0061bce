use std::fmt;
use std::ops::Range;

/// How a literal is delimited in the host source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteStyle {
    /// `'...'`
    Single,
    /// `"..."`
    Double,
    /// `'''...'''`
    TripleSingle,
    /// `"""..."""`
    TripleDouble,
    /// JavaScript template literal.
    Backtick,
}

impl QuoteStyle {
    /// Block styles may hold raw line breaks.
    pub fn is_block(self) -> bool {
        matches!(self, Self::TripleSingle | Self::TripleDouble | Self::Backtick)
    }

    pub fn delimiter(self) -> &'static str {
        match self {
            Self::Single => "'",
            Self::Double => "\"",
            Self::TripleSingle => "'''",
            Self::TripleDouble => "\"\"\"",
            Self::Backtick => "`",
        }
    }
}

impl fmt::Display for QuoteStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single-quoted",
            Self::Double => "double-quoted",
            Self::TripleSingle => "triple single-quoted",
            Self::TripleDouble => "triple double-quoted",
            Self::Backtick => "template",
        };
        f.write_str(name)
    }
}

/// One string literal found in host source, with its naming context.
///
/// `text` is the literal content exactly as written between the delimiters;
/// escape sequences are not decoded. `span` covers the same bytes of the
/// host source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringOccurrence {
    pub text: String,
    pub identifier: Option<String>,
    pub span: Range<usize>,
    pub style: QuoteStyle,
}

impl StringOccurrence {
    pub fn new(
        text: impl Into<String>,
        identifier: Option<String>,
        span: Range<usize>,
        style: QuoteStyle,
    ) -> Self {
        Self {
            text: text.into(),
            identifier,
            span,
            style,
        }
    }

    /// An occurrence detached from any source file, spanning its own text.
    /// Handy for formatting a bare SQL string.
    pub fn detached(text: &str, identifier: Option<&str>, style: QuoteStyle) -> Self {
        Self::new(
            text,
            identifier.map(String::from),
            0..text.len(),
            style,
        )
    }
}

/// The pipeline's answer for one occurrence. `replacement` equals the
/// original text when `changed` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResult {
    pub occurrence: StringOccurrence,
    pub replacement: String,
    pub changed: bool,
}

impl FormattedResult {
    pub fn unchanged(occurrence: &StringOccurrence) -> Self {
        Self {
            replacement: occurrence.text.clone(),
            occurrence: occurrence.clone(),
            changed: false,
        }
    }
}
