use std::path::Path;

use memchr::memchr;

use crate::error::SqlembedError;
use crate::occurrence::{QuoteStyle, StringOccurrence};
use crate::string_utils::{find_line_quote_end, find_triple_quote_end, scan_braced};

/// Host languages whose string literals can be scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    /// Pick a language from a file extension. TypeScript shares the
    /// JavaScript scanner.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "py" | "pyi" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" => Some(Self::JavaScript),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SqlembedError> {
        match name.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "javascript" | "js" | "typescript" | "ts" => Ok(Self::JavaScript),
            _ => Err(SqlembedError::Config(format!("Unknown language: {}", name))),
        }
    }
}

/// Find every candidate string literal in `source`, in source order.
pub fn extract(source: &str, language: Language) -> Vec<StringOccurrence> {
    match language {
        Language::Python => PythonScanner::new(source).scan(),
        Language::JavaScript => JsScanner::new(source).scan(),
    }
}

/// A literal located in the source: its content range and the byte just
/// past the closing delimiter.
struct Located {
    content: (usize, usize),
    after: usize,
    style: QuoteStyle,
}

/// Locate a quoted literal whose opening quote is at `q`. `None` means the
/// literal is unterminated.
fn locate(bytes: &[u8], q: usize, allow_triple: bool) -> Option<Located> {
    let quote = bytes[q];
    if allow_triple && bytes[q..].starts_with(&[quote, quote, quote]) {
        let start = q + 3;
        let end = find_triple_quote_end(bytes, start, quote)?;
        let style = if quote == b'"' {
            QuoteStyle::TripleDouble
        } else {
            QuoteStyle::TripleSingle
        };
        return Some(Located {
            content: (start, end),
            after: end + 3,
            style,
        });
    }
    let end = find_line_quote_end(bytes, q + 1, quote)?;
    let style = if quote == b'"' {
        QuoteStyle::Double
    } else {
        QuoteStyle::Single
    };
    Some(Located {
        content: (q + 1, end),
        after: end + 1,
        style,
    })
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

struct PythonScanner<'s> {
    source: &'s str,
    bytes: &'s [u8],
    depth: usize,
    found: Vec<StringOccurrence>,
}

impl<'s> PythonScanner<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            depth: 0,
            found: Vec::new(),
        }
    }

    fn scan(mut self) -> Vec<StringOccurrence> {
        let mut i = 0;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'#' => {
                    i = memchr(b'\n', &self.bytes[i..]).map_or(self.bytes.len(), |o| i + o);
                }
                b'\'' | b'"' => match self.string_at(i, i) {
                    Some(after) => i = after,
                    None => i += 1,
                },
                b'(' | b'[' | b'{' => {
                    self.depth += 1;
                    i += 1;
                }
                b')' | b']' | b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    i += 1;
                }
                b if is_word_byte(b) => {
                    let mut end = i;
                    while end < self.bytes.len() && is_word_byte(self.bytes[end]) {
                        end += 1;
                    }
                    let word = &self.source[i..end];
                    let quoted = matches!(self.bytes.get(end), Some(b'\'' | b'"'));
                    if quoted && is_string_prefix(word) {
                        match self.string_at(i, end) {
                            Some(after) => i = after,
                            None => i = end + 1,
                        }
                    } else {
                        i = end;
                    }
                }
                _ => i += 1,
            }
        }
        self.found
    }

    /// Record the literal whose prefix starts at `prefix_start` and whose
    /// quote is at `q`. Returns the offset after the literal.
    fn string_at(&mut self, prefix_start: usize, q: usize) -> Option<usize> {
        let located = locate(self.bytes, q, true)?;
        let prefix = &self.source[prefix_start..q];
        let is_bytes = prefix.contains(['b', 'B']);
        if !is_bytes && !self.is_statement_string(prefix_start) {
            let (start, end) = located.content;
            self.found.push(StringOccurrence::new(
                &self.source[start..end],
                enclosing_identifier(&self.source[..prefix_start], Language::Python),
                start..end,
                located.style,
            ));
        }
        Some(located.after)
    }

    /// A bare string standing as its own statement (a docstring).
    fn is_statement_string(&self, start: usize) -> bool {
        if self.depth > 0 {
            return false;
        }
        let line_start = self.source[..start].rfind('\n').map_or(0, |p| p + 1);
        if !self.source[line_start..start].trim().is_empty() {
            return false;
        }
        let previous = self.source[..line_start].trim_end_matches(['\n', '\r']);
        !previous.ends_with('\\')
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "f" | "b" | "br" | "rb" | "fr" | "rf"
    )
}

struct JsScanner<'s> {
    source: &'s str,
    bytes: &'s [u8],
    found: Vec<StringOccurrence>,
}

impl<'s> JsScanner<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            found: Vec::new(),
        }
    }

    fn scan(mut self) -> Vec<StringOccurrence> {
        let mut i = 0;
        while i < self.bytes.len() {
            match (self.bytes[i], self.bytes.get(i + 1)) {
                (b'/', Some(b'/')) => {
                    i = memchr(b'\n', &self.bytes[i..]).map_or(self.bytes.len(), |o| i + o);
                }
                (b'/', Some(b'*')) => {
                    i = self.source[i + 2..]
                        .find("*/")
                        .map_or(self.bytes.len(), |o| i + 2 + o + 2);
                }
                (b'\'' | b'"', _) => match locate(self.bytes, i, false) {
                    Some(located) => {
                        let identifier = enclosing_identifier(&self.source[..i], Language::JavaScript);
                        self.push(&located, identifier);
                        i = located.after;
                    }
                    None => i += 1,
                },
                (b'`', _) => match find_template_end(self.bytes, i + 1) {
                    Some(end) => {
                        let located = Located {
                            content: (i + 1, end),
                            after: end + 1,
                            style: QuoteStyle::Backtick,
                        };
                        let identifier = template_tag(&self.source[..i]).or_else(|| {
                            enclosing_identifier(&self.source[..i], Language::JavaScript)
                        });
                        self.push(&located, identifier);
                        i = located.after;
                    }
                    None => break,
                },
                _ => i += 1,
            }
        }
        self.found
    }

    fn push(&mut self, located: &Located, identifier: Option<String>) {
        let (start, end) = located.content;
        self.found.push(StringOccurrence::new(
            &self.source[start..end],
            identifier,
            start..end,
            located.style,
        ));
    }
}

/// Index of the closing backtick of a template literal, skipping escapes
/// and `${...}` substitutions.
fn find_template_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i),
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = scan_braced(bytes, i + 1),
            _ => i += 1,
        }
    }
    None
}

/// The tag of a tagged template (`sql` in ``sql`...` ``, `db.sql` too).
fn template_tag(before: &str) -> Option<String> {
    let tag = trailing_identifier(before);
    (!tag.is_empty() && !tag.ends_with('.')).then(|| tag.to_string())
}

/// The longest suffix of `text` that reads as a (dotted) identifier.
fn trailing_identifier(text: &str) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|&(_, c)| c.is_alphanumeric() || c == '_' || c == '$' || c == '.')
        .last()
        .map_or(text.len(), |(pos, _)| pos);
    &text[start..]
}

/// Name the literal is assigned to, passed as, or stored under, looking back
/// from its opening delimiter.
///
/// Handles `name = "..."`, `name = ("..."`, `f(name="...")`, walrus
/// `(name := "...")`, annotated `name: str = "..."`, augmented `+=`, and in
/// JavaScript object properties `{ name: "..." }`.
pub fn enclosing_identifier(before: &str, language: Language) -> Option<String> {
    let mut rest = before.trim_end();
    while let Some(stripped) = rest.strip_suffix('(') {
        rest = stripped.trim_end();
    }

    let target = if let Some(lhs) = rest.strip_suffix('=') {
        if lhs.ends_with(['=', '!', '<', '>']) {
            return None;
        }
        let lhs = lhs.strip_suffix([':', '+']).unwrap_or(lhs);
        let segment = statement_segment(lhs.trim_end());
        // `name: Type` keeps only the name
        match segment.find(':') {
            Some(colon) => segment[..colon].trim_end(),
            None => segment,
        }
    } else if language == Language::JavaScript {
        let lhs = rest.strip_suffix(':')?;
        let segment = statement_segment(lhs.trim_end());
        // `a ? b : "x"` and `name?: "x"` are not properties
        if lhs.ends_with([':', '?']) || segment.contains('?') {
            return None;
        }
        segment
    } else {
        return None;
    };

    let name = trailing_identifier(target);
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| !c.is_ascii_digit() && c != '.');
    valid.then(|| name.to_string())
}

/// The tail of `text` after the last statement or argument boundary.
fn statement_segment(text: &str) -> &str {
    let start = text
        .rfind(['\n', ';', ',', '(', '{', '['])
        .map_or(0, |p| p + 1);
    text[start..].trim_start()
}
