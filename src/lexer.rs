use std::collections::HashSet;

use compact_str::CompactString;
use memchr::{memchr, memchr2};

use crate::dialect::{self, Ansi, Dialect};
use crate::error::SqlembedError;
use crate::mode::Mode;
use crate::string_utils::{scan_braced, scan_quoted};
use crate::token::{Token, TokenKind};

/// Operators recognized as a single token, longest first.
const MULTI_CHAR_OPERATORS: &[&str] = &[
    "<=>", "->>", "#>>", "!~*", "<>", "!=", "<=", ">=", "||", "::", "->", "#>", "@>", "<@",
    "&&", "==", "~*", "!~",
];

/// Splits embedded SQL into tokens. Never fails: anything it does not
/// recognize becomes a one-character punctuation token.
pub struct Lexer {
    dialect: Box<dyn Dialect>,
    extra_keywords: HashSet<CompactString>,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new(Box::new(Ansi))
    }
}

impl Lexer {
    pub fn new(dialect: Box<dyn Dialect>) -> Self {
        Self {
            dialect,
            extra_keywords: HashSet::new(),
        }
    }

    /// Build the lexer configured by a mode: its dialect plus any
    /// configured extra reserved words.
    pub fn from_mode(mode: &Mode) -> Result<Self, SqlembedError> {
        let dialect = dialect::dialect_from_name(&mode.dialect_name)?;
        Ok(Self::new(dialect).with_extra_keywords(&mode.extra_keywords))
    }

    pub fn with_extra_keywords<S: AsRef<str>>(mut self, words: &[S]) -> Self {
        self.extra_keywords.extend(
            words
                .iter()
                .map(|w| CompactString::from(w.as_ref().to_ascii_uppercase())),
        );
        self
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        if self.dialect.is_keyword(word) {
            return true;
        }
        !self.extra_keywords.is_empty()
            && self
                .extra_keywords
                .contains(word.to_ascii_uppercase().as_str())
    }

    /// Tokenize `text`. Every run of whitespace becomes one `Whitespace`
    /// token with text `" "`; everything else keeps its exact source text.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let rest = &text[pos..];
            let (kind, mut len) = lex_one(rest);
            if len == 0 || !rest.is_char_boundary(len) {
                len = first_char_len(rest);
            }
            let raw = &rest[..len];
            let token = match kind {
                TokenKind::Whitespace => Token::new(TokenKind::Whitespace, " ", pos),
                TokenKind::Identifier if !raw.contains('.') && self.is_keyword(raw) => {
                    Token::new(TokenKind::Keyword, raw, pos)
                }
                _ => Token::new(kind, raw, pos),
            };
            tokens.push(token);
            pos += len;
        }
        tokens
    }
}

/// Tokenize with the default dialect.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::default().tokenize(text)
}

/// Lex a single token at the start of `rest`, returning its kind and byte
/// length. Identifiers are not yet split into keywords.
fn lex_one(rest: &str) -> (TokenKind, usize) {
    let bytes = rest.as_bytes();
    let next = bytes.get(1).copied();

    match bytes[0] {
        b if b.is_ascii_whitespace() => (TokenKind::Whitespace, scan_whitespace(bytes)),
        b'\\' => match next {
            Some(b'n' | b't' | b'r') => (TokenKind::Whitespace, scan_whitespace(bytes)),
            Some(q @ (b'\'' | b'"')) => (TokenKind::Literal, scan_escaped_quote(bytes, q)),
            // a backslash before whitespace stands alone; the whitespace stays whitespace
            Some(_) if rest[1..].starts_with(char::is_whitespace) => (TokenKind::Punctuation, 1),
            Some(_) => (TokenKind::Punctuation, 1 + first_char_len(&rest[1..])),
            None => (TokenKind::Punctuation, 1),
        },
        b'\'' | b'"' | b'`' => (TokenKind::Literal, scan_quoted(bytes, true)),
        b'-' if next == Some(b'-') => (TokenKind::Comment, scan_line_comment(bytes)),
        b'/' if next == Some(b'*') => (TokenKind::Comment, scan_block_comment(bytes)),
        b'0'..=b'9' => (TokenKind::Literal, scan_number(bytes)),
        b'.' if next.is_some_and(|n| n.is_ascii_digit()) => {
            (TokenKind::Literal, scan_number(bytes))
        }
        b'$' => match next {
            Some(n) if n.is_ascii_digit() => (TokenKind::Literal, 1 + scan_digits(&bytes[1..])),
            Some(b'{') => (TokenKind::Literal, scan_braced(bytes, 1)),
            _ => match scan_dollar_string(bytes) {
                0 => (TokenKind::Punctuation, 1),
                n => (TokenKind::Literal, n),
            },
        },
        b'{' => (TokenKind::Literal, scan_braced(bytes, 0)),
        b'?' => (TokenKind::Literal, 1),
        b':' => match next {
            Some(b':') => (TokenKind::Operator, 2),
            Some(n) if is_ident_start_byte(n) => {
                (TokenKind::Literal, 1 + scan_identifier(&rest[1..]))
            }
            _ => (TokenKind::Punctuation, 1),
        },
        b'@' if next.is_some_and(is_ident_start_byte) => {
            (TokenKind::Literal, 1 + scan_identifier(&rest[1..]))
        }
        b'%' => match next {
            Some(b's' | b'd' | b'b') => (TokenKind::Literal, 2),
            Some(b'(') => match scan_pyformat(bytes) {
                0 => (TokenKind::Operator, 1),
                n => (TokenKind::Literal, n),
            },
            _ => (TokenKind::Operator, 1),
        },
        b'(' | b')' | b',' | b';' | b'.' | b'[' | b']' => (TokenKind::Punctuation, 1),
        b if is_operator_byte(b) => (TokenKind::Operator, scan_operator(bytes)),
        b if b.is_ascii_alphabetic() || b == b'_' => {
            (TokenKind::Identifier, scan_identifier(rest))
        }
        b if b >= 0x80 => {
            if rest.chars().next().is_some_and(char::is_alphabetic) {
                (TokenKind::Identifier, scan_identifier(rest))
            } else {
                (TokenKind::Punctuation, first_char_len(rest))
            }
        }
        _ => (TokenKind::Punctuation, 1),
    }
}

fn first_char_len(s: &str) -> usize {
    s.chars().next().map_or(1, char::len_utf8)
}

fn is_ident_start_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_operator_byte(b: u8) -> bool {
    matches!(
        b,
        b'=' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/' | b'%' | b'^' | b'~' | b'!' | b'&' | b'|'
            | b'#' | b'@'
    )
}

/// Whitespace, including the two-character escapes `\n`, `\t` and `\r` that
/// stand for whitespace inside a host-language literal.
fn scan_whitespace(bytes: &[u8]) -> usize {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
        } else if bytes[i] == b'\\' && matches!(bytes.get(i + 1), Some(b'n' | b't' | b'r')) {
            i += 2;
        } else {
            break;
        }
    }
    i
}

/// Identifier: word characters and dots, accepting non-ASCII letters.
fn scan_identifier(s: &str) -> usize {
    s.char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .map_or(s.len(), |(i, _)| i)
}

fn scan_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Scan a number. Handles hex, decimals, scientific notation, and keeps any
/// trailing word characters (`10L`, `1st`) in the same token so the printer
/// never separates them.
fn scan_number(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let mut i;

    if bytes[0] == b'0' && matches!(bytes.get(1), Some(b'x' | b'X')) {
        i = 2;
        while i < len && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
    } else {
        i = scan_digits(bytes);
        if i < len && bytes[i] == b'.' {
            i += 1;
            i += scan_digits(&bytes[i..]);
        }
        if i < len && (bytes[i] == b'e' || bytes[i] == b'E') {
            let mut j = i + 1;
            if j < len && (bytes[j] == b'+' || bytes[j] == b'-') {
                j += 1;
            }
            if j < len && bytes[j].is_ascii_digit() {
                i = j + scan_digits(&bytes[j..]);
            }
        }
    }

    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    i
}

/// A SQL quoted run whose quotes are backslash-escaped for the host literal,
/// e.g. `\'active\'` inside a single-quoted Python string.
fn scan_escaped_quote(bytes: &[u8], quote: u8) -> usize {
    let mut i = 2;
    while i < bytes.len() {
        let Some(offset) = memchr(b'\\', &bytes[i..]) else {
            return bytes.len();
        };
        let pos = i + offset;
        if bytes.get(pos + 1) == Some(&quote) {
            return pos + 2;
        }
        i = pos + 2;
    }
    bytes.len()
}

/// Line comment up to (not including) the line break. An escaped `\n` or
/// `\r` ends the comment too.
fn scan_line_comment(bytes: &[u8]) -> usize {
    let mut i = 2;
    while i < bytes.len() {
        let Some(offset) = memchr2(b'\n', b'\\', &bytes[i..]) else {
            return bytes.len();
        };
        let pos = i + offset;
        if bytes[pos] == b'\n' || matches!(bytes.get(pos + 1), Some(b'n' | b'r')) {
            return pos;
        }
        i = pos + 1;
    }
    bytes.len()
}

/// Block comment. `bytes` starts at `/*`. Returns byte length including delimiters.
fn scan_block_comment(bytes: &[u8]) -> usize {
    let mut i = 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

/// Dollar-quoted string (`$tag$...$tag$`). `bytes` starts at `$`.
/// Returns 0 when this is not a dollar-quoted string.
fn scan_dollar_string(bytes: &[u8]) -> usize {
    let mut tag_end = 1;
    while tag_end < bytes.len()
        && (bytes[tag_end].is_ascii_alphanumeric() || bytes[tag_end] == b'_')
    {
        tag_end += 1;
    }
    if tag_end >= bytes.len() || bytes[tag_end] != b'$' {
        return 0;
    }
    let tag = &bytes[..tag_end + 1];
    let tag_len = tag.len();

    let mut i = tag_len;
    while i + tag_len <= bytes.len() {
        if bytes[i] == b'$' && bytes[i..].starts_with(tag) {
            return i + tag_len;
        }
        i += 1;
    }
    bytes.len()
}

/// Python DB-API named placeholder `%(name)s`. Returns 0 when malformed.
fn scan_pyformat(bytes: &[u8]) -> usize {
    let Some(close) = memchr(b')', bytes) else {
        return 0;
    };
    let name = &bytes[2..close];
    if name.is_empty() || !name.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_') {
        return 0;
    }
    match bytes.get(close + 1) {
        Some(b) if b.is_ascii_alphabetic() => close + 2,
        _ => 0,
    }
}

fn scan_operator(bytes: &[u8]) -> usize {
    MULTI_CHAR_OPERATORS
        .iter()
        .find(|op| bytes.starts_with(op.as_bytes()))
        .map_or(1, |op| op.len())
}
