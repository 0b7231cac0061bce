use compact_str::CompactString;

/// Position in the literal text (byte offset).
pub type Pos = usize;

/// Lexical categories of embedded SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Punctuation,
    Operator,
    Literal,
    Comment,
    Whitespace,
}

impl TokenKind {
    /// Tokens that carry meaning; whitespace is re-created by the printer.
    pub fn is_significant(self) -> bool {
        self != Self::Whitespace
    }
}

/// An immutable token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: CompactString,
    pub offset: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, offset: Pos) -> Self {
        Self {
            kind,
            text: CompactString::from(text),
            offset,
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind == TokenKind::Keyword
    }

    /// Case-insensitive keyword comparison against an uppercase word.
    pub fn is_keyword_named(&self, upper: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(upper)
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punctuation && self.text.len() == c.len_utf8() && self.text.starts_with(c)
    }

    pub fn is_line_comment(&self) -> bool {
        self.kind == TokenKind::Comment && self.text.starts_with("--")
    }

    /// Whether this token cannot share a line with whatever follows it.
    pub fn forces_break(&self) -> bool {
        self.is_line_comment() || self.text.contains('\n')
    }
}
