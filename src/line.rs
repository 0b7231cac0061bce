use std::borrow::Cow;
use std::sync::LazyLock;

use crate::mode::{KeywordCase, Mode};
use crate::token::{Token, TokenKind};

/// Pre-computed indentation strings (0..=200 spaces).
static INDENT_CACHE: LazyLock<Vec<String>> =
    LazyLock::new(|| (0..=200).map(|n| " ".repeat(n)).collect());

/// Return `n` spaces, borrowed from the cache when possible.
pub fn indent_str(n: usize) -> Cow<'static, str> {
    match INDENT_CACHE.get(n) {
        Some(s) => Cow::Borrowed(s.as_str()),
        None => Cow::Owned(" ".repeat(n)),
    }
}

/// Keywords that read as function names when followed by `(`.
const FUNCTION_KEYWORDS: &[&str] = &["LEFT", "RIGHT", "REPLACE", "IF"];

/// Keywords after which `-` or `+` is binary, not a sign.
const VALUE_KEYWORDS: &[&str] = &["END", "NULL", "TRUE", "FALSE"];

/// One output line: an indentation level and its text.
#[derive(Debug, Clone, Default)]
pub struct Line {
    pub depth: usize,
    pub text: String,
}

/// Accumulates tokens into indented lines, deciding the spacing between
/// neighbouring tokens. Line breaks are requested by the caller, except
/// after a line comment, which always ends its line.
pub struct LineWriter<'t> {
    indent_width: usize,
    keyword_case: KeywordCase,
    inline: bool,
    lines: Vec<Line>,
    last: Option<&'t Token>,
    last_unary: bool,
    pending_break: bool,
    continuation: usize,
    paren_space: bool,
}

impl<'t> LineWriter<'t> {
    pub fn new(mode: &Mode) -> Self {
        Self {
            indent_width: mode.indent_width,
            keyword_case: mode.keyword_case,
            inline: false,
            lines: Vec::new(),
            last: None,
            last_unary: false,
            pending_break: false,
            continuation: 0,
            paren_space: false,
        }
    }

    /// A writer that keeps everything on one line; requested breaks are ignored.
    pub fn inline(mode: &Mode) -> Self {
        Self {
            inline: true,
            ..Self::new(mode)
        }
    }

    /// Start a new line at `depth`. An empty current line is reused.
    pub fn newline(&mut self, depth: usize) {
        if self.inline {
            return;
        }
        self.pending_break = false;
        match self.lines.last_mut() {
            Some(line) if line.text.is_empty() => line.depth = depth,
            _ => self.lines.push(Line {
                depth,
                text: String::new(),
            }),
        }
    }

    /// Depth of the line currently being written.
    pub fn current_depth(&self) -> usize {
        self.lines.last().map_or(0, |l| l.depth)
    }

    /// Depth used for the line that follows a line comment.
    pub fn set_continuation(&mut self, depth: usize) {
        self.continuation = depth;
    }

    /// Whether an identifier gets a space before `(` (column lists after
    /// `INSERT INTO t`).
    pub fn set_paren_space(&mut self, on: bool) {
        self.paren_space = on;
    }

    pub fn push(&mut self, token: &'t Token) {
        if self.pending_break && !self.inline {
            self.newline(self.continuation);
        }
        if self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        let unary = is_unary(token, self.last);
        let space = needs_space(self.last, self.last_unary, token, self.paren_space);
        let text = cased(token, self.keyword_case);
        let Some(line) = self.lines.last_mut() else {
            return;
        };
        if space && !line.text.is_empty() {
            line.text.push(' ');
        }
        line.text.push_str(&text);

        self.last = Some(token);
        self.last_unary = unary;
        if token.is_line_comment() {
            self.pending_break = true;
        }
    }

    /// Width of the text written so far on the current line, without indentation.
    pub fn current_width(&self) -> usize {
        self.lines.last().map_or(0, |l| l.text.chars().count())
    }

    /// Pad the current line with spaces up to `width` characters.
    pub fn pad_to(&mut self, width: usize) {
        if let Some(line) = self.lines.last_mut() {
            let len = line.text.chars().count();
            if len < width {
                line.text.push_str(&indent_str(width - len));
            }
        }
    }

    pub fn push_all(&mut self, tokens: &[&'t Token]) {
        for &token in tokens {
            self.push(token);
        }
    }

    /// Render the collected lines. A single line comes back as-is; several
    /// lines are indented, joined and terminated by one newline. Spaces are
    /// only ever written between tokens, so token text is never trimmed.
    pub fn finish(self) -> String {
        let lines: Vec<&Line> = self.lines.iter().filter(|l| !l.text.is_empty()).collect();
        match lines.as_slice() {
            [] => String::new(),
            [only] => only.text.clone(),
            _ => {
                let mut out = String::new();
                for line in lines {
                    out.push_str(&indent_str(line.depth * self.indent_width));
                    out.push_str(&line.text);
                    out.push('\n');
                }
                out
            }
        }
    }
}

/// Apply the configured keyword case.
fn cased(token: &Token, case: KeywordCase) -> Cow<'_, str> {
    if token.kind != TokenKind::Keyword {
        return Cow::Borrowed(token.text.as_str());
    }
    match case {
        KeywordCase::Upper => Cow::Owned(token.text.as_str().to_ascii_uppercase()),
        KeywordCase::Lower => Cow::Owned(token.text.as_str().to_ascii_lowercase()),
        KeywordCase::Preserve => Cow::Borrowed(token.text.as_str()),
    }
}

/// A sign operator binds to its operand without a space.
fn is_unary(token: &Token, prev: Option<&Token>) -> bool {
    if token.kind != TokenKind::Operator || !matches!(token.text.as_str(), "-" | "+" | "~") {
        return false;
    }
    let Some(prev) = prev else {
        return true;
    };
    match prev.kind {
        TokenKind::Operator => true,
        TokenKind::Punctuation => prev.is_punct('(') || prev.is_punct(',') || prev.is_punct('['),
        TokenKind::Keyword => !VALUE_KEYWORDS
            .iter()
            .any(|k| prev.text.eq_ignore_ascii_case(k)),
        _ => false,
    }
}

/// Whether a space goes between `prev` and `next` on the same line.
fn needs_space(prev: Option<&Token>, prev_unary: bool, next: &Token, paren_space: bool) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    if prev_unary {
        // `- -1` and `- --x` must stay apart
        return next.text.starts_with('-');
    }
    // a bare backslash would escape whatever touches it
    if prev.is_punct('\\') {
        return true;
    }
    if [',', ';', ')', ']'].iter().any(|&c| next.is_punct(c)) {
        return false;
    }
    if prev.is_punct('(') || prev.is_punct('[') {
        return false;
    }
    if is_cast(prev) || is_cast(next) {
        return false;
    }
    if next.is_punct('.') {
        return !(is_quoted(prev) || prev.is_punct(')') || prev.is_punct(']'));
    }
    if prev.is_punct('.') || (prev.kind == TokenKind::Identifier && prev.text.ends_with('.')) {
        return !(next.kind == TokenKind::Identifier
            || is_quoted(next)
            || (next.kind == TokenKind::Operator && next.text == "*"));
    }
    if next.is_punct('(') || next.is_punct('[') {
        return match prev.kind {
            TokenKind::Identifier => paren_space,
            TokenKind::Keyword => !FUNCTION_KEYWORDS
                .iter()
                .any(|k| prev.text.eq_ignore_ascii_case(k)),
            _ => true,
        };
    }
    true
}

fn is_cast(token: &Token) -> bool {
    token.kind == TokenKind::Operator && token.text == "::"
}

fn is_quoted(token: &Token) -> bool {
    token.kind == TokenKind::Literal
        && (token.text.starts_with('"') || token.text.starts_with('`') || token.text.starts_with('\''))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn render_inline(text: &str) -> String {
        let tokens = tokenize(text);
        let mode = Mode::default();
        let mut writer = LineWriter::inline(&mode);
        for token in tokens.iter().filter(|t| t.kind.is_significant()) {
            writer.push(token);
        }
        writer.finish()
    }

    #[test]
    fn test_indent_str() {
        assert_eq!(indent_str(0), "");
        assert_eq!(indent_str(4), "    ");
        assert_eq!(indent_str(300).len(), 300);
    }

    #[test]
    fn test_spacing_rules() {
        assert_eq!(render_inline("count ( * )"), "count(*)");
        assert_eq!(render_inline("a ,b ;"), "a, b;");
        assert_eq!(render_inline("x :: int"), "x::int");
        assert_eq!(render_inline("\"s\" . \"t\""), "\"s\".\"t\"");
        assert_eq!(render_inline("t. *"), "t.*");
        assert_eq!(render_inline("arr [ 1 ]"), "arr[1]");
        assert_eq!(render_inline("x in (1,2)"), "x IN (1, 2)");
    }

    #[test]
    fn test_function_keywords_hug_parens() {
        assert_eq!(render_inline("left(name, 3)"), "LEFT(name, 3)");
        assert_eq!(render_inline("exists (select 1)"), "EXISTS (SELECT 1)");
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(render_inline("a = - 1"), "a = -1");
        assert_eq!(render_inline("a - 1"), "a - 1");
        assert_eq!(render_inline("(- x)"), "(-x)");
        assert_eq!(render_inline("end - 1"), "END - 1");
        assert_eq!(render_inline("a = - - 1"), "a = - -1");
    }

    #[test]
    fn test_keyword_case() {
        let tokens = tokenize("Select id");
        let mode = Mode {
            keyword_case: KeywordCase::Lower,
            ..Mode::default()
        };
        let mut writer = LineWriter::inline(&mode);
        for token in tokens.iter().filter(|t| t.kind.is_significant()) {
            writer.push(token);
        }
        assert_eq!(writer.finish(), "select id");

        let mode = Mode {
            keyword_case: KeywordCase::Preserve,
            ..Mode::default()
        };
        let mut writer = LineWriter::inline(&mode);
        for token in tokens.iter().filter(|t| t.kind.is_significant()) {
            writer.push(token);
        }
        assert_eq!(writer.finish(), "Select id");
    }

    #[test]
    fn test_line_comment_forces_break() {
        let tokens = tokenize("a -- note\nb");
        let mode = Mode::default();
        let mut writer = LineWriter::new(&mode);
        writer.set_continuation(1);
        for token in tokens.iter().filter(|t| t.kind.is_significant()) {
            writer.push(token);
        }
        assert_eq!(writer.finish(), "a -- note\n  b\n");
    }

    #[test]
    fn test_token_text_is_not_trimmed() {
        assert_eq!(render_inline("select 'open  "), "SELECT 'open  ");
        assert_eq!(render_inline("a = 1 \\ "), "a = 1 \\");
        assert_eq!(render_inline("f(a \\ , b)"), "f(a \\ , b)");
    }

    #[test]
    fn test_pad_to() {
        let tokens = tokenize("a as b");
        let mode = Mode::default();
        let mut writer = LineWriter::new(&mode);
        writer.newline(1);
        writer.push(&tokens[0]);
        assert_eq!(writer.current_width(), 1);
        writer.pad_to(4);
        writer.push(&tokens[2]);
        writer.push(&tokens[4]);
        writer.newline(1);
        writer.push(&tokens[4]);
        assert_eq!(writer.finish(), "  a    AS b\n  b\n");
    }

    #[test]
    fn test_empty_lines_are_dropped() {
        let tokens = tokenize("a b");
        let mode = Mode::default();
        let mut writer = LineWriter::new(&mode);
        writer.newline(0);
        writer.push(&tokens[0]);
        writer.newline(1);
        writer.newline(1);
        writer.push(&tokens[2]);
        assert_eq!(writer.finish(), "a\n  b\n");
    }
}
