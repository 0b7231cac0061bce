use compact_str::CompactString;
use smallvec::SmallVec;

use crate::lexer::Lexer;
use crate::mode::Mode;
use crate::occurrence::StringOccurrence;
use crate::token::{Token, TokenKind};

/// Why a literal was (or was not) taken for SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// The enclosing identifier contains a SQL name word, e.g. `user_sql`.
    NameMatch { word: CompactString },
    /// The text starts like a SQL statement and has statement structure.
    ContentMatch {
        leading: CompactString,
        structural: CompactString,
    },
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    None,
    Medium,
    High,
}

/// The classifier's decision for one occurrence.
#[derive(Debug, Clone)]
pub struct ClassificationVerdict<'a> {
    pub occurrence: &'a StringOccurrence,
    pub reason: Reason,
}

impl ClassificationVerdict<'_> {
    pub fn is_sql(&self) -> bool {
        !matches!(self.reason, Reason::NoMatch)
    }

    pub fn confidence(&self) -> Confidence {
        match self.reason {
            Reason::NameMatch { .. } => Confidence::High,
            Reason::ContentMatch { .. } => Confidence::Medium,
            Reason::NoMatch => Confidence::None,
        }
    }
}

/// Decide whether an occurrence holds SQL. Rules run in order and the first
/// match wins; anything ambiguous is `NoMatch`.
pub fn classify<'a>(
    occurrence: &'a StringOccurrence,
    lexer: &Lexer,
    mode: &Mode,
) -> ClassificationVerdict<'a> {
    let reason = if occurrence.text.trim().is_empty() {
        Reason::NoMatch
    } else if let Some(word) = occurrence
        .identifier
        .as_deref()
        .and_then(|name| name_signal(name, &mode.name_keywords))
    {
        Reason::NameMatch { word }
    } else if let Some(reason) = content_signal(&lexer.tokenize(&occurrence.text), mode) {
        reason
    } else {
        Reason::NoMatch
    };

    ClassificationVerdict { occurrence, reason }
}

/// Rule 1: some word of the identifier equals a configured name keyword.
fn name_signal(identifier: &str, name_keywords: &[String]) -> Option<CompactString> {
    identifier_words(identifier)
        .into_iter()
        .find(|word| name_keywords.iter().any(|k| k.eq_ignore_ascii_case(word)))
        .map(CompactString::from)
}

/// Rule 2: first significant token is a statement keyword and a structural
/// keyword follows somewhere after it. The configured word sets decide, not
/// the dialect, so words the dialect does not reserve still count.
fn content_signal(tokens: &[Token], mode: &Mode) -> Option<Reason> {
    let mut significant = tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::Whitespace | TokenKind::Comment));

    let first = significant.next()?;
    if !is_word(first) || !contains_word(&mode.statement_keywords, &first.text) {
        return None;
    }

    let structural = significant
        .filter(|t| is_word(t))
        .find(|t| contains_word(&mode.structural_keywords, &t.text))?;

    Some(Reason::ContentMatch {
        leading: first.text.as_str().to_ascii_uppercase().into(),
        structural: structural.text.as_str().to_ascii_uppercase().into(),
    })
}

/// Bare words only; quoted text, literals and comments never count.
fn is_word(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Keyword | TokenKind::Identifier)
}

fn contains_word(words: &[String], word: &str) -> bool {
    words.iter().any(|w| w.eq_ignore_ascii_case(word))
}

/// Split an identifier into words on separators, digit runs and camelCase
/// boundaries: `postsSQLQuery2` -> `posts`, `SQL`, `Query`.
pub fn identifier_words(identifier: &str) -> SmallVec<[&str; 6]> {
    let mut words = SmallVec::new();
    let chars: Vec<(usize, char)> = identifier.char_indices().collect();
    let mut start: Option<usize> = None;

    for (idx, &(pos, c)) in chars.iter().enumerate() {
        if !c.is_alphabetic() {
            if let Some(s) = start.take() {
                words.push(&identifier[s..pos]);
            }
            continue;
        }
        let Some(s) = start else {
            start = Some(pos);
            continue;
        };
        let prev = chars[idx - 1].1;
        let next = chars.get(idx + 1).map(|&(_, n)| n);
        // fooBar: split before B. SQLQuery: split before the Q of Query.
        let lower_to_upper = prev.is_lowercase() && c.is_uppercase();
        let acronym_end =
            prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase);
        if lower_to_upper || acronym_end {
            words.push(&identifier[s..pos]);
            start = Some(pos);
        }
    }
    if let Some(s) = start {
        words.push(&identifier[s..]);
    }
    words
}
