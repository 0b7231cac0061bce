use memchr::{memchr2, memchr3};

/// Scan a quoted run starting at `bytes[0]` (the opening quote). Handles
/// backslash escapes and, when `doubled` is set, SQL-style doubled quotes
/// (`'it''s'`). Returns the byte length including both delimiters, or the
/// full length when the quote is never closed.
pub(crate) fn scan_quoted(bytes: &[u8], doubled: bool) -> usize {
    let quote = bytes[0];
    let mut i = 1;
    while i < bytes.len() {
        // Jump to the next quote or backslash
        let Some(offset) = memchr2(quote, b'\\', &bytes[i..]) else {
            return bytes.len();
        };
        let pos = i + offset;
        if bytes[pos] == b'\\' {
            i = pos + 2;
            continue;
        }
        if doubled && bytes.get(pos + 1) == Some(&quote) {
            i = pos + 2;
            continue;
        }
        return pos + 1;
    }
    bytes.len()
}

/// Find the closing quote of a single-line host literal whose content starts
/// at `start`. Returns the index of the closing quote. A raw newline before
/// the quote means the literal is malformed and `None` is returned.
pub(crate) fn find_line_quote_end(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        let offset = memchr3(quote, b'\\', b'\n', &bytes[i..])?;
        let pos = i + offset;
        match bytes[pos] {
            b'\\' => i = pos + 2,
            b'\n' => return None,
            _ => return Some(pos),
        }
    }
    None
}

/// Find the closing triple quote of a block literal whose content starts at
/// `start`. Returns the index of the first byte of the closing delimiter.
pub(crate) fn find_triple_quote_end(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        let offset = memchr2(quote, b'\\', &bytes[i..])?;
        let pos = i + offset;
        if bytes[pos] == b'\\' {
            i = pos + 2;
            continue;
        }
        if bytes[pos..].starts_with(&[quote, quote, quote]) {
            return Some(pos);
        }
        i = pos + 1;
    }
    None
}

/// Scan a brace-balanced run. `bytes[open]` must be `{`. Returns the byte
/// length up to and including the matching `}`, or the full length.
pub(crate) fn scan_braced(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}
