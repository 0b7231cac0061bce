use crate::clause::{
    alias_position, contains_subquery, is_subquery, matching_paren, split_clauses,
    split_conditions, split_list, split_statements, Clause, ClauseKind,
};
use crate::line::LineWriter;
use crate::mode::{CommaPosition, Mode};
use crate::token::Token;

/// SqlFormatter lays out a token stream:
///   1. Drop whitespace and split into statements
///   2. Keep a lone statement on one line when it fits
///   3. Otherwise print one clause per line, splitting long lists and
///      condition chains, with subqueries indented one level
///
/// Only whitespace and keyword case ever change; every other token is
/// emitted with its exact text and in its original order.
pub struct SqlFormatter<'m> {
    mode: &'m Mode,
}

impl<'m> SqlFormatter<'m> {
    pub fn new(mode: &'m Mode) -> Self {
        Self { mode }
    }

    pub fn format(&self, tokens: &[Token]) -> String {
        let significant: Vec<&Token> = tokens.iter().filter(|t| t.kind.is_significant()).collect();
        let statements = split_statements(&significant);

        if let [only] = statements.as_slice() {
            if let Some(line) = self.single_line(only) {
                return line;
            }
        }

        let mut writer = LineWriter::new(self.mode);
        for statement in &statements {
            self.write_query(&mut writer, statement, 0);
        }
        writer.finish()
    }

    fn single_line(&self, tokens: &[&Token]) -> Option<String> {
        if tokens.iter().any(|t| t.forces_break()) {
            return None;
        }
        let mut writer = LineWriter::inline(self.mode);
        for clause in split_clauses(tokens) {
            writer.set_paren_space(clause.kind == ClauseKind::InsertInto);
            writer.push_all(&clause.head);
            writer.push_all(&clause.body);
        }
        let line = writer.finish();
        (width(&line) <= self.mode.line_length).then_some(line)
    }

    fn write_query<'t>(&self, w: &mut LineWriter<'t>, tokens: &[&'t Token], depth: usize) {
        for clause in split_clauses(tokens) {
            w.newline(depth);
            w.set_continuation(depth + 1);
            w.set_paren_space(clause.kind == ClauseKind::InsertInto);
            w.push_all(&clause.head);
            match clause.kind {
                kind if kind.is_list() => self.write_list(w, &clause, depth),
                kind if kind.is_condition() => self.write_conditions(w, &clause, depth),
                ClauseKind::With => self.write_with(w, &clause, depth),
                _ => self.write_tokens(w, &clause.body, depth + 1),
            }
        }
    }

    /// Write tokens inline, expanding parenthesized subqueries into
    /// indented blocks.
    fn write_tokens<'t>(&self, w: &mut LineWriter<'t>, tokens: &[&'t Token], depth: usize) {
        w.set_continuation(depth);
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            if token.is_punct('(') {
                let close = matching_paren(tokens, i);
                let inner = &tokens[i + 1..close];
                if is_subquery(inner) {
                    w.push(token);
                    let line_depth = w.current_depth();
                    self.write_query(w, inner, line_depth + 1);
                    w.newline(line_depth);
                    w.set_continuation(depth);
                    if let Some(&close_paren) = tokens.get(close) {
                        w.push(close_paren);
                    }
                    i = close + 1;
                    continue;
                }
            }
            w.push(token);
            i += 1;
        }
    }

    fn write_list<'t>(&self, w: &mut LineWriter<'t>, clause: &Clause<'t>, depth: usize) {
        let items = split_list(&clause.body);
        let split = match clause.kind {
            ClauseKind::GroupBy if self.mode.group_by_single_line => false,
            kind => {
                (kind != ClauseKind::Values && items.len() > self.mode.max_inline_columns)
                    || needs_break(&clause.body)
                    || self.too_wide(&clause.tokens(), depth)
            }
        };
        if !split {
            self.write_tokens(w, &clause.body, depth + 1);
            return;
        }

        // the comma each item's line opens with
        let leading: Vec<Option<&'t Token>> = (0..items.len())
            .map(|n| {
                let prev = &items[n.checked_sub(1)?];
                match self.mode.comma_position {
                    CommaPosition::Start => prev.comma,
                    // a comma after a line comment opens the next line
                    CommaPosition::End => prev
                        .tokens
                        .last()
                        .is_some_and(|t| t.is_line_comment())
                        .then_some(prev.comma)
                        .flatten(),
                }
            })
            .collect();

        let aliases: Vec<Option<usize>> = items
            .iter()
            .map(|item| {
                let at = alias_position(item.tokens)?;
                (self.mode.align_aliases
                    && clause.kind == ClauseKind::Select
                    && !needs_break(&item.tokens[..at]))
                .then_some(at)
            })
            .collect();
        let column = items
            .iter()
            .zip(&leading)
            .zip(&aliases)
            .filter_map(|((item, comma), at)| {
                let mut prefix: Vec<&Token> = comma.iter().copied().collect();
                prefix.extend_from_slice(&item.tokens[..(*at)?]);
                Some(width(&self.inline(&prefix)))
            })
            .max();

        for ((item, comma), at) in items.iter().zip(&leading).zip(&aliases) {
            w.newline(depth + 1);
            if let Some(comma) = *comma {
                w.push(comma);
            }
            match (at, column) {
                (Some(at), Some(column)) => {
                    self.write_tokens(w, &item.tokens[..*at], depth + 1);
                    w.pad_to(column);
                    self.write_tokens(w, &item.tokens[*at..], depth + 1);
                }
                _ => self.write_tokens(w, item.tokens, depth + 1),
            }
            if self.mode.comma_position == CommaPosition::End
                && !item.tokens.last().is_some_and(|t| t.is_line_comment())
            {
                if let Some(comma) = item.comma {
                    w.push(comma);
                }
            }
        }
    }

    fn write_conditions<'t>(&self, w: &mut LineWriter<'t>, clause: &Clause<'t>, depth: usize) {
        let conditions = split_conditions(&clause.body);
        let split = conditions.len() > 1
            && (needs_break(&clause.body)
                || width(&self.inline(&clause.body)) > self.mode.condition_width
                || self.too_wide(&clause.tokens(), depth));
        if !split {
            self.write_tokens(w, &clause.body, depth + 1);
            return;
        }

        for condition in &conditions {
            if let Some(op) = condition.op {
                w.newline(depth + 1);
                w.push(op);
            }
            self.write_tokens(w, &condition.tokens, depth + 1);
        }
    }

    /// CTEs: one definition per line, bodies expanded as subqueries.
    fn write_with<'t>(&self, w: &mut LineWriter<'t>, clause: &Clause<'t>, depth: usize) {
        for (n, item) in split_list(&clause.body).iter().enumerate() {
            if n > 0 {
                w.newline(depth);
            }
            self.write_tokens(w, item.tokens, depth + 1);
            if let Some(comma) = item.comma {
                w.push(comma);
            }
        }
    }

    fn inline(&self, tokens: &[&Token]) -> String {
        let mut writer = LineWriter::inline(self.mode);
        writer.push_all(tokens);
        writer.finish()
    }

    fn too_wide(&self, tokens: &[&Token], depth: usize) -> bool {
        depth * self.mode.indent_width + width(&self.inline(tokens)) > self.mode.line_length
    }
}

/// Line comments, multi-line tokens and subqueries cannot stay inline.
fn needs_break(tokens: &[&Token]) -> bool {
    tokens.iter().any(|t| t.forces_break()) || contains_subquery(tokens)
}

fn width(text: &str) -> usize {
    text.chars().count()
}

/// Format a token stream with `mode`.
pub fn format_tokens(tokens: &[Token], mode: &Mode) -> String {
    SqlFormatter::new(mode).format(tokens)
}
