use smallvec::SmallVec;

use crate::token::{Token, TokenKind};

/// Top-level clause families the printer lays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    /// Tokens before the first recognized clause (DDL, `EXPLAIN`, ...).
    Preamble,
    With,
    Select,
    From,
    Join,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    InsertInto,
    Values,
    Update,
    Set,
    DeleteFrom,
    Returning,
    SetOperator,
}

impl ClauseKind {
    /// Clauses whose body is a comma-separated list.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Self::Select | Self::GroupBy | Self::OrderBy | Self::Returning | Self::Set | Self::Values
        )
    }

    /// Clauses whose body is an AND/OR condition chain.
    pub fn is_condition(self) -> bool {
        matches!(self, Self::Where | Self::Having)
    }
}

/// A clause: its head keywords (`GROUP BY`, `LEFT OUTER JOIN`) and the
/// tokens up to the next clause at the same nesting depth.
#[derive(Debug, Clone)]
pub struct Clause<'t> {
    pub kind: ClauseKind,
    pub head: SmallVec<[&'t Token; 3]>,
    pub body: Vec<&'t Token>,
}

impl<'t> Clause<'t> {
    fn new(kind: ClauseKind, head: &[&'t Token]) -> Self {
        Self {
            kind,
            head: head.iter().copied().collect(),
            body: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.head.is_empty() && self.body.is_empty()
    }

    pub fn tokens(&self) -> Vec<&'t Token> {
        self.head.iter().chain(self.body.iter()).copied().collect()
    }
}

/// One element of a comma-separated list and the comma that ends it.
#[derive(Debug, Clone)]
pub struct ListItem<'a, 't> {
    pub tokens: &'a [&'t Token],
    pub comma: Option<&'t Token>,
}

/// One link of an AND/OR chain. The first condition has no operator.
#[derive(Debug, Clone)]
pub struct Condition<'t> {
    pub op: Option<&'t Token>,
    pub tokens: Vec<&'t Token>,
}

const JOIN_MODIFIERS: &[&str] = &["NATURAL", "LEFT", "RIGHT", "FULL", "INNER", "CROSS", "OUTER"];

fn depth_delta(token: &Token) -> isize {
    if token.kind != TokenKind::Punctuation {
        return 0;
    }
    match token.text.as_str() {
        "(" | "[" => 1,
        ")" | "]" => -1,
        _ => 0,
    }
}

fn keyword_at(tokens: &[&Token], i: usize, upper: &str) -> bool {
    tokens.get(i).is_some_and(|t| t.is_keyword_named(upper))
}

/// Split significant tokens into statements after each top-level `;`.
/// The `;` stays with the statement it ends.
pub fn split_statements<'t>(tokens: &[&'t Token]) -> Vec<Vec<&'t Token>> {
    let mut statements = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0isize;
    for &token in tokens {
        depth = (depth + depth_delta(token)).max(0);
        current.push(token);
        if depth == 0 && token.is_punct(';') {
            statements.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        statements.push(current);
    }
    statements
}

/// Index of the `)` matching the `(` at `open`, or `tokens.len()` when the
/// group is never closed.
pub fn matching_paren(tokens: &[&Token], open: usize) -> usize {
    let mut depth = 0isize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        depth += depth_delta(token);
        if depth == 0 {
            return i;
        }
    }
    tokens.len()
}

/// Whether a parenthesized group holds a query of its own.
pub fn is_subquery(inner: &[&Token]) -> bool {
    inner
        .iter()
        .find(|t| t.kind != TokenKind::Comment)
        .is_some_and(|t| t.is_keyword_named("SELECT") || t.is_keyword_named("WITH"))
}

/// Whether any parenthesized group in `tokens` is a subquery.
pub fn contains_subquery(tokens: &[&Token]) -> bool {
    tokens.iter().enumerate().any(|(i, t)| {
        t.is_punct('(') && is_subquery(&tokens[i + 1..matching_paren(tokens, i).max(i + 1)])
    })
}

/// Recognize a clause head at `tokens[i]`. Returns the kind and how many
/// tokens the head spans.
fn clause_start(
    tokens: &[&Token],
    i: usize,
    current: ClauseKind,
    at_start: bool,
) -> Option<(ClauseKind, usize)> {
    let token = tokens[i];
    let prev = i.checked_sub(1).map(|p| tokens[p]);
    let prev_is = |word: &str| prev.is_some_and(|p| p.is_keyword_named(word));
    let word = token.text.as_str().to_ascii_uppercase();

    let found = match word.as_str() {
        "SELECT" => {
            let distinct = keyword_at(tokens, i + 1, "DISTINCT") || keyword_at(tokens, i + 1, "ALL");
            (ClauseKind::Select, 1 + usize::from(distinct))
        }
        "FROM" if !prev_is("DISTINCT") => (ClauseKind::From, 1),
        "WHERE" => (ClauseKind::Where, 1),
        "HAVING" => (ClauseKind::Having, 1),
        "LIMIT" => (ClauseKind::Limit, 1),
        "OFFSET" => (ClauseKind::Offset, 1),
        "RETURNING" => (ClauseKind::Returning, 1),
        "VALUES" => (ClauseKind::Values, 1),
        "GROUP" if keyword_at(tokens, i + 1, "BY") => (ClauseKind::GroupBy, 2),
        "ORDER" if keyword_at(tokens, i + 1, "BY") => (ClauseKind::OrderBy, 2),
        "WITH" if at_start => {
            (ClauseKind::With, 1 + usize::from(keyword_at(tokens, i + 1, "RECURSIVE")))
        }
        "INSERT" => (ClauseKind::InsertInto, 1 + usize::from(keyword_at(tokens, i + 1, "INTO"))),
        "DELETE" if !prev_is("ON") => {
            (ClauseKind::DeleteFrom, 1 + usize::from(keyword_at(tokens, i + 1, "FROM")))
        }
        "UPDATE" if !prev_is("FOR") && !prev_is("DO") && !prev_is("ON") => (ClauseKind::Update, 1),
        "SET" if current == ClauseKind::Update || prev_is("UPDATE") => (ClauseKind::Set, 1),
        "UNION" | "INTERSECT" | "EXCEPT" => {
            let quantifier =
                keyword_at(tokens, i + 1, "ALL") || keyword_at(tokens, i + 1, "DISTINCT");
            (ClauseKind::SetOperator, 1 + usize::from(quantifier))
        }
        "JOIN" | "STRAIGHT_JOIN" => (ClauseKind::Join, 1),
        _ if JOIN_MODIFIERS.contains(&word.as_str()) => {
            let mut len = 1;
            while tokens
                .get(i + len)
                .is_some_and(|t| JOIN_MODIFIERS.iter().any(|m| t.is_keyword_named(m)))
            {
                len += 1;
            }
            if !keyword_at(tokens, i + len, "JOIN") {
                return None;
            }
            (ClauseKind::Join, len + 1)
        }
        _ => return None,
    };
    Some(found)
}

/// Split one statement (or subquery body) into clauses at depth 0.
pub fn split_clauses<'t>(tokens: &[&'t Token]) -> Vec<Clause<'t>> {
    let mut clauses = Vec::new();
    let mut current = Clause::new(ClauseKind::Preamble, &[]);
    let mut depth = 0isize;
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        if depth == 0 && token.is_keyword() {
            let at_start = current.kind == ClauseKind::Preamble
                && current.body.iter().all(|t| t.kind == TokenKind::Comment);
            if let Some((kind, len)) = clause_start(tokens, i, current.kind, at_start) {
                let next = Clause::new(kind, &tokens[i..i + len]);
                let done = std::mem::replace(&mut current, next);
                if !done.is_empty() {
                    clauses.push(done);
                }
                i += len;
                continue;
            }
        }
        depth = (depth + depth_delta(token)).max(0);
        current.body.push(token);
        i += 1;
    }
    if !current.is_empty() {
        clauses.push(current);
    }
    clauses
}

/// Split a list body at depth-0 commas. There is always an item after each
/// comma, so a trailing comma yields a final empty item.
pub fn split_list<'a, 't>(tokens: &'a [&'t Token]) -> Vec<ListItem<'a, 't>> {
    let mut items = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;
    for (i, &token) in tokens.iter().enumerate() {
        depth = (depth + depth_delta(token)).max(0);
        if depth == 0 && token.is_punct(',') {
            items.push(ListItem {
                tokens: &tokens[start..i],
                comma: Some(token),
            });
            start = i + 1;
        }
    }
    items.push(ListItem {
        tokens: &tokens[start..],
        comma: None,
    });
    items
}

/// Index of the last depth-0 `AS` in a list item, the one that names it.
pub fn alias_position(tokens: &[&Token]) -> Option<usize> {
    let mut depth = 0isize;
    let mut found = None;
    for (i, &token) in tokens.iter().enumerate() {
        depth = (depth + depth_delta(token)).max(0);
        if depth == 0 && token.is_keyword_named("AS") {
            found = Some(i);
        }
    }
    found
}

/// Split a WHERE/HAVING body at depth-0 AND/OR. The AND of
/// `BETWEEN x AND y` and operators inside CASE expressions are not split.
pub fn split_conditions<'t>(tokens: &[&'t Token]) -> Vec<Condition<'t>> {
    let mut conditions = vec![Condition {
        op: None,
        tokens: Vec::new(),
    }];
    let mut depth = 0isize;
    let mut case_depth = 0usize;
    let mut in_between = false;

    for &token in tokens {
        if depth == 0 {
            if token.is_keyword_named("CASE") {
                case_depth += 1;
            } else if token.is_keyword_named("END") {
                case_depth = case_depth.saturating_sub(1);
            } else if token.is_keyword_named("BETWEEN") {
                in_between = true;
            } else if case_depth == 0
                && (token.is_keyword_named("AND") || token.is_keyword_named("OR"))
            {
                if in_between && token.is_keyword_named("AND") {
                    in_between = false;
                } else {
                    conditions.push(Condition {
                        op: Some(token),
                        tokens: Vec::new(),
                    });
                    continue;
                }
            }
        }
        depth = (depth + depth_delta(token)).max(0);
        if let Some(last) = conditions.last_mut() {
            last.tokens.push(token);
        }
    }
    conditions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn significant(tokens: &[Token]) -> Vec<&Token> {
        tokens.iter().filter(|t| t.kind.is_significant()).collect()
    }

    fn kinds(text: &str) -> Vec<ClauseKind> {
        let tokens = tokenize(text);
        let kinds = split_clauses(&significant(&tokens))
            .iter()
            .map(|c| c.kind)
            .collect();
        kinds
    }

    #[test]
    fn test_basic_select_clauses() {
        use ClauseKind::*;
        assert_eq!(
            kinds("select a from t where x = 1 group by a having count(*) > 1 order by a limit 5 offset 2"),
            vec![Select, From, Where, GroupBy, Having, OrderBy, Limit, Offset]
        );
    }

    #[test]
    fn test_join_heads() {
        let tokens = tokenize("select a from t left outer join u on t.id = u.id cross join v");
        let sig = significant(&tokens);
        let clauses = split_clauses(&sig);
        let heads: Vec<String> = clauses
            .iter()
            .map(|c| c.head.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" "))
            .collect();
        assert_eq!(heads, vec!["select", "from", "left outer join", "cross join"]);
    }

    #[test]
    fn test_left_function_is_not_a_join() {
        use ClauseKind::*;
        assert_eq!(kinds("select left(name, 2) from t"), vec![Select, From]);
    }

    #[test]
    fn test_nested_clauses_stay_in_body() {
        use ClauseKind::*;
        assert_eq!(
            kinds("select (select max(x) from u) from t where a in (select b from v)"),
            vec![Select, From, Where]
        );
    }

    #[test]
    fn test_dml_clauses() {
        use ClauseKind::*;
        assert_eq!(kinds("insert into t (a, b) values (1, 2)"), vec![InsertInto, Values]);
        assert_eq!(kinds("update t set a = 1 where id = 2"), vec![Update, Set, Where]);
        assert_eq!(kinds("delete from t where id = 2"), vec![DeleteFrom, Where]);
    }

    #[test]
    fn test_returning_needs_dialect_keyword() {
        use crate::dialect::Postgres;
        use crate::lexer::Lexer;
        use ClauseKind::*;

        let tokens = Lexer::new(Box::new(Postgres)).tokenize("delete from t returning id");
        let found: Vec<ClauseKind> = split_clauses(&significant(&tokens))
            .iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(found, vec![DeleteFrom, Returning]);
        assert_eq!(kinds("delete from t returning id"), vec![DeleteFrom]);
    }

    #[test]
    fn test_for_update_is_not_a_clause() {
        use ClauseKind::*;
        assert_eq!(kinds("select a from t for update"), vec![Select, From]);
    }

    #[test]
    fn test_with_and_set_operators() {
        use ClauseKind::*;
        assert_eq!(
            kinds("with x as (select 1) select * from x union all select 2"),
            vec![With, Select, From, SetOperator, Select]
        );
    }

    #[test]
    fn test_preamble() {
        use ClauseKind::*;
        assert_eq!(kinds("create view v as select a from t"), vec![Preamble, Select, From]);
        assert_eq!(kinds("drop table t"), vec![Preamble]);
    }

    #[test]
    fn test_is_distinct_from() {
        use ClauseKind::*;
        assert_eq!(kinds("select a from t where a is distinct from b"), vec![Select, From, Where]);
    }

    #[test]
    fn test_split_statements() {
        let tokens = tokenize("select 1; select ';'; select 3");
        let statements = split_statements(&significant(&tokens));
        assert_eq!(statements.len(), 3);
        assert!(statements[0].last().is_some_and(|t| t.is_punct(';')));
    }

    #[test]
    fn test_split_list_depth() {
        let tokens = tokenize("a, f(b, c), d,");
        let sig = significant(&tokens);
        let items = split_list(&sig);
        let sizes: Vec<usize> = items.iter().map(|i| i.tokens.len()).collect();
        assert_eq!(sizes, vec![1, 6, 1, 0]);
        assert!(items[3].comma.is_none());
    }

    #[test]
    fn test_alias_position() {
        let position = |text: &str| {
            let tokens = tokenize(text);
            alias_position(&significant(&tokens))
        };
        assert_eq!(position("a as b"), Some(1));
        assert_eq!(position("cast(a as int) as b"), Some(6));
        assert_eq!(position("cast(a as int)"), None);
        assert_eq!(position("t.as_of"), None);
    }

    #[test]
    fn test_split_conditions() {
        let tokens = tokenize("a = 1 and b between 1 and 2 or (c = 1 and d = 2) and case when x and y then 1 end = 1");
        let sig = significant(&tokens);
        let conditions = split_conditions(&sig);
        let ops: Vec<Option<&str>> = conditions
            .iter()
            .map(|c| c.op.map(|t| t.text.as_str()))
            .collect();
        assert_eq!(ops, vec![None, Some("and"), Some("or"), Some("and")]);
    }

    #[test]
    fn test_subquery_detection() {
        let tokens = tokenize("x in (select 1) and f(1)");
        let sig = significant(&tokens);
        assert!(contains_subquery(&sig));
        let tokens = tokenize("f(1, (2))");
        assert!(!contains_subquery(&significant(&tokens)));
    }

    #[test]
    fn test_matching_paren_unclosed() {
        let tokens = tokenize("( a ( b )");
        let sig = significant(&tokens);
        assert_eq!(matching_paren(&sig, 0), sig.len());
        assert_eq!(matching_paren(&sig, 2), 4);
    }
}
