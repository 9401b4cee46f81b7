//! Query grammar and clause tree.
//!
//! ```text
//! expr    := and ("OR" and)*
//! and     := unary (["AND"] unary)*
//! unary   := ("NOT" | "-") unary | primary
//! primary := "(" expr ")" | [field ":"] value
//! value   := word | "quoted words" | "[" low "TO" high "]"
//! ```
//!
//! Parsing is schema-aware: field names are resolved and values analyzed with
//! the analyzer the schema binds to that field, so the resulting terms are
//! exactly the ones the builder wrote.

use crate::error::{Result, SearchError};
use crate::schema::{FieldDef, FieldKind, Schema};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref RANGE_FRAGMENT: Regex = Regex::new(r"\S*\[[^\]]*\]").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term { field: String, token: String },
    /// Multi-token match, evaluated as the conjunction of its terms.
    Phrase { field: String, tokens: Vec<String> },
    /// Inclusive numeric range.
    Range { field: String, low: i64, high: i64 },
    /// `Not` matches documents matched by none of its children.
    Boolean { op: BoolOp, children: Vec<Query> },
}

impl Query {
    pub fn term(field: &str, token: &str) -> Self {
        Query::Term { field: field.to_string(), token: token.to_string() }
    }

    pub fn range(field: &str, low: i64, high: i64) -> Self {
        Query::Range { field: field.to_string(), low, high }
    }

    pub fn and(children: Vec<Query>) -> Self {
        Self::boolean(BoolOp::And, children)
    }

    pub fn or(children: Vec<Query>) -> Self {
        Self::boolean(BoolOp::Or, children)
    }

    pub fn not(child: Query) -> Self {
        Query::Boolean { op: BoolOp::Not, children: vec![child] }
    }

    fn boolean(op: BoolOp, mut children: Vec<Query>) -> Self {
        if children.len() == 1 {
            return children.remove(0);
        }
        Query::Boolean { op, children }
    }

    /// Every field name referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Query::Term { field, .. } | Query::Phrase { field, .. } | Query::Range { field, .. } => out.push(field),
            Query::Boolean { children, .. } => children.iter().for_each(|c| c.collect_fields(out)),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term { field, token } => write!(f, "{field}:{token}"),
            Query::Phrase { field, tokens } => write!(f, "{field}:\"{}\"", tokens.join(" ")),
            Query::Range { field, low, high } => write!(f, "{field}:[{low} TO {high}]"),
            Query::Boolean { op: BoolOp::Not, children } => {
                write!(f, "NOT ")?;
                if children.len() == 1 {
                    write!(f, "{}", children[0])
                } else {
                    write!(f, "{}", Query::or(children.clone()))
                }
            }
            Query::Boolean { op, children } => {
                let sep = if *op == BoolOp::And { " AND " } else { " OR " };
                write!(f, "(")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// How unqualified words are scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    /// Bare words target this one field.
    SingleField(String),
    /// Bare words must each match in at least one default-searchable field.
    MultiField,
}

impl QueryMode {
    pub fn from_field(field: Option<&str>) -> Self {
        match field {
            Some(f) => QueryMode::SingleField(f.to_string()),
            None => QueryMode::MultiField,
        }
    }
}

pub fn parse(text: &str, mode: &QueryMode, schema: &Schema) -> Result<Query> {
    let default_field = match mode {
        QueryMode::SingleField(name) => Some(schema.resolve(name)?),
        QueryMode::MultiField => None,
    };
    let tokens = Lexer { src: text, pos: 0 }.tokens()?;
    if tokens.is_empty() {
        return Err(SearchError::parse(text, "empty query"));
    }
    let mut parser = Parser { src: text, tokens, pos: 0, schema, default_field };
    let query = parser.expr()?;
    if let Some(tok) = parser.tokens.get(parser.pos) {
        return Err(SearchError::parse(parser.fragment(tok), "unbalanced parenthesis"));
    }
    Ok(query)
}

/// Plain query words with field prefixes, range clauses, operators and
/// negated words removed. Used for snippets and relevance judging.
pub fn free_text(text: &str) -> Vec<String> {
    RANGE_FRAGMENT
        .replace_all(text, " ")
        .split_whitespace()
        .filter(|w| !matches!(*w, "AND" | "OR" | "NOT") && !w.starts_with('-'))
        .map(|w| w.rsplit(':').next().unwrap_or(w))
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Word(String),
    Quoted(String),
    Range(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Clause { field: Option<String>, value: Value },
}

#[derive(Debug)]
struct Spanned {
    tok: Tok,
    start: usize,
    end: usize,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

fn ends_word(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')'
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str { &self.src[self.pos..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn tokens(mut self) -> Result<Vec<Spanned>> {
        let mut out = Vec::new();
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let start = self.pos;
            let Some(c) = self.peek() else { break };
            let tok = match c {
                '(' => {
                    self.bump();
                    Tok::LParen
                }
                ')' => {
                    self.bump();
                    Tok::RParen
                }
                '-' if self.rest()[1..].starts_with(|n: char| n == '(' || !ends_word(n)) => {
                    self.bump();
                    Tok::Not
                }
                _ => self.clause(start)?,
            };
            out.push(Spanned { tok, start, end: self.pos });
        }
        Ok(out)
    }

    fn clause(&mut self, start: usize) -> Result<Tok> {
        let field = self.field_prefix(start)?;
        let value = match self.peek() {
            Some('"') => self.quoted(start)?,
            Some('[') => self.range(start)?,
            Some(c) if !ends_word(c) => self.word(start)?,
            _ => return Err(SearchError::parse(&self.src[start..self.pos], "missing value after field")),
        };
        if field.is_none() {
            if let Value::Word(w) = &value {
                match w.as_str() {
                    "AND" => return Ok(Tok::And),
                    "OR" => return Ok(Tok::Or),
                    "NOT" => return Ok(Tok::Not),
                    _ => {}
                }
            }
        }
        Ok(Tok::Clause { field, value })
    }

    fn field_prefix(&mut self, start: usize) -> Result<Option<String>> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| ends_word(c) || matches!(c, '"' | '[' | ']' | ':'))
            .unwrap_or(rest.len());
        if !rest[len..].starts_with(':') {
            return Ok(None);
        }
        if len == 0 {
            return Err(SearchError::parse(&self.src[start..], "missing field name"));
        }
        let name = rest[..len].to_string();
        self.pos += len + 1;
        Ok(Some(name))
    }

    fn quoted(&mut self, start: usize) -> Result<Value> {
        self.bump();
        let Some(close) = self.rest().find('"') else {
            return Err(SearchError::parse(&self.src[start..], "unbalanced quote"));
        };
        let inner = self.rest()[..close].to_string();
        self.pos += close + 1;
        Ok(Value::Quoted(inner))
    }

    fn range(&mut self, start: usize) -> Result<Value> {
        self.bump();
        let rest = self.rest();
        let Some(close) = rest.find(']') else {
            return Err(SearchError::parse(&self.src[start..], "unbalanced range bracket"));
        };
        if rest[..close].contains('[') {
            return Err(SearchError::parse(&self.src[start..self.pos + close + 1], "nested range bracket"));
        }
        let inner = rest[..close].to_string();
        self.pos += close + 1;
        if self.peek().is_some_and(|c| !ends_word(c)) {
            return Err(SearchError::parse(&self.src[start..], "unexpected text after range"));
        }
        Ok(Value::Range(inner))
    }

    fn word(&mut self, start: usize) -> Result<Value> {
        let rest = self.rest();
        let len = rest.find(ends_word).unwrap_or(rest.len());
        let word = &rest[..len];
        self.pos += len;
        if word.contains(['[', ']']) {
            return Err(SearchError::parse(&self.src[start..self.pos], "unbalanced range bracket"));
        }
        Ok(Value::Word(word.to_string()))
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    schema: &'a Schema,
    default_field: Option<&'a FieldDef>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> { self.tokens.get(self.pos).map(|s| &s.tok) }

    fn fragment(&self, s: &Spanned) -> &'a str { &self.src[s.start..s.end] }

    fn dangling(&self) -> SearchError {
        let idx = self.pos.saturating_sub(1).min(self.tokens.len().saturating_sub(1));
        let frag = self.tokens.get(idx).map(|s| self.fragment(s)).unwrap_or(self.src);
        SearchError::parse(frag, "operator is missing an operand")
    }

    fn at_operand(&self) -> bool {
        matches!(self.peek(), Some(Tok::LParen | Tok::Not | Tok::Clause { .. }))
    }

    fn expr(&mut self) -> Result<Query> {
        let mut children = vec![self.and_expr()?];
        while self.peek() == Some(&Tok::Or) {
            self.pos += 1;
            if !self.at_operand() {
                return Err(self.dangling());
            }
            children.push(self.and_expr()?);
        }
        Ok(Query::or(children))
    }

    fn and_expr(&mut self) -> Result<Query> {
        let mut children = vec![self.unary()?];
        loop {
            match self.peek() {
                None | Some(Tok::Or | Tok::RParen) => break,
                Some(Tok::And) => {
                    self.pos += 1;
                    if !self.at_operand() {
                        return Err(self.dangling());
                    }
                    children.push(self.unary()?);
                }
                Some(_) => children.push(self.unary()?),
            }
        }
        Ok(Query::and(children))
    }

    fn unary(&mut self) -> Result<Query> {
        if self.peek() == Some(&Tok::Not) {
            self.pos += 1;
            if !self.at_operand() {
                return Err(self.dangling());
            }
            return Ok(Query::not(self.unary()?));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Query> {
        let Some(spanned) = self.tokens.get(self.pos) else {
            return Err(self.dangling());
        };
        let fragment = self.fragment(spanned);
        let start = spanned.start;
        match spanned.tok.clone() {
            Tok::LParen => {
                self.pos += 1;
                let inner = self.expr()?;
                if self.peek() != Some(&Tok::RParen) {
                    return Err(SearchError::parse(&self.src[start..], "unbalanced parenthesis"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Tok::RParen => Err(SearchError::parse(fragment, "unbalanced parenthesis")),
            Tok::And | Tok::Or | Tok::Not => Err(SearchError::parse(fragment, "operator is missing an operand")),
            Tok::Clause { field, value } => {
                self.pos += 1;
                self.clause(field.as_deref(), &value, fragment)
            }
        }
    }

    fn clause(&self, field: Option<&str>, value: &Value, fragment: &str) -> Result<Query> {
        let target = match field {
            Some(name) => Some(self.schema.resolve(name)?),
            None => self.default_field,
        };
        match target {
            Some(def) => field_clause(def, value, fragment),
            None => self.multi_field_clause(value, fragment),
        }
    }

    fn multi_field_clause(&self, value: &Value, fragment: &str) -> Result<Query> {
        let text = match value {
            Value::Word(w) | Value::Quoted(w) => w,
            Value::Range(_) => return Err(SearchError::parse(fragment, "range requires a numeric field")),
        };
        let mut alternatives = Vec::new();
        let mut any_default = false;
        for def in self.schema.default_fields() {
            any_default = true;
            let tokens = def.analyzer.analyze(text);
            if !tokens.is_empty() {
                alternatives.push(text_query(&def.name, tokens));
            }
        }
        if !any_default {
            return Err(SearchError::parse(fragment, "collection has no default search fields"));
        }
        if alternatives.is_empty() {
            return Err(SearchError::parse(fragment, "empty token set"));
        }
        Ok(Query::or(alternatives))
    }
}

fn field_clause(def: &FieldDef, value: &Value, fragment: &str) -> Result<Query> {
    if !def.indexed {
        return Err(SearchError::parse(fragment, format!("field `{}` is not indexed", def.name)));
    }
    match (def.kind, value) {
        (FieldKind::Numeric, Value::Range(inner)) => {
            let (low, high) = parse_range(inner, fragment)?;
            Ok(Query::range(&def.name, low, high))
        }
        (FieldKind::Numeric, Value::Word(w)) => {
            let n = parse_bound(w, fragment)?;
            Ok(Query::range(&def.name, n, n))
        }
        (FieldKind::Numeric, Value::Quoted(_)) => Err(SearchError::parse(fragment, "numeric field takes an integer or a range")),
        (kind, Value::Range(_)) => Err(SearchError::FieldKind { field: def.name.clone(), expected: "numeric", found: kind.name() }),
        (_, Value::Word(text) | Value::Quoted(text)) => {
            let tokens = def.analyzer.analyze(text);
            if tokens.is_empty() {
                return Err(SearchError::parse(fragment, "empty token set"));
            }
            Ok(text_query(&def.name, tokens))
        }
    }
}

fn text_query(field: &str, mut tokens: Vec<String>) -> Query {
    if tokens.len() == 1 {
        Query::Term { field: field.to_string(), token: tokens.remove(0) }
    } else {
        Query::Phrase { field: field.to_string(), tokens }
    }
}

fn parse_range(inner: &str, fragment: &str) -> Result<(i64, i64)> {
    let parts: Vec<&str> = inner.split_whitespace().collect();
    match parts.as_slice() {
        [low, "TO", high] => {
            let low = if *low == "*" { i64::MIN } else { parse_bound(low, fragment)? };
            let high = if *high == "*" { i64::MAX } else { parse_bound(high, fragment)? };
            Ok((low, high))
        }
        _ => Err(SearchError::parse(fragment, "expected [low TO high]")),
    }
}

fn parse_bound(s: &str, fragment: &str) -> Result<i64> {
    s.parse().map_err(|_| SearchError::parse(fragment, format!("`{s}` is not an integer")))
}
