//! # Condition Expressions
//!
//! The expression language of `{{#if ...}}` blocks:
//!
//! ```text
//! condition   := disjunction ( "and" disjunction )*
//! disjunction := negation ( "or" negation )*
//! negation    := "not" negation | atom
//! atom        := PATH ".includes(" STRING ")"
//!              | operand OP operand          OP: >= <= != == > <
//!              | PATH
//! operand     := STRING | NUMBER | "true" | "false" | PATH
//! ```
//!
//! `and` binds loosest: `a or b and c` is `(a or b) and c`. There is no
//! grouping with parentheses. Keywords match case-insensitively as whole
//! words outside quoted strings.
//!
//! Evaluation never fails. Anything that does not parse evaluates to
//! `false`, as do comparisons between values of different kinds (except
//! `!=`, which is `true`).

use std::cmp::Ordering;

use serde_json::Value;

use crate::profile::ClientProfile;
use crate::value::{compare_values, is_truthy, values_equal};

const INCLUDES_SUFFIX: &str = ".includes";

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Ge,
    Le,
    Ne,
    Eq,
    Gt,
    Lt,
}

impl CompareOp {
    /// Longest operators first so `>=` is never read as `>`.
    const ALL: [(&'static str, CompareOp); 6] = [
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
        ("!=", CompareOp::Ne),
        ("==", CompareOp::Eq),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
    ];

    fn apply(self, left: &Value, right: &Value) -> bool {
        match self {
            Self::Eq => values_equal(left, right),
            Self::Ne => !values_equal(left, right),
            Self::Gt => compare_values(left, right) == Some(Ordering::Greater),
            Self::Lt => compare_values(left, right) == Some(Ordering::Less),
            Self::Ge => matches!(
                compare_values(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Le => matches!(
                compare_values(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Variable(String),
}

impl Operand {
    fn from_word(word: &str) -> Self {
        let number = if word.contains('.') {
            word.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
        } else {
            word.parse::<i64>().ok().map(Value::from)
        };
        if let Some(n) = number {
            return Self::Literal(n);
        }
        if word.eq_ignore_ascii_case("true") {
            return Self::Literal(Value::Bool(true));
        }
        if word.eq_ignore_ascii_case("false") {
            return Self::Literal(Value::Bool(false));
        }
        Self::Variable(word.to_string())
    }

    fn resolve(&self, client: &ClientProfile) -> Value {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Variable(name) => client.get(name).unwrap_or(Value::Null),
        }
    }
}

/// Parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    All(Vec<Expr>),
    Any(Vec<Expr>),
    Not(Box<Expr>),
    Includes { list: String, value: String },
    Compare { left: Operand, op: CompareOp, right: Operand },
    Truthy(String),
    /// Unparseable input; always false.
    Invalid,
}

impl Expr {
    pub fn parse(source: &str) -> Self {
        Parser::new(tokenize(source)).condition()
    }

    pub fn evaluate(&self, client: &ClientProfile) -> bool {
        match self {
            Self::All(parts) => parts.iter().all(|p| p.evaluate(client)),
            Self::Any(parts) => parts.iter().any(|p| p.evaluate(client)),
            Self::Not(inner) => !inner.evaluate(client),
            Self::Includes { list, value } => match client.get(list) {
                Some(Value::Array(items)) => items.iter().any(|i| i.as_str() == Some(value.as_str())),
                _ => false,
            },
            Self::Compare { left, op, right } => {
                op.apply(&left.resolve(client), &right.resolve(client))
            }
            Self::Truthy(name) => client.get(name).is_some_and(|v| is_truthy(&v)),
            Self::Invalid => false,
        }
    }
}

/// Parse and evaluate in one step.
pub fn evaluate_condition(source: &str, client: &ClientProfile) -> bool {
    Expr::parse(source).evaluate(client)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Op(CompareOp),
    LParen,
    RParen,
    And,
    Or,
    Not,
    Stray(char),
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    'outer: while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '"' || c == '\'' {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && chars[end] != c {
                end += 1;
            }
            tokens.push(Token::Str(chars[start..end].iter().collect()));
            i = end + 1;
            continue;
        }
        for (text, op) in CompareOp::ALL {
            let len = text.chars().count();
            if chars[i..].iter().take(len).copied().eq(text.chars()) {
                tokens.push(Token::Op(op));
                i += len;
                continue 'outer;
            }
        }
        if c == '(' || c == ')' {
            tokens.push(if c == '(' { Token::LParen } else { Token::RParen });
            i += 1;
            continue;
        }
        if is_word_char(c) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(match word.to_ascii_lowercase().as_str() {
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                _ => Token::Word(word),
            });
            continue;
        }
        tokens.push(Token::Stray(c));
        i += 1;
    }
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn condition(&mut self) -> Expr {
        let mut parts = vec![self.disjunction()];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            parts.push(self.disjunction());
        }
        collapse(parts, Expr::All)
    }

    fn disjunction(&mut self) -> Expr {
        let mut parts = vec![self.negation()];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            parts.push(self.negation());
        }
        collapse(parts, Expr::Any)
    }

    fn negation(&mut self) -> Expr {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Expr::Not(Box::new(self.negation()));
        }
        self.atom()
    }

    /// Consume tokens up to the next `and`/`or` and interpret them.
    fn atom(&mut self) -> Expr {
        let start = self.pos;
        while let Some(token) = self.peek() {
            if matches!(token, Token::And | Token::Or) {
                break;
            }
            self.pos += 1;
        }
        interpret_atom(&self.tokens[start..self.pos])
    }
}

fn collapse(mut parts: Vec<Expr>, combine: fn(Vec<Expr>) -> Expr) -> Expr {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        combine(parts)
    }
}

fn interpret_atom(tokens: &[Token]) -> Expr {
    match tokens {
        [Token::Word(call), Token::LParen, Token::Str(value), Token::RParen] => {
            match call.strip_suffix(INCLUDES_SUFFIX) {
                Some(list) if !list.is_empty() => Expr::Includes {
                    list: list.to_string(),
                    value: value.clone(),
                },
                _ => Expr::Invalid,
            }
        }
        [left, Token::Op(op), right] => match (operand(left), operand(right)) {
            (Some(left), Some(right)) => Expr::Compare {
                left,
                op: *op,
                right,
            },
            _ => Expr::Invalid,
        },
        [Token::Word(name)] => Expr::Truthy(name.clone()),
        _ => Expr::Invalid,
    }
}

fn operand(token: &Token) -> Option<Operand> {
    match token {
        Token::Str(s) => Some(Operand::Literal(Value::String(s.clone()))),
        Token::Word(w) => Some(Operand::from_word(w)),
        _ => None,
    }
}
