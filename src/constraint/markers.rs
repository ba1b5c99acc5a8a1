//! Environment markers on PyPI requirements
//!
//! A requirement such as `pywin32>=300; sys_platform == "win32"` only
//! applies on some runtimes. Clauses on the interpreter version are
//! evaluated against the configured target; an `extra` clause marks an
//! optional dependency and always drops the edge. Other marker variables
//! are treated as satisfied.

use std::cmp::Ordering;
use tracing::warn;

use crate::error::ConfigError;
use crate::version::ParsedVersion;

/// Default interpreter version requirements are evaluated against
pub const DEFAULT_PYTHON: &str = "3.10";

/// Runtime axis that environment markers are evaluated against
#[derive(Debug, Clone)]
pub struct RuntimeTarget {
    raw: String,
    python: ParsedVersion,
}

impl RuntimeTarget {
    /// Target a Python interpreter version such as `3.11`
    pub fn python(version: &str) -> Result<Self, ConfigError> {
        let python = ParsedVersion::parse(version).ok_or_else(|| ConfigError::InvalidRuntime {
            value: version.to_string(),
        })?;
        Ok(Self {
            raw: version.trim().to_string(),
            python,
        })
    }

    /// The configured interpreter version
    pub fn python_version(&self) -> &str {
        &self.raw
    }
}

impl Default for RuntimeTarget {
    fn default() -> Self {
        Self {
            raw: DEFAULT_PYTHON.to_string(),
            python: ParsedVersion::from_release(vec![3, 10]),
        }
    }
}

/// Verdict on a marker expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerVerdict {
    /// The requirement applies to the target runtime
    Applies,
    /// The requirement does not apply; the edge is dropped
    Excluded(String),
}

/// Split a raw requirement into its constraint and its marker expression
pub fn split_marker(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once(';') {
        Some((body, marker)) if !marker.trim().is_empty() => (body, Some(marker.trim())),
        Some((body, _)) => (body, None),
        None => (raw, None),
    }
}

/// Evaluate a marker expression against the runtime target
///
/// `and` binds tighter than `or`; parentheses group. A marker that does not
/// parse is assumed to apply unless it mentions `extra`.
pub fn evaluate(marker: &str, runtime: &RuntimeTarget) -> MarkerVerdict {
    let marker = marker.to_ascii_lowercase();
    let Some(expr) = parse(&marker) else {
        if marker.contains("extra") {
            return MarkerVerdict::Excluded(format!("optional extra ({})", marker));
        }
        warn!(marker = %marker, "malformed environment marker, assuming it applies");
        return MarkerVerdict::Applies;
    };

    if expr.mentions("extra") {
        MarkerVerdict::Excluded(format!("optional extra ({})", marker))
    } else if expr.holds(runtime) {
        MarkerVerdict::Applies
    } else {
        MarkerVerdict::Excluded(format!(
            "marker '{}' excludes python {}",
            marker, runtime.raw
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Word(String),
    Quoted(String),
    Op(String),
}

fn tokenize(marker: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = marker.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(q) if q == c => break,
                        Some(ch) => text.push(ch),
                        None => return None,
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            '=' | '!' | '<' | '>' | '~' => {
                let mut op = String::new();
                while let Some(&ch) = chars.peek() {
                    if !matches!(ch, '=' | '!' | '<' | '>' | '~') {
                        break;
                    }
                    op.push(ch);
                    chars.next();
                }
                tokens.push(Token::Op(op));
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if !(ch.is_alphanumeric() || matches!(ch, '_' | '.' | '-' | '*')) {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                if word.is_empty() {
                    return None;
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Some(tokens)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Variable(String),
    Literal(String),
}

/// Parsed marker expression
#[derive(Debug, Clone, PartialEq, Eq)]
enum MarkerExpr {
    Any(Vec<MarkerExpr>),
    All(Vec<MarkerExpr>),
    Compare { left: Operand, op: String, right: Operand },
}

impl MarkerExpr {
    fn holds(&self, runtime: &RuntimeTarget) -> bool {
        match self {
            MarkerExpr::Any(alternatives) => alternatives.iter().any(|e| e.holds(runtime)),
            MarkerExpr::All(clauses) => clauses.iter().all(|e| e.holds(runtime)),
            MarkerExpr::Compare {
                left: Operand::Variable(variable),
                op,
                right: Operand::Literal(value),
            } if variable == "python_version" || variable == "python_full_version" => {
                python_holds(op, value, runtime)
            }
            MarkerExpr::Compare { .. } => true,
        }
    }

    fn mentions(&self, variable: &str) -> bool {
        match self {
            MarkerExpr::Any(items) | MarkerExpr::All(items) => items.iter().any(|e| e.mentions(variable)),
            MarkerExpr::Compare { left, right, .. } => [left, right]
                .into_iter()
                .any(|operand| matches!(operand, Operand::Variable(v) if v == variable)),
        }
    }
}

/// Recursive descent over `or` / `and` / parenthesized groups
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn keyword(&mut self, word: &str) -> bool {
        let found = matches!(self.tokens.get(self.pos), Some(Token::Word(w)) if w == word);
        if found {
            self.pos += 1;
        }
        found
    }

    fn any(&mut self) -> Option<MarkerExpr> {
        let mut alternatives = vec![self.all()?];
        while self.keyword("or") {
            alternatives.push(self.all()?);
        }
        Some(MarkerExpr::Any(alternatives))
    }

    fn all(&mut self) -> Option<MarkerExpr> {
        let mut clauses = vec![self.atom()?];
        while self.keyword("and") {
            clauses.push(self.atom()?);
        }
        Some(MarkerExpr::All(clauses))
    }

    fn atom(&mut self) -> Option<MarkerExpr> {
        if self.tokens.get(self.pos) == Some(&Token::Open) {
            self.pos += 1;
            let inner = self.any()?;
            return (self.advance()? == Token::Close).then_some(inner);
        }
        let left = self.operand()?;
        let op = self.operator()?;
        let right = self.operand()?;
        Some(MarkerExpr::Compare { left, op, right })
    }

    fn operand(&mut self) -> Option<Operand> {
        match self.advance()? {
            Token::Word(w) if w != "and" && w != "or" => Some(Operand::Variable(w)),
            Token::Quoted(q) => Some(Operand::Literal(q)),
            _ => None,
        }
    }

    fn operator(&mut self) -> Option<String> {
        match self.advance()? {
            Token::Op(op) => Some(op),
            Token::Word(w) if w == "in" => Some(w),
            Token::Word(w) if w == "not" => self.keyword("in").then(|| "not in".to_string()),
            _ => None,
        }
    }
}

fn parse(marker: &str) -> Option<MarkerExpr> {
    let mut parser = Parser {
        tokens: tokenize(marker)?,
        pos: 0,
    };
    let expr = parser.any()?;
    (parser.pos == parser.tokens.len()).then_some(expr)
}

fn python_holds(op: &str, value: &str, runtime: &RuntimeTarget) -> bool {
    let value = value.trim();
    let target = &runtime.python;

    match op {
        "in" | "not in" => {
            let listed = value
                .split([' ', ','])
                .filter(|v| !v.is_empty())
                .filter_map(ParsedVersion::parse)
                .any(|v| v.cmp_release(target) == Ordering::Equal);
            listed == (op == "in")
        }
        _ if value.ends_with(".*") => {
            let prefix: Vec<u64> = value
                .trim_end_matches(".*")
                .split('.')
                .filter_map(|p| p.parse().ok())
                .collect();
            let matched = target.has_release_prefix(&prefix);
            if op == "!=" {
                !matched
            } else {
                matched
            }
        }
        _ => {
            let Some(bound) = ParsedVersion::parse(value) else {
                return true;
            };
            let ordering = target.cmp(&bound);
            match op {
                "==" | "===" => ordering == Ordering::Equal,
                "!=" => ordering != Ordering::Equal,
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                ">" => ordering == Ordering::Greater,
                ">=" => ordering != Ordering::Less,
                "~=" => ordering != Ordering::Less && target.has_release_prefix(&compatible_prefix(&bound)),
                _ => true,
            }
        }
    }
}

fn compatible_prefix(bound: &ParsedVersion) -> Vec<u64> {
    let len = bound.release.len();
    bound.release[..len.saturating_sub(1).max(1)].to_vec()
}
