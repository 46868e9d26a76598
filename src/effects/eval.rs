//! Sandboxed arithmetic and condition evaluation.
//!
//! Both evaluators take text whose variables are already substituted by
//! numbers. Anything outside the character whitelist is rejected before
//! tokenizing, and every failure degrades to a safe default (`0` / `false`)
//! with a warning. Effect text is partly AI-authored and is never handed to
//! a general-purpose interpreter.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{trace, warn};

static ARITHMETIC_WHITELIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-*/.()\s]+$").expect("valid whitelist"));

static CONDITION_WHITELIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-*/.()\s<>=!&|]+$").expect("valid whitelist"));

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let next = bytes.get(i + 1).copied();
        let next2 = bytes.get(i + 2).copied();
        let (token, width) = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let literal = &text[start..i];
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| format!("bad number '{literal}'"))?;
                tokens.push(Token::Num(n));
                continue;
            }
            b'+' => (Token::Plus, 1),
            b'-' => (Token::Minus, 1),
            b'*' => (Token::Star, 1),
            b'/' => (Token::Slash, 1),
            b'(' => (Token::LParen, 1),
            b')' => (Token::RParen, 1),
            b'<' if next == Some(b'=') => (Token::Le, 2),
            b'<' => (Token::Lt, 1),
            b'>' if next == Some(b'=') => (Token::Ge, 2),
            b'>' => (Token::Gt, 1),
            b'=' if next == Some(b'=') && next2 == Some(b'=') => (Token::Eq, 3),
            b'=' if next == Some(b'=') => (Token::Eq, 2),
            b'!' if next == Some(b'=') && next2 == Some(b'=') => (Token::Ne, 3),
            b'!' if next == Some(b'=') => (Token::Ne, 2),
            b'!' => (Token::Not, 1),
            b'&' if next == Some(b'&') => (Token::And, 2),
            b'|' if next == Some(b'|') => (Token::Or, 2),
            other => return Err(format!("unexpected '{}'", other as char)),
        };
        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Value {
    Num(f64),
    Bool(bool),
}

impl Value {
    fn num(self) -> Result<f64, String> {
        match self {
            Value::Num(n) => Ok(n),
            Value::Bool(_) => Err("expected a number, found a boolean".into()),
        }
    }

    fn bool(self) -> Result<bool, String> {
        match self {
            Value::Bool(b) => Ok(b),
            Value::Num(_) => Err("expected a boolean, found a number".into()),
        }
    }
}

/// Pratt parser evaluating directly over the token stream.
struct Evaluator {
    tokens: Vec<Token>,
    pos: usize,
}

impl Evaluator {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn run(mut self) -> Result<Value, String> {
        let value = self.expr(0)?;
        match self.peek() {
            None => Ok(value),
            Some(t) => Err(format!("unexpected trailing {t:?}")),
        }
    }

    fn binding_power(token: Token) -> Option<u8> {
        Some(match token {
            Token::Or => 1,
            Token::And => 2,
            Token::Eq | Token::Ne => 3,
            Token::Lt | Token::Le | Token::Gt | Token::Ge => 4,
            Token::Plus | Token::Minus => 5,
            Token::Star | Token::Slash => 6,
            _ => return None,
        })
    }

    fn expr(&mut self, min_bp: u8) -> Result<Value, String> {
        let mut lhs = self.prefix()?;

        while let Some(op) = self.peek() {
            let Some(bp) = Self::binding_power(op) else {
                break;
            };
            if bp <= min_bp {
                break;
            }
            self.bump();
            let rhs = self.expr(bp)?;
            lhs = Self::binary(op, lhs, rhs)?;
        }

        Ok(lhs)
    }

    fn prefix(&mut self) -> Result<Value, String> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(Value::Num(n)),
            Some(Token::Minus) => Ok(Value::Num(-self.expr(6)?.num()?)),
            Some(Token::Plus) => Ok(Value::Num(self.expr(6)?.num()?)),
            Some(Token::Not) => Ok(Value::Bool(!self.expr(6)?.bool()?)),
            Some(Token::LParen) => {
                let inner = self.expr(0)?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("missing ')'".into()),
                }
            }
            Some(t) => Err(format!("unexpected {t:?}")),
            None => Err("unexpected end of input".into()),
        }
    }

    fn binary(op: Token, lhs: Value, rhs: Value) -> Result<Value, String> {
        Ok(match op {
            Token::Plus => Value::Num(lhs.num()? + rhs.num()?),
            Token::Minus => Value::Num(lhs.num()? - rhs.num()?),
            Token::Star => Value::Num(lhs.num()? * rhs.num()?),
            Token::Slash => {
                let divisor = rhs.num()?;
                if divisor == 0.0 {
                    return Err("division by zero".into());
                }
                Value::Num(lhs.num()? / divisor)
            }
            Token::Lt => Value::Bool(lhs.num()? < rhs.num()?),
            Token::Le => Value::Bool(lhs.num()? <= rhs.num()?),
            Token::Gt => Value::Bool(lhs.num()? > rhs.num()?),
            Token::Ge => Value::Bool(lhs.num()? >= rhs.num()?),
            Token::Eq => Value::Bool(lhs == rhs),
            Token::Ne => Value::Bool(lhs != rhs),
            Token::And => Value::Bool(lhs.bool()? && rhs.bool()?),
            Token::Or => Value::Bool(lhs.bool()? || rhs.bool()?),
            other => return Err(format!("{other:?} is not a binary operator")),
        })
    }
}

fn evaluate(text: &str, whitelist: &Regex) -> Result<Value, String> {
    if !whitelist.is_match(text) {
        return Err("contains disallowed characters".into());
    }
    let tokens = tokenize(text)?;
    Evaluator { tokens, pos: 0 }.run()
}

/// Evaluate substituted arithmetic without rounding.
///
/// Returns `None` on any failure.
#[must_use]
pub fn evaluate_number(text: &str) -> Option<f64> {
    match evaluate(text, &ARITHMETIC_WHITELIST).and_then(Value::num) {
        Ok(n) if n.is_finite() => Some(n),
        Ok(n) => {
            warn!(expression = text, result = n, "arithmetic produced a non-finite value");
            None
        }
        Err(reason) => {
            warn!(expression = text, %reason, "arithmetic evaluation failed");
            None
        }
    }
}

/// Evaluate substituted arithmetic, floored to an integer. Fails safe to 0.
///
/// ```
/// use card_battle::effects::evaluate_arithmetic;
///
/// assert_eq!(evaluate_arithmetic("(3+4)*2/3"), 4.0);
/// assert_eq!(evaluate_arithmetic("alert(1)"), 0.0);
/// ```
#[must_use]
pub fn evaluate_arithmetic(text: &str) -> f64 {
    let result = evaluate_number(text).map_or(0.0, f64::floor);
    trace!(expression = text, result, "arithmetic");
    result
}

/// Replace full-width comparison glyphs by their ASCII forms.
#[must_use]
pub fn normalize_comparisons(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '≥' => out.push_str(">="),
            '≤' => out.push_str("<="),
            '≠' => out.push_str("!="),
            '＝' => out.push('='),
            '＞' => out.push('>'),
            '＜' => out.push('<'),
            '！' => out.push('!'),
            '（' => out.push('('),
            '）' => out.push(')'),
            other => out.push(other),
        }
    }
    out
}

const PLACEHOLDERS: [(&str, char); 6] = [
    ("===", '\u{E000}'),
    ("!==", '\u{E001}'),
    ("==", '\u{E002}'),
    ("!=", '\u{E003}'),
    ("<=", '\u{E004}'),
    (">=", '\u{E005}'),
];

/// Promote single `=` to `===` without touching multi-character operators.
///
/// Multi-character operators are first swapped for private-use
/// placeholders, lone `=` is rewritten, then the placeholders are restored.
#[must_use]
pub fn promote_equality(text: &str) -> String {
    let mut masked = text.to_string();
    for (op, placeholder) in PLACEHOLDERS {
        masked = masked.replace(op, &placeholder.to_string());
    }
    let mut promoted = masked.replace('=', "===");
    for (op, placeholder) in PLACEHOLDERS {
        promoted = promoted.replace(placeholder, op);
    }
    promoted
}

/// Evaluate a substituted condition. Fails safe to `false`.
///
/// ```
/// use card_battle::effects::evaluate_condition;
///
/// assert!(evaluate_condition("5 ≥ 3 && 2 = 2"));
/// assert!(!evaluate_condition("5 + 1"));
/// ```
#[must_use]
pub fn evaluate_condition(text: &str) -> bool {
    let normalized = promote_equality(&normalize_comparisons(text));
    match evaluate(&normalized, &CONDITION_WHITELIST).and_then(Value::bool) {
        Ok(result) => {
            trace!(condition = text, result, "condition");
            result
        }
        Err(reason) => {
            warn!(condition = text, %reason, "condition evaluation failed");
            false
        }
    }
}
