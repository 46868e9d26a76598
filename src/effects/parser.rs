//! Expression Parser.
//!
//! Turns an effect string into independently executable units:
//!
//! ```text
//! effect   := unit ((',' | '\n') unit)*
//! unit     := conditional | wrapper | [target] body
//! target   := 'ME.' | 'OP.' | 'ALL.'
//! body     := attr op value
//!           | ('status' | 'ability') '.' verb '(' payload ')'
//!           | 'stacks.' status_id op value
//!           | card_attr ['.' selector] [op value]
//! wrapper  := trigger_keyword '(' effect ')'
//! conditional := 'if' '[' cond ']' '[' effect ']' ['[' effect ']']
//! ```
//!
//! Separators inside `()` or `[]` never split. A malformed unit becomes an
//! invalid expression; its siblings still parse.

use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::trace;

use super::attributes::{AttributeCategory, AttributeRegistry};
use super::expression::{EffectExpression, EffectValue, Operator, Target};
use crate::cards::CardSelector;
use crate::triggers::ability::{extract_trigger, is_trigger_keyword};

static VARIABLE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid path regex")
});

static ARITHMETIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.+\-*/()\s]+$").expect("valid arithmetic regex"));

/// Split an effect string into unit texts on top-level `,` and newlines.
#[must_use]
pub fn split_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' | '\n' if depth == 0 => {
                units.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    units.push(&text[start..]);

    units
        .into_iter()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .collect()
}

/// Parse an effect string into expressions, one per unit.
///
/// ```
/// use card_battle::effects::{parse_effect_string, AttributeRegistry, Target};
///
/// let units = parse_effect_string("OP.hp-6, ME.block+5", &AttributeRegistry::standard());
/// assert_eq!(units.len(), 2);
/// assert_eq!(units[0].target, Some(Target::Op));
/// assert_eq!(units[1].attribute, "block");
/// ```
#[must_use]
pub fn parse_effect_string(text: &str, registry: &AttributeRegistry) -> Vec<EffectExpression> {
    split_units(text)
        .into_iter()
        .map(|unit| parse_unit(unit, registry))
        .collect()
}

/// Parse a single unit. Never fails: errors yield an invalid expression.
#[must_use]
pub fn parse_unit(raw: &str, registry: &AttributeRegistry) -> EffectExpression {
    match parse_unit_inner(raw.trim(), registry) {
        Ok(mut expr) => {
            expr.description = Some(describe(&expr, registry));
            expr
        }
        Err(message) => {
            trace!(raw, %message, "invalid effect unit");
            EffectExpression::invalid(raw.trim(), message)
        }
    }
}

fn parse_unit_inner(text: &str, registry: &AttributeRegistry) -> Result<EffectExpression, String> {
    if let Some(rest) = text.strip_prefix("if") {
        if rest.trim_start().starts_with('[') {
            return parse_conditional(text, rest);
        }
    }

    let (target, body) = split_target(text);
    let (name, rest) = take_identifier(body).ok_or("expected an attribute name")?;
    let rest = rest.trim_start();

    if rest.starts_with('(') {
        return parse_wrapper(text, target, name, body);
    }

    let attribute = registry.canonical(name);
    let def = registry
        .get(attribute)
        .ok_or_else(|| format!("unknown attribute '{name}'"))?;

    let mut expr = EffectExpression::new(text, attribute);
    expr.target = target;

    match (def.category, attribute) {
        (AttributeCategory::Status, "status") => parse_status_verb(&mut expr, rest)?,
        (AttributeCategory::Status, _) => {
            let rest = rest
                .strip_prefix('.')
                .ok_or("expected 'stacks.<status id>'")?;
            let (status_id, rest) = take_identifier(rest).ok_or("expected a status id")?;
            expr.status_id = Some(status_id.to_string());
            let (op, value) = parse_op_value(rest)?;
            expr.operator = Some(op);
            expr.value = Some(value);
        }
        (AttributeCategory::Ability, _) => parse_ability_verb(&mut expr, rest)?,
        (AttributeCategory::Card, _) => parse_card(&mut expr, rest)?,
        (AttributeCategory::Special, _) => {
            return Err(format!("'{attribute}' needs its bracketed form"));
        }
        (AttributeCategory::Basic | AttributeCategory::Modifier, _) => {
            let (op, value) = parse_op_value(rest)?;
            expr.operator = Some(op);
            expr.value = Some(value);
        }
    }

    Ok(expr)
}

fn split_target(text: &str) -> (Option<Target>, &str) {
    for prefix in ["ME", "OP", "ALL"] {
        if let Some(rest) = text
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
        {
            return (Target::from_prefix(prefix), rest);
        }
    }
    (None, text)
}

/// Split a leading `[A-Za-z_][A-Za-z0-9_]*` off `text`.
fn take_identifier(text: &str) -> Option<(&str, &str)> {
    let first = text.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    Some((&text[..end], &text[end..]))
}

/// Content of a `( ... )` group that must span the rest of `text`.
fn parenthesized(text: &str) -> Result<&str, String> {
    let inner = text
        .trim()
        .strip_prefix('(')
        .ok_or("expected '('")?;
    let close = matching_close(inner, '(', ')').ok_or("unbalanced parentheses")?;
    if !inner[close + 1..].trim().is_empty() {
        return Err(format!("unexpected '{}' after ')'", inner[close + 1..].trim()));
    }
    Ok(inner[..close].trim())
}

/// Index of the bracket closing an already-opened group.
fn matching_close(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn parse_conditional(raw: &str, mut rest: &str) -> Result<EffectExpression, String> {
    let mut groups = Vec::new();
    loop {
        rest = rest.trim_start();
        let Some(inner) = rest.strip_prefix('[') else {
            break;
        };
        let close = matching_close(inner, '[', ']').ok_or("unbalanced '[' in conditional")?;
        groups.push(inner[..close].trim());
        rest = &inner[close + 1..];
    }

    if !rest.trim().is_empty() {
        return Err(format!("unexpected '{}' after conditional", rest.trim()));
    }
    let (condition, true_effect, false_effect) = match groups.as_slice() {
        [c, t] => (*c, *t, None),
        [c, t, f] => (*c, *t, Some(*f)),
        _ => return Err("conditional needs [condition][effect] or [condition][effect][else]".into()),
    };
    if condition.is_empty() {
        return Err("empty condition".into());
    }

    let mut expr = EffectExpression::new(raw, "if");
    expr.condition = Some(condition.to_string());
    expr.true_effect = Some(true_effect.to_string());
    expr.false_effect = false_effect.map(str::to_string);
    Ok(expr)
}

fn parse_wrapper(
    raw: &str,
    target: Option<Target>,
    name: &str,
    body: &str,
) -> Result<EffectExpression, String> {
    if !is_trigger_keyword(name) {
        return Err(format!("'{name}' is not a trigger keyword"));
    }
    let wrapped = body.trim();
    let inner = parenthesized(&wrapped[name.len()..])?;

    let mut expr = if name == "passive" {
        EffectExpression::new(raw, "passive")
    } else {
        let mut expr = EffectExpression::new(raw, "ability");
        expr.operator = Some(Operator::Add);
        expr
    };
    expr.target = target;
    expr.prefix = Some(name.to_string());
    expr.value = Some(EffectValue::Text(if name == "passive" {
        inner.to_string()
    } else {
        wrapped.to_string()
    }));
    Ok(expr)
}

fn take_verb(rest: &str) -> Result<(Operator, &str), String> {
    let rest = rest.strip_prefix('.').ok_or("expected '.<verb>(...)'")?;
    let (verb, rest) = take_identifier(rest).ok_or("expected a verb")?;
    let op = Operator::from_verb(verb).ok_or_else(|| format!("unknown verb '{verb}'"))?;
    Ok((op, parenthesized(rest)?))
}

fn parse_status_verb(expr: &mut EffectExpression, rest: &str) -> Result<(), String> {
    let (op, payload) = take_verb(rest)?;
    if !matches!(op, Operator::Apply | Operator::Remove) {
        return Err(format!("status does not support '{op}'"));
    }
    let (id, amount, duration) = parse_status_payload(payload)?;
    expr.operator = Some(op);
    expr.status_id = Some(id.to_string());
    expr.value = amount;
    expr.duration = duration;
    Ok(())
}

/// Split a status payload: `id`, `id N`, `id:N`, optionally `id N D`.
fn parse_status_payload(payload: &str) -> Result<(&str, Option<EffectValue>, Option<u32>), String> {
    let (id, tail) = match payload.split_once(':') {
        Some((id, tail)) => (id.trim(), tail.trim()),
        None => match payload.split_once(char::is_whitespace) {
            Some((id, tail)) => (id.trim(), tail.trim()),
            None => (payload.trim(), ""),
        },
    };
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!("invalid status id '{id}'"));
    }

    let mut tokens = tail.split_whitespace();
    let amount = tokens.next().map(classify_value).transpose()?;
    let duration = tokens
        .next()
        .map(|d| {
            d.parse::<u32>()
                .map_err(|_| format!("invalid status duration '{d}'"))
        })
        .transpose()?;
    if let Some(extra) = tokens.next() {
        return Err(format!("unexpected '{extra}' in status payload"));
    }
    Ok((id, amount, duration))
}

fn parse_ability_verb(expr: &mut EffectExpression, rest: &str) -> Result<(), String> {
    let (op, payload) = take_verb(rest)?;
    match op {
        Operator::Add => {
            let (name, _) = extract_trigger(payload)
                .ok_or_else(|| format!("ability '{payload}' is not of the form trigger(...)"))?;
            if !is_trigger_keyword(name) {
                return Err(format!("'{name}' is not a trigger keyword"));
            }
            expr.prefix = Some(name.to_string());
        }
        Operator::Remove if payload.is_empty() => {
            return Err("ability.remove needs a trigger or ability id".into());
        }
        Operator::Remove => {}
        other => return Err(format!("ability does not support '{other}'")),
    }
    expr.operator = Some(op);
    expr.value = Some(EffectValue::Text(payload.to_string()));
    Ok(())
}

fn parse_card(expr: &mut EffectExpression, rest: &str) -> Result<(), String> {
    let rest = match rest.strip_prefix('.') {
        Some(selector_text) => {
            let (selector, rest) = CardSelector::parse_prefix(selector_text)?;
            expr.selector = Some(selector);
            rest
        }
        None => rest,
    };

    if rest.trim().is_empty() {
        if expr.selector.is_none() {
            return Err(format!("'{}' needs a selector or a value", expr.attribute));
        }
        if expr.attribute == "cost" {
            return Err("cost needs an operator and value".into());
        }
        return Ok(());
    }

    let (op, value) = parse_op_value(rest)?;
    expr.operator = Some(op);
    expr.value = Some(value);
    Ok(())
}

fn parse_op_value(rest: &str) -> Result<(Operator, EffectValue), String> {
    let rest = rest.trim();
    let mut chars = rest.chars();
    let symbol = chars.next().ok_or("expected an operator")?;
    let op = Operator::from_symbol(symbol).ok_or_else(|| format!("unknown operator '{symbol}'"))?;
    let value = chars.as_str().trim();
    if value.is_empty() {
        return Err(format!("missing value after '{symbol}'"));
    }
    Ok((op, classify_value(value)?))
}

/// Decide once whether a value is a literal, a variable or arithmetic.
pub fn classify_value(text: &str) -> Result<EffectValue, String> {
    let text = text.trim();
    let looks_numeric = text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'));
    if looks_numeric {
        if let Ok(n) = text.parse::<f64>() {
            if n.is_finite() {
                return Ok(EffectValue::Literal(n));
            }
        }
    }
    if VARIABLE_PATH.is_match(text) {
        return Ok(EffectValue::VariableRef(text.to_string()));
    }
    if ARITHMETIC.is_match(text) {
        return Ok(EffectValue::Expression(text.to_string()));
    }
    Err(format!("invalid value '{text}'"))
}

fn describe(expr: &EffectExpression, registry: &AttributeRegistry) -> String {
    if let (Some(cond), Some(then)) = (&expr.condition, &expr.true_effect) {
        return match &expr.false_effect {
            Some(otherwise) => format!("if {cond}: {then}; otherwise {otherwise}"),
            None => format!("if {cond}: {then}"),
        };
    }

    let display = registry
        .get(&expr.attribute)
        .map_or(expr.attribute.as_str(), |d| d.display_name.as_str());
    let target = expr.target.map_or(String::new(), |t| format!("{t} "));
    let value = expr.value.as_ref().map_or(String::new(), ToString::to_string);

    match (expr.operator, &expr.status_id) {
        (Some(Operator::Apply), Some(id)) if value.is_empty() => format!("{target}apply {id}"),
        (Some(Operator::Apply), Some(id)) => format!("{target}apply {value} {id}"),
        (Some(Operator::Remove), Some(id)) => format!("{target}remove {id}"),
        (Some(op), Some(id)) => format!("{target}{id} stacks {op}{value}"),
        (Some(Operator::Add), None) => format!("{target}gain ability {value}"),
        (Some(Operator::Remove), None) => format!("{target}lose ability {value}"),
        (Some(op), None) => format!("{target}{display} {op}{value}"),
        (None, _) => format!("{target}{display} {value}").trim_end().to_string(),
    }
}

/// Parse results keyed by raw effect text.
///
/// Effect strings are immutable once authored, so entries never go stale.
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: FxHashMap<String, Rc<[EffectExpression]>>,
    hits: u64,
    misses: u64,
}

impl ParseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed units for `text`, parsing on first use.
    pub fn parse(&mut self, text: &str, registry: &AttributeRegistry) -> Rc<[EffectExpression]> {
        if let Some(units) = self.entries.get(text) {
            self.hits += 1;
            return Rc::clone(units);
        }
        self.misses += 1;
        let units: Rc<[EffectExpression]> = parse_effect_string(text, registry).into();
        self.entries.insert(text.to_string(), Rc::clone(&units));
        units
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
