//! Reader for the nested literal syntax used by `.gyp` / `.gypi` files.
//!
//! A build description is a single literal expression built from:
//!
//! - mappings with string keys: `{'target_name': 'uv', 'sources': [...]}`
//! - sequences: `['a.c', 'b.c',]` (trailing commas allowed)
//! - single- or double-quoted strings, adjacent literals concatenated
//! - integers, `True`, `False`, `None`
//! - `#` line comments
//!
//! The text is only ever *read*; nothing inside it is executed.

use chumsky::prelude::*;
use chumsky::text;

use crate::error::{GypError, Result};

pub(crate) type Extra<'a> = extra::Err<Rich<'a, char>>;

// ═══════════════════════════════════════════════════════════════════════════════
//  Value tree
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    None,
    List(Vec<Value>),
    Dict(Dict),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::None => "None",
            Value::List(_) => "list",
            Value::Dict(_) => "mapping",
        }
    }
}

/// An insertion-ordered mapping.
///
/// Re-inserting an existing key keeps the key's original position and
/// replaces its value, the same way a mapping literal with a repeated key
/// behaves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(String, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, Value)> for Dict {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

impl<'a> IntoIterator for &'a Dict {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Shared token parsers
// ═══════════════════════════════════════════════════════════════════════════════

/// An identifier-shaped word: `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn word<'a>() -> impl Parser<'a, &'a str, &'a str, Extra<'a>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated(),
        )
        .to_slice()
}

/// A single- or double-quoted string with backslash escapes.
///
/// `\\`, `\'`, `\"`, `\n`, `\t` and `\r` are translated and a backslash at
/// the end of a line joins it with the next. Any other escape is kept as
/// written, backslash included.
pub(crate) fn string_literal<'a>() -> impl Parser<'a, &'a str, String, Extra<'a>> + Clone {
    let escape = just('\\').ignore_then(choice((
        one_of("\\'\"").map(String::from),
        just('n').to("\n".to_string()),
        just('t').to("\t".to_string()),
        just('r').to("\r".to_string()),
        just("\r\n").or(just("\n")).to(String::new()),
        any().map(|c: char| format!("\\{c}")),
    )));

    let quoted = move |quote: char, stop: &'static str| {
        none_of(stop)
            .repeated()
            .at_least(1)
            .to_slice()
            .map(str::to_string)
            .or(escape.clone())
            .repeated()
            .collect::<Vec<String>>()
            .map(|parts| parts.concat())
            .delimited_by(just(quote), just(quote))
    };

    quoted('\'', "\\'").or(quoted('"', "\\\""))
}

/// A decimal integer with an optional leading minus sign.
pub(crate) fn integer<'a>() -> impl Parser<'a, &'a str, i64, Extra<'a>> + Clone {
    just('-')
        .or_not()
        .then(text::int(10))
        .to_slice()
        .try_map(|s: &str, span| s.parse::<i64>().map_err(|e| Rich::custom(span, e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Document literal parser
// ═══════════════════════════════════════════════════════════════════════════════

fn literal_parser<'a>() -> impl Parser<'a, &'a str, Value, Extra<'a>> {
    // Whitespace and `#` comments may appear between any two tokens.
    let comment = just('#').then(none_of("\r\n").repeated()).ignored();
    let blank = comment.or(one_of(" \t\r\n").ignored()).repeated();

    let value = recursive(move |value| {
        let string = string_literal()
            .separated_by(blank.clone())
            .at_least(1)
            .collect::<Vec<String>>()
            .map(|parts| Value::Str(parts.concat()));

        let number = integer().map(Value::Int);

        let constant = word().try_map(|w: &str, span| match w {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::None),
            other => Err(Rich::custom(span, format!("unexpected name '{other}'"))),
        });

        let list = value
            .clone()
            .separated_by(just(','))
            .allow_trailing()
            .collect::<Vec<Value>>()
            .delimited_by(just('['), blank.clone().then(just(']')))
            .map(Value::List);

        let entry = string_literal()
            .delimited_by(blank.clone(), blank.clone())
            .then_ignore(just(':'))
            .then(value);

        let dict = entry
            .separated_by(just(','))
            .allow_trailing()
            .collect::<Vec<(String, Value)>>()
            .delimited_by(just('{'), blank.clone().then(just('}')))
            .map(|entries| Value::Dict(entries.into_iter().collect()));

        choice((dict, list, string, number, constant)).delimited_by(blank.clone(), blank)
    });

    value.then_ignore(end())
}

/// Parse a complete literal document into a [`Value`] tree.
pub fn parse_literal(input: &str) -> Result<Value> {
    literal_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            GypError::Malformed(messages.join("; "))
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
