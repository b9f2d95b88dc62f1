//! GYP condition parser and evaluator.
//!
//! Parses and evaluates the predicate strings found at the head of each
//! entry in a `conditions` list, for example:
//!
//! - `OS=="win"`
//! - `OS!="win" and library=="static_library"`
//! - `OS in "mac ios"` / `OS not in ["win", "mac"]`
//!
//! Uses [`chumsky`] for the parsing grammar. Only comparisons, membership and
//! boolean connectives are understood; the predicate is never run as code.
//!
//! ## Grammar
//!
//! ```text
//! or_expr    = and_expr ('or' and_expr)*
//! and_expr   = not_expr ('and' not_expr)*
//! not_expr   = 'not' not_expr | comparison
//! comparison = operand (('==' | '!=' | 'in' | 'not' 'in') operand)?
//! operand    = string | int | 'True' | 'False' | name
//!            | '[' (or_expr ',')* ']' | '(' or_expr ')'
//! ```

use std::collections::HashMap;

use chumsky::prelude::*;
use chumsky::text;

use crate::error::{GypError, Result};
use crate::literal::{Extra, integer, string_literal, word};

/// Words that can never be variable names.
const KEYWORDS: &[&str] = &["and", "or", "not", "in", "True", "False", "None"];

// ═══════════════════════════════════════════════════════════════════════════════
//  AST
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `'text'` or `"text"`.
    Str(String),
    Int(i64),
    Bool(bool),
    /// A variable looked up in the bindings (`OS`, `library`, ...).
    Name(String),
    /// `[a, b, ...]`.
    List(Vec<Expression>),
    Compare {
        lhs: Box<Expression>,
        op: CompareOp,
        rhs: Box<Expression>,
    },
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
}

/// Comparison operator used inside an [`Expression::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky parser
// ═══════════════════════════════════════════════════════════════════════════════

fn keyword<'a>(kw: &'static str) -> impl Parser<'a, &'a str, &'a str, Extra<'a>> + Clone {
    word().filter(move |w: &&str| *w == kw)
}

/// Build the chumsky parser for condition expressions.
fn condition_parser<'a>() -> impl Parser<'a, &'a str, Expression, Extra<'a>> {
    recursive(|expr| {
        // ── Operands ─────────────────────────────────────────────────────
        let boolean = keyword("True")
            .to(Expression::Bool(true))
            .or(keyword("False").to(Expression::Bool(false)));

        let name = word()
            .filter(|w: &&str| !KEYWORDS.contains(w))
            .map(|w: &str| Expression::Name(w.to_string()));

        let list = expr
            .clone()
            .separated_by(just(',').padded())
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just('[').padded(), just(']').padded())
            .map(Expression::List);

        let paren_expr = expr.delimited_by(just('(').padded(), just(')').padded());

        let operand = choice((
            string_literal().map(Expression::Str),
            integer().map(Expression::Int),
            boolean,
            name,
            list,
            paren_expr,
        ))
        .padded();

        // ── Comparison operators ─────────────────────────────────────────
        let cmp_op = choice((
            just("==").to(CompareOp::Equal),
            just("!=").to(CompareOp::NotEqual),
            keyword("not")
                .then_ignore(text::whitespace())
                .then(keyword("in"))
                .to(CompareOp::NotIn),
            keyword("in").to(CompareOp::In),
        ))
        .padded();

        // ── Comparison:  lhs [op rhs] ────────────────────────────────────
        let comparison = operand
            .clone()
            .then(cmp_op.then(operand).or_not())
            .map(|(lhs, rest)| match rest {
                Some((op, rhs)) => Expression::Compare {
                    lhs: Box::new(lhs),
                    op,
                    rhs: Box::new(rhs),
                },
                None => lhs,
            });

        // ── 'not' prefix ─────────────────────────────────────────────────
        let negation = recursive(|negation| {
            keyword("not")
                .padded()
                .ignore_then(negation)
                .map(|e| Expression::Not(Box::new(e)))
                .or(comparison)
        });

        // ── 'and' — higher precedence than 'or' ─────────────────────────
        let and_expr = negation.clone().foldl(
            keyword("and").padded().ignore_then(negation).repeated(),
            |lhs, rhs| Expression::And(Box::new(lhs), Box::new(rhs)),
        );

        // ── 'or' — lowest precedence ────────────────────────────────────
        and_expr.clone().foldl(
            keyword("or").padded().ignore_then(and_expr).repeated(),
            |lhs, rhs| Expression::Or(Box::new(lhs), Box::new(rhs)),
        )
    })
}

/// Parse a condition string into an [`Expression`] AST.
pub fn parse_condition(input: &str) -> Result<Expression> {
    condition_parser()
        .then_ignore(end())
        .parse(input)
        .into_result()
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            GypError::Condition {
                expression: input.to_string(),
                message: messages.join("; "),
            }
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

/// A runtime value produced while evaluating an [`Expression`].
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<Operand>),
}

impl Operand {
    fn is_truthy(&self) -> bool {
        match self {
            Operand::Str(s) => !s.is_empty(),
            Operand::Int(i) => *i != 0,
            Operand::Bool(b) => *b,
            Operand::List(items) => !items.is_empty(),
        }
    }
}

/// Evaluation reached a name with no binding.
struct Unbound(String);

fn contains(haystack: &Operand, needle: &Operand) -> Option<bool> {
    match (haystack, needle) {
        (Operand::Str(h), Operand::Str(n)) => Some(h.contains(n.as_str())),
        (Operand::List(items), n) => Some(items.contains(n)),
        _ => None,
    }
}

fn eval(
    expr: &Expression,
    vars: &HashMap<String, String>,
) -> std::result::Result<Operand, Unbound> {
    Ok(match expr {
        Expression::Str(s) => Operand::Str(s.clone()),
        Expression::Int(i) => Operand::Int(*i),
        Expression::Bool(b) => Operand::Bool(*b),
        Expression::Name(name) => match vars.get(name) {
            Some(value) => Operand::Str(value.clone()),
            None => return Err(Unbound(name.clone())),
        },
        Expression::List(items) => Operand::List(
            items
                .iter()
                .map(|item| eval(item, vars))
                .collect::<std::result::Result<_, _>>()?,
        ),
        Expression::Compare { lhs, op, rhs } => {
            let l = eval(lhs, vars)?;
            let r = eval(rhs, vars)?;
            let result = match op {
                CompareOp::Equal => l == r,
                CompareOp::NotEqual => l != r,
                // Membership between incompatible kinds never matches.
                CompareOp::In => contains(&r, &l).unwrap_or(false),
                CompareOp::NotIn => contains(&r, &l).is_some_and(|found| !found),
            };
            Operand::Bool(result)
        }
        Expression::Not(inner) => Operand::Bool(!eval(inner, vars)?.is_truthy()),
        Expression::And(a, b) => {
            let l = eval(a, vars)?;
            if l.is_truthy() { eval(b, vars)? } else { l }
        }
        Expression::Or(a, b) => {
            let l = eval(a, vars)?;
            if l.is_truthy() { l } else { eval(b, vars)? }
        }
    })
}

/// Evaluate a condition expression against a set of variable bindings.
///
/// The condition holds only when the result is exactly `true`. If
/// evaluation reaches a name that has no binding, the condition is `false`;
/// names skipped by `and` / `or` short-circuiting are never looked up.
pub fn evaluate(expr: &Expression, vars: &HashMap<String, String>) -> bool {
    match eval(expr, vars) {
        Ok(Operand::Bool(b)) => b,
        Ok(_) => false,
        Err(Unbound(name)) => {
            log::trace!("condition references unbound name '{name}', treating as false");
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
