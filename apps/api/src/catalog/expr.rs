//! Arithmetic expressions in template text-box descriptors.
//!
//! Schemas express geometry relative to other parameters, e.g.
//! `"box_w": "width - 2 * border"`. Supported: `+ - * /`, unary `+ -`,
//! parentheses, numeric literals and parameter names. Evaluation never fails:
//! anything unparsable evaluates to 0.

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use serde_json::Value;

use crate::catalog::schema::{value_as_f64, ParamSet};

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Param(String),
    Neg(Box<Expr>),
    Binary(Box<Expr>, Op, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Expr {
    /// Evaluates against `params`. Unknown or non-numeric parameters read as 0 and
    /// division by zero yields 0.
    pub fn eval(&self, params: &ParamSet) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Param(name) => params.get(name).and_then(value_as_f64).unwrap_or(0.0),
            Expr::Neg(inner) => -inner.eval(params),
            Expr::Binary(left, op, right) => {
                let l = left.eval(params);
                let r = right.eval(params);
                match op {
                    Op::Add => l + r,
                    Op::Sub => l - r,
                    Op::Mul => l * r,
                    Op::Div if r == 0.0 => 0.0,
                    Op::Div => l / r,
                }
            }
        }
    }
}

/// Parses a complete expression; trailing input is an error.
pub fn parse_expr(input: &str) -> Option<Expr> {
    all_consuming(delimited(multispace0, expression, multispace0))(input)
        .ok()
        .map(|(_, expr)| expr)
}

/// Evaluates a descriptor value: numbers pass through, strings are parsed as
/// expressions, anything else is 0.
pub fn eval_expr(value: &Value, params: &ParamSet) -> f64 {
    let result = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => parse_expr(s).map_or(0.0, |e| e.eval(params)),
        _ => 0.0,
    };
    if result.is_finite() {
        result
    } else {
        0.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Grammar
// ────────────────────────────────────────────────────────────────────────────

fn token<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

/// expression := term (('+' | '-') term)*
fn expression(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(token(one_of("+-")), term))(input)?;
    Ok((input, fold(first, rest)))
}

/// term := unary (('*' | '/') unary)*
fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(token(one_of("*/")), unary))(input)?;
    Ok((input, fold(first, rest)))
}

/// unary := ('+' | '-') unary | atom
fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(token(char('-')), unary), |e| Expr::Neg(Box::new(e))),
        preceded(token(char('+')), unary),
        atom,
    ))(input)
}

/// atom := number | identifier | '(' expression ')'
fn atom(input: &str) -> IResult<&str, Expr> {
    token(alt((
        map(number, Expr::Number),
        map(identifier, |name: &str| Expr::Param(name.to_string())),
        delimited(char('('), expression, char(')')),
    )))(input)
}

fn fold(first: Expr, rest: Vec<(char, Expr)>) -> Expr {
    rest.into_iter().fold(first, |left, (op, right)| {
        let op = match op {
            '+' => Op::Add,
            '-' => Op::Sub,
            '*' => Op::Mul,
            _ => Op::Div,
        };
        Expr::Binary(Box::new(left), op, Box::new(right))
    })
}

/// Unsigned decimal literal with optional fraction and exponent (`2`, `2.`, `.5`, `1e-3`).
fn number(input: &str) -> IResult<&str, f64> {
    let (rest, text) = recognize(tuple((
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    let value = text.parse::<f64>().unwrap_or(0.0);
    Ok((rest, value))
}

/// Parameter name: letter or underscore, then letters, digits, underscores.
fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
