//! Arithmetic expression parser for problem data given as text.
//!
//! Compiles formulas like `8*pi^2*sin(2*pi*x)*sin(2*pi*y)` into callable
//! scalar fields, so the source term, boundary data and exact solution can
//! come from a datafile instead of hard-coded closures.
//!
//! # Grammar
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := unary ('^' factor)?          (right-associative)
//! unary  := '-' unary | atom
//! atom   := number | 'pi' | 'x' | 'y' | func '(' expr ')' | '(' expr ')'
//! func   := sinh cosh sin cos tan exp log sqrt abs
//! ```
//!
//! Whitespace is insignificant. Unary minus binds tighter than `^`, so
//! `-x^2` parses as `(-x)^2`.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, one_of};
use nom::combinator::{map, opt};
use nom::multi::many0;
use nom::number::complete::double;
use nom::sequence::{delimited, preceded};
use nom::IResult;
use nom::Parser;

use crate::error::{PoissonError, Result};
use crate::problem::ScalarField;

/// Built-in unary functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Sqrt,
    Sinh,
    Cosh,
    Abs,
}

impl Func {
    fn apply(self, v: f64) -> f64 {
        match self {
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Tan => v.tan(),
            Func::Exp => v.exp(),
            Func::Log => v.ln(),
            Func::Sqrt => v.sqrt(),
            Func::Sinh => v.sinh(),
            Func::Cosh => v.cosh(),
            Func::Abs => v.abs(),
        }
    }
}

/// Parsed expression tree over the variables `x` and `y`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    X,
    Y,
    Pi,
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    /// Evaluate at a point of the unit square.
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::X => x,
            Expr::Y => y,
            Expr::Pi => std::f64::consts::PI,
            Expr::Neg(e) => -e.eval(x, y),
            Expr::Add(a, b) => a.eval(x, y) + b.eval(x, y),
            Expr::Sub(a, b) => a.eval(x, y) - b.eval(x, y),
            Expr::Mul(a, b) => a.eval(x, y) * b.eval(x, y),
            Expr::Div(a, b) => a.eval(x, y) / b.eval(x, y),
            Expr::Pow(a, b) => a.eval(x, y).powf(b.eval(x, y)),
            Expr::Call(f, e) => f.apply(e.eval(x, y)),
        }
    }
}

/// Parse an expression string into a tree.
pub fn parse(input: &str) -> Result<Expr> {
    // The grammar has no string literals, so whitespace can be stripped
    // up front instead of threading space0 through every rule.
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(PoissonError::Parse("empty expression".into()));
    }
    match expr(&compact) {
        Ok(("", ast)) => Ok(ast),
        Ok((rest, _)) => Err(PoissonError::Parse(format!(
            "trailing input '{rest}' in expression '{input}'"
        ))),
        Err(_) => Err(PoissonError::Parse(format!(
            "malformed expression '{input}'"
        ))),
    }
}

/// Compile an expression string into a boxed callable.
pub fn compile(input: &str) -> Result<ScalarField> {
    let ast = parse(input)?;
    Ok(Box::new(move |x, y| ast.eval(x, y)))
}

fn expr(input: &str) -> IResult<&str, Expr> {
    let (rest, init) = term(input)?;
    let (rest, tail) = many0((one_of("+-"), term)).parse(rest)?;
    let folded = tail.into_iter().fold(init, |acc, (op, rhs)| match op {
        '+' => Expr::Add(Box::new(acc), Box::new(rhs)),
        _ => Expr::Sub(Box::new(acc), Box::new(rhs)),
    });
    Ok((rest, folded))
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (rest, init) = factor(input)?;
    let (rest, tail) = many0((one_of("*/"), factor)).parse(rest)?;
    let folded = tail.into_iter().fold(init, |acc, (op, rhs)| match op {
        '*' => Expr::Mul(Box::new(acc), Box::new(rhs)),
        _ => Expr::Div(Box::new(acc), Box::new(rhs)),
    });
    Ok((rest, folded))
}

fn factor(input: &str) -> IResult<&str, Expr> {
    let (rest, base) = unary(input)?;
    let (rest, exponent) = opt(preceded(char('^'), factor)).parse(rest)?;
    let out = match exponent {
        Some(e) => Expr::Pow(Box::new(base), Box::new(e)),
        None => base,
    };
    Ok((rest, out))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(char('-'), unary), |e| Expr::Neg(Box::new(e))),
        atom,
    ))
    .parse(input)
}

fn atom(input: &str) -> IResult<&str, Expr> {
    alt((parens, call, variable, map(double, Expr::Num))).parse(input)
}

fn parens(input: &str) -> IResult<&str, Expr> {
    delimited(char('('), expr, char(')')).parse(input)
}

fn call(input: &str) -> IResult<&str, Expr> {
    let (rest, f) = func_name(input)?;
    let (rest, arg) = delimited(char('('), expr, char(')')).parse(rest)?;
    Ok((rest, Expr::Call(f, Box::new(arg))))
}

/// Match a function name. Order matters: sinh/cosh must come before sin/cos.
fn func_name(input: &str) -> IResult<&str, Func> {
    alt((
        map(tag("sinh"), |_: &str| Func::Sinh),
        map(tag("cosh"), |_: &str| Func::Cosh),
        map(tag("sin"), |_: &str| Func::Sin),
        map(tag("cos"), |_: &str| Func::Cos),
        map(tag("tan"), |_: &str| Func::Tan),
        map(tag("exp"), |_: &str| Func::Exp),
        map(tag("log"), |_: &str| Func::Log),
        map(tag("sqrt"), |_: &str| Func::Sqrt),
        map(tag("abs"), |_: &str| Func::Abs),
    ))
    .parse(input)
}

fn variable(input: &str) -> IResult<&str, Expr> {
    alt((
        map(tag("pi"), |_: &str| Expr::Pi),
        map(tag("x"), |_: &str| Expr::X),
        map(tag("y"), |_: &str| Expr::Y),
    ))
    .parse(input)
}
