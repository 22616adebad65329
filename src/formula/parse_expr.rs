//! Text input of formulas.
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := unary (('*' | '/') unary)*
//! unary      := '-' unary | power
//! power      := atom ('^' unary)?
//! atom       := number | '(' expression ')' | '_' | call | name
//! call       := name '(' expression (',' expression)* ')'
//! ```
//! Names are `pi` (or `π`), `e`, `i` and the single-letter variables `a..z`; `_` is an
//! empty slot. Calls are the elementary functions (`sin`, `arctan`, ...), `sqrt(x)`,
//! `root(n, x)`, `log(b, x)`, `diff(f, x)`, `lim(x, a, f)`, `int(f, x)` and
//! `int(f, x, a, b)`. Sums and products associate to the left, powers to the right.
//! The tree is returned as written; call [`Formula::canonicalize`] to reduce it.

use crate::formula::errors::FormulaError;
use crate::formula::formula_tree::{Formula, FunctionKind};
use crate::formula::numeric_symbol::NumericSymbol;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit0, digit1, multispace0, one_of},
    combinator::{map, map_res, opt, recognize, value},
    error::Error,
    multi::{many0, separated_list1},
    sequence::{delimited, preceded},
};
use std::str::FromStr;

impl Formula {
    /// Parses text like `int(x^2, x, 0, 1) / pi` into a raw formula tree.
    pub fn parse_expression(input: &str) -> Result<Formula, FormulaError> {
        match expression(input) {
            Ok((rest, formula)) if rest.trim().is_empty() => Ok(formula),
            Ok((rest, _)) => Err(FormulaError::Parse(format!(
                "unexpected input at '{}'",
                rest.trim()
            ))),
            Err(e) => Err(FormulaError::Parse(format!("cannot parse '{}': {}", input, e))),
        }
    }
}

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn number(input: &str) -> IResult<&str, Formula> {
    let digits = recognize((
        digit1,
        opt((char('.'), digit0)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    ));
    map_res(digits, |s: &str| s.parse::<f64>().map(Formula::number)).parse(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphabetic()).parse(input)
}

fn named(name: &str) -> Result<Formula, FormulaError> {
    match name {
        "pi" | "π" => Ok(Formula::symbol(NumericSymbol::pi())),
        "e" => Ok(Formula::symbol(NumericSymbol::e())),
        "i" => Ok(Formula::symbol(NumericSymbol::i())),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) => Formula::variable(letter),
                _ => Err(FormulaError::Parse(format!("unknown name '{}'", name))),
            }
        }
    }
}

fn call(name: &str, args: Vec<Formula>) -> Result<Formula, FormulaError> {
    if let Ok(kind) = FunctionKind::from_str(name) {
        if let Ok([argument]) = <[Formula; 1]>::try_from(args) {
            return Ok(Formula::function(kind, argument));
        }
        return Err(FormulaError::Parse(format!("{} takes one argument", name)));
    }
    let arity = args.len();
    let mut args = args.into_iter();
    let mut next = || args.next().unwrap_or_default();
    match (name, arity) {
        ("sqrt", 1) => Ok(Formula::root(Formula::number(2.0), next())),
        ("root", 2) => Ok(Formula::root(next(), next())),
        ("log", 2) => Ok(Formula::log(next(), next())),
        ("diff", 2) => Ok(Formula::derivative(next(), next())),
        ("lim", 3) => Ok(Formula::limit(next(), next(), next())),
        ("int", 2) => Ok(Formula::integral(next(), next())),
        ("int", 4) => Ok(Formula::definite_integral(next(), next(), next(), next())),
        _ => Err(FormulaError::Parse(format!(
            "unknown call {} with {} arguments",
            name, arity
        ))),
    }
}

fn atom(input: &str) -> IResult<&str, Formula> {
    let parenthesized = map(
        delimited(ws(char('(')), expression, ws(char(')'))),
        Formula::parentheses,
    );
    let application = map_res(
        (
            word,
            delimited(
                ws(char('(')),
                separated_list1(ws(char(',')), expression),
                ws(char(')')),
            ),
        ),
        |(name, args)| call(name, args),
    );
    alt((
        number,
        parenthesized,
        value(Formula::Empty, char('_')),
        application,
        map_res(word, named),
    ))
    .parse(input)
}

fn power(input: &str) -> IResult<&str, Formula> {
    let (input, base) = ws(atom).parse(input)?;
    let (input, exponent) = opt(preceded(ws(char('^')), unary)).parse(input)?;
    Ok((
        input,
        match exponent {
            Some(exponent) => base.pow(exponent),
            None => base,
        },
    ))
}

fn unary(input: &str) -> IResult<&str, Formula> {
    alt((map(preceded(ws(char('-')), unary), |f| -f), power)).parse(input)
}

fn term(input: &str) -> IResult<&str, Formula> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0((ws(one_of("*/")), unary)).parse(input)?;
    let product = rest
        .into_iter()
        .fold(first, |acc, (op, rhs)| if op == '*' { acc * rhs } else { acc / rhs });
    Ok((input, product))
}

fn expression(input: &str) -> IResult<&str, Formula> {
    let (input, first) = term(input)?;
    let (input, rest) = many0((ws(one_of("+-")), term)).parse(input)?;
    let sum = rest
        .into_iter()
        .fold(first, |acc, (op, rhs)| if op == '+' { acc + rhs } else { acc - rhs });
    Ok((input, sum))
}
