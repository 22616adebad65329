//! # Engine bridge
//!
//! Converts formula trees to the term language of an external computer-algebra engine
//! and back. Exact symbolic work (integration, differentiation, limits) is done by the
//! engine; this module only defines the boundary.
//!
//! ## Mapping
//! | formula                | engine term                          |
//! |------------------------|--------------------------------------|
//! | `a + b`                | `Plus[a, b]`                         |
//! | `a - b`                | `Plus[a, Times[-1, b]]`              |
//! | `-a`                   | `Times[-1, a]`                       |
//! | `a * b`                | `Times[a, b]`                        |
//! | `a / b`                | `Times[a, Power[b, -1]]`             |
//! | `root(2, x)`           | `Sqrt[x]`                            |
//! | `root(n, x)`           | `Surd[x, n]`                         |
//! | `log(b, x)`            | `Log[b, x]`                          |
//! | `diff(f, v)`           | `D[f, v]`                            |
//! | `lim(v, a, f)`         | `Limit[f, Rule[v, a]]`               |
//! | `int(f, v)`            | `Integrate[f, v]`                    |
//! | `int(f, v, a, b)`      | `Integrate[f, List[v, a, b]]`        |
//!
//! A symbol becomes the product of its factor and its powers (`3πx²` is
//! `Times[3, Pi, Power[x, 2]]`). On the way back the flattened n-ary sums and products of
//! the engine are right-folded pairwise, products of numbers and atoms collapse into a
//! single symbol, and the result is canonicalized.

use crate::formula::engine_expr::{
    EngineExpr, HEAD_D, HEAD_EXP, HEAD_INTEGRATE, HEAD_LIMIT, HEAD_LIST, HEAD_LOG, HEAD_RULE,
    HEAD_SQRT, HEAD_SURD, SYMBOL_E, SYMBOL_I, SYMBOL_PI,
};
use crate::formula::errors::FormulaError;
use crate::formula::formula_tree::{Formula, FunctionKind};
use crate::formula::numeric_symbol::{NumericSymbol, SymbolicConstant};
use log::debug;
use num::{BigInt, Signed};
use num_traits::ToPrimitive;
use strum::IntoEnumIterator;

/// largest integer an f64 factor carries exactly
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// An external computer-algebra engine.
pub trait AlgebraEngine {
    /// Evaluates a term exactly (symbolic integration, differentiation, limits).
    fn evaluate(&self, term: &EngineExpr) -> Result<EngineExpr, FormulaError>;
}

/// Engine stand-in that answers with the numerical value of the term.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericEngine;

impl AlgebraEngine for NumericEngine {
    fn evaluate(&self, term: &EngineExpr) -> Result<EngineExpr, FormulaError> {
        let value = Formula::from_engine(term)?.approximate()?;
        Ok(EngineExpr::Real(value))
    }
}

impl Formula {
    /// Maps the tree to an engine term. `Empty` operands have no engine equivalent.
    pub fn to_engine(&self) -> Result<EngineExpr, FormulaError> {
        if self.is_empty() {
            return Err(FormulaError::ConversionError(
                "an empty formula has no engine term".to_string(),
            ));
        }
        to_engine(self)
    }

    /// Rebuilds a canonical tree from an engine term.
    pub fn from_engine(term: &EngineExpr) -> Result<Formula, FormulaError> {
        let raw = from_engine(term)?;
        debug!("engine term {} read as {}", term, raw);
        Ok(raw.canonicalize())
    }

    /// Sends the tree through `engine` and reads the answer back.
    pub fn evaluate_exact(&self, engine: &dyn AlgebraEngine) -> Result<Formula, FormulaError> {
        let term = self.to_engine()?;
        let answer = engine.evaluate(&term)?;
        debug!("{} evaluated to {}", term, answer);
        Formula::from_engine(&answer)
    }
}

//___________________________________TO ENGINE____________________________________

fn operand(parent: &Formula, index: usize) -> Result<EngineExpr, FormulaError> {
    let child = parent.child(index)?;
    if child.is_empty() {
        return Err(FormulaError::ConversionError(format!(
            "operand {} of {} is empty",
            index,
            parent.tag()
        )));
    }
    to_engine(child)
}

fn number_to_engine(value: f64) -> EngineExpr {
    if value.fract() == 0.0 && value.abs() < EXACT_INTEGER_LIMIT {
        EngineExpr::integer(value as i64)
    } else {
        EngineExpr::Real(value)
    }
}

fn constant_name(constant: SymbolicConstant) -> &'static str {
    match constant {
        SymbolicConstant::Pi => SYMBOL_PI,
        SymbolicConstant::E => SYMBOL_E,
        SymbolicConstant::I => SYMBOL_I,
    }
}

fn atom_power(name: &str, power: i64) -> EngineExpr {
    if power == 1 {
        EngineExpr::symbol(name)
    } else {
        EngineExpr::power(EngineExpr::symbol(name), EngineExpr::integer(power))
    }
}

fn symbol_to_engine(symbol: &NumericSymbol) -> EngineExpr {
    let mut pieces: Vec<EngineExpr> = SymbolicConstant::iter()
        .filter(|c| symbol.power(*c) != 0)
        .map(|c| atom_power(constant_name(c), symbol.power(c)))
        .collect();
    pieces.extend(
        symbol
            .variables()
            .into_iter()
            .map(|(name, power)| atom_power(&name.to_string(), power)),
    );
    let factor = number_to_engine(symbol.factor());
    if pieces.is_empty() {
        return factor;
    }
    if symbol.factor() != 1.0 {
        pieces.insert(0, factor);
    }
    if pieces.len() == 1 {
        pieces.remove(0)
    } else {
        EngineExpr::Times(pieces)
    }
}

fn to_engine(node: &Formula) -> Result<EngineExpr, FormulaError> {
    let minus_one = || EngineExpr::integer(-1);
    Ok(match node {
        Formula::Empty => {
            return Err(FormulaError::ConversionError("empty operand".to_string()));
        }
        Formula::Symbol(symbol) => symbol_to_engine(symbol),
        Formula::Parentheses(_) => operand(node, 0)?,
        Formula::Add(..) => EngineExpr::Plus(vec![operand(node, 0)?, operand(node, 1)?]),
        Formula::Subtract(..) => EngineExpr::Plus(vec![
            operand(node, 0)?,
            EngineExpr::Times(vec![minus_one(), operand(node, 1)?]),
        ]),
        Formula::Multiply(..) => EngineExpr::Times(vec![operand(node, 0)?, operand(node, 1)?]),
        Formula::Divide(..) => EngineExpr::Times(vec![
            operand(node, 0)?,
            EngineExpr::power(operand(node, 1)?, minus_one()),
        ]),
        Formula::Power(..) => EngineExpr::power(operand(node, 0)?, operand(node, 1)?),
        Formula::Root(degree, _) => {
            if degree.as_number() == Some(2.0) {
                EngineExpr::apply(HEAD_SQRT, vec![operand(node, 1)?])
            } else {
                EngineExpr::apply(HEAD_SURD, vec![operand(node, 1)?, operand(node, 0)?])
            }
        }
        Formula::Log(..) => EngineExpr::apply(HEAD_LOG, vec![operand(node, 0)?, operand(node, 1)?]),
        Formula::Negate(_) => EngineExpr::Times(vec![minus_one(), operand(node, 0)?]),
        Formula::Function(kind, _) => EngineExpr::apply(kind.engine_head(), vec![operand(node, 0)?]),
        Formula::Derivative(..) => {
            EngineExpr::apply(HEAD_D, vec![operand(node, 0)?, operand(node, 1)?])
        }
        Formula::Limit(..) => EngineExpr::apply(
            HEAD_LIMIT,
            vec![
                operand(node, 2)?,
                EngineExpr::apply(HEAD_RULE, vec![operand(node, 0)?, operand(node, 1)?]),
            ],
        ),
        Formula::Integral(_, _, from, to) => {
            let integrand = operand(node, 0)?;
            let variable = operand(node, 1)?;
            match (from.is_empty(), to.is_empty()) {
                (true, true) => EngineExpr::apply(HEAD_INTEGRATE, vec![integrand, variable]),
                (true, false) => return Err(FormulaError::EmptyOperand(2)),
                (false, true) => return Err(FormulaError::EmptyOperand(3)),
                (false, false) => EngineExpr::apply(
                    HEAD_INTEGRATE,
                    vec![
                        integrand,
                        EngineExpr::apply(
                            HEAD_LIST,
                            vec![variable, operand(node, 2)?, operand(node, 3)?],
                        ),
                    ],
                ),
            }
        }
    })
}

//___________________________________FROM ENGINE____________________________________

fn integer_from_engine(value: &BigInt) -> Result<f64, FormulaError> {
    match value.to_i64() {
        Some(v) => Ok(v as f64),
        None if value.is_negative() => Err(FormulaError::ValueTooSmall(value.to_string())),
        None => Err(FormulaError::ValueTooLarge(value.to_string())),
    }
}

fn named_atom(name: &str) -> Result<NumericSymbol, FormulaError> {
    match name {
        SYMBOL_PI => Ok(NumericSymbol::pi()),
        SYMBOL_E => Ok(NumericSymbol::e()),
        SYMBOL_I => Ok(NumericSymbol::i()),
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) if letter.is_ascii_lowercase() => {
                    NumericSymbol::variable(letter)
                }
                _ => Err(FormulaError::ConversionError(format!(
                    "unknown engine symbol '{}'",
                    name
                ))),
            }
        }
    }
}

/// A number, a named atom or a positive integer power of a named atom, as one symbol.
fn atom(term: &EngineExpr) -> Result<Option<NumericSymbol>, FormulaError> {
    match term {
        EngineExpr::Integer(value) => Ok(Some(NumericSymbol::new(integer_from_engine(value)?))),
        EngineExpr::Real(value) => Ok(Some(NumericSymbol::new(*value))),
        EngineExpr::Symbol(name) => named_atom(name).map(Some),
        EngineExpr::Power(base, exponent) => match (base.as_ref(), exponent.as_ref()) {
            (EngineExpr::Symbol(name), EngineExpr::Integer(power)) => {
                let power = integer_from_engine(power)?;
                if power <= 0.0 {
                    return Ok(None);
                }
                Ok(Some(named_atom(name)?.pow(power)?))
            }
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

/// `a ∘ (b ∘ (c ∘ …))`
fn right_fold<F>(items: Vec<Formula>, combine: F) -> Option<Formula>
where
    F: Fn(Formula, Formula) -> Formula,
{
    items.into_iter().rev().reduce(|acc, item| combine(item, acc))
}

fn args_of<'a, const N: usize>(
    head: &str,
    args: &'a [EngineExpr],
) -> Result<&'a [EngineExpr; N], FormulaError> {
    args.try_into().map_err(|_| {
        FormulaError::ConversionError(format!(
            "{} takes {} arguments, got {}",
            head,
            N,
            args.len()
        ))
    })
}

/// `Times[-1, b]` read as `b` with a minus sign
fn negated_term(term: &EngineExpr) -> Option<&EngineExpr> {
    match term {
        EngineExpr::Times(args) => match args.as_slice() {
            [first, rest] if first.is_minus_one() => Some(rest),
            _ => None,
        },
        _ => None,
    }
}

fn sum_from_engine(args: &[EngineExpr]) -> Result<Formula, FormulaError> {
    let mut terms = Vec::with_capacity(args.len());
    for arg in args {
        terms.push(match negated_term(arg) {
            Some(inner) => (from_engine(inner)?, true),
            None => (from_engine(arg)?, false),
        });
    }
    let mut rest = terms.into_iter().rev();
    let Some((mut acc, mut acc_negative)) = rest.next() else {
        return Ok(Formula::number(0.0));
    };
    for (term, negative) in rest {
        let left = if negative { -term } else { term };
        acc = if acc_negative { left - acc } else { left + acc };
        acc_negative = false;
    }
    Ok(if acc_negative { -acc } else { acc })
}

fn product_from_engine(args: &[EngineExpr]) -> Result<Formula, FormulaError> {
    if let [first, rest] = args {
        if first.is_minus_one() {
            return Ok(-from_engine(rest)?);
        }
    }
    let mut coefficient: Option<NumericSymbol> = None;
    let mut numerators = Vec::new();
    let mut denominators = Vec::new();
    for arg in args {
        if let Some(base) = arg.as_reciprocal() {
            denominators.push(from_engine(base)?);
        } else if let Some(symbol) = atom(arg)? {
            coefficient = Some(match coefficient {
                Some(c) => c.multiply(&symbol),
                None => symbol,
            });
        } else {
            numerators.push(from_engine(arg)?);
        }
    }
    if let Some(c) = coefficient {
        if !c.is_one() || numerators.is_empty() {
            numerators.insert(0, Formula::symbol(c));
        }
    }
    let numerator =
        right_fold(numerators, |a, b| a * b).unwrap_or_else(|| Formula::number(1.0));
    Ok(match right_fold(denominators, |a, b| a * b) {
        Some(denominator) => numerator / denominator,
        None => numerator,
    })
}

fn apply_from_engine(head: &str, args: &[EngineExpr]) -> Result<Formula, FormulaError> {
    if let Some(kind) = FunctionKind::iter().find(|k| k.engine_head() == head) {
        let [argument] = args_of::<1>(head, args)?;
        return Ok(Formula::function(kind, from_engine(argument)?));
    }
    match head {
        HEAD_LOG => match args {
            [argument] => Ok(Formula::log(Formula::symbol(NumericSymbol::e()), from_engine(argument)?)),
            [base, argument] => Ok(Formula::log(from_engine(base)?, from_engine(argument)?)),
            _ => Err(FormulaError::ConversionError(format!(
                "Log takes 1 or 2 arguments, got {}",
                args.len()
            ))),
        },
        HEAD_SQRT => {
            let [argument] = args_of::<1>(head, args)?;
            Ok(Formula::root(Formula::number(2.0), from_engine(argument)?))
        }
        HEAD_SURD => {
            let [argument, degree] = args_of::<2>(head, args)?;
            Ok(Formula::root(from_engine(degree)?, from_engine(argument)?))
        }
        HEAD_EXP => {
            let [argument] = args_of::<1>(head, args)?;
            Ok(Formula::symbol(NumericSymbol::e()).pow(from_engine(argument)?))
        }
        HEAD_D => {
            let [expression, variable] = args_of::<2>(head, args)?;
            Ok(Formula::derivative(from_engine(expression)?, from_engine(variable)?))
        }
        HEAD_LIMIT => {
            let [expression, rule] = args_of::<2>(head, args)?;
            match rule {
                EngineExpr::Apply(rule_head, rule_args) if rule_head == HEAD_RULE => {
                    let [variable, target] = args_of::<2>(HEAD_RULE, rule_args)?;
                    Ok(Formula::limit(
                        from_engine(variable)?,
                        from_engine(target)?,
                        from_engine(expression)?,
                    ))
                }
                other => Err(FormulaError::ConversionError(format!(
                    "Limit expects a Rule, got {}",
                    other
                ))),
            }
        }
        HEAD_INTEGRATE => {
            let [integrand, range] = args_of::<2>(head, args)?;
            match range {
                EngineExpr::Apply(list_head, bounds) if list_head == HEAD_LIST => {
                    let [variable, from, to] = args_of::<3>(HEAD_LIST, bounds)?;
                    Ok(Formula::definite_integral(
                        from_engine(integrand)?,
                        from_engine(variable)?,
                        from_engine(from)?,
                        from_engine(to)?,
                    ))
                }
                variable => Ok(Formula::integral(from_engine(integrand)?, from_engine(variable)?)),
            }
        }
        _ => Err(FormulaError::ConversionError(format!(
            "unknown engine head '{}'",
            head
        ))),
    }
}

fn from_engine(term: &EngineExpr) -> Result<Formula, FormulaError> {
    match term {
        EngineExpr::Integer(value) => Ok(Formula::number(integer_from_engine(value)?)),
        EngineExpr::Real(value) => Ok(Formula::number(*value)),
        EngineExpr::Symbol(name) => Ok(Formula::symbol(named_atom(name)?)),
        EngineExpr::Plus(args) => sum_from_engine(args),
        EngineExpr::Times(args) => product_from_engine(args),
        EngineExpr::Power(base, exponent) => Ok(from_engine(base)?.pow(from_engine(exponent)?)),
        EngineExpr::Apply(head, args) => apply_from_engine(head, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::numeric_symbol::Bindings;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::RefCell;

    fn n(value: f64) -> Formula {
        Formula::number(value)
    }

    fn x() -> Formula {
        Formula::variable('x').unwrap()
    }

    fn y() -> Formula {
        Formula::variable('y').unwrap()
    }

    fn sym(name: &str) -> EngineExpr {
        EngineExpr::symbol(name)
    }

    fn int(value: i64) -> EngineExpr {
        EngineExpr::integer(value)
    }

    #[test]
    fn test_to_engine_operators() {
        assert_eq!(
            (x() - y()).to_engine().unwrap(),
            EngineExpr::Plus(vec![sym("x"), EngineExpr::Times(vec![int(-1), sym("y")])])
        );
        assert_eq!(
            (x() / n(2.0)).to_engine().unwrap(),
            EngineExpr::Times(vec![sym("x"), EngineExpr::power(int(2), int(-1))])
        );
        assert_eq!(
            (-x()).to_engine().unwrap(),
            EngineExpr::Times(vec![int(-1), sym("x")])
        );
        assert_eq!(n(0.25).to_engine().unwrap(), EngineExpr::Real(0.25));
        assert_eq!(
            Formula::parentheses(x()).to_engine().unwrap(),
            sym("x")
        );
        assert_eq!(
            Formula::root(n(2.0), x()).to_engine().unwrap().to_string(),
            "Sqrt[x]"
        );
        assert_eq!(
            Formula::root(n(3.0), x()).to_engine().unwrap().to_string(),
            "Surd[x, 3]"
        );
        assert_eq!(
            Formula::function(FunctionKind::Arctan, x()).to_engine().unwrap().to_string(),
            "ArcTan[x]"
        );
    }

    #[test]
    fn test_to_engine_symbol_pieces() {
        let mut symbol = NumericSymbol::pi().with_factor(3.0);
        symbol.set_var_power('x', 2).unwrap();
        assert_eq!(
            Formula::symbol(symbol).to_engine().unwrap(),
            EngineExpr::Times(vec![int(3), sym("Pi"), EngineExpr::power(sym("x"), int(2))])
        );
        assert_eq!(Formula::symbol(NumericSymbol::i()).to_engine().unwrap(), sym("I"));
    }

    #[test]
    fn test_to_engine_calculus() {
        let limit = Formula::limit(x(), n(0.0), x() + n(1.0));
        assert_eq!(
            limit.to_engine().unwrap().to_string(),
            "Limit[Plus[x, 1], Rule[x, 0]]"
        );
        let definite = Formula::definite_integral(x(), x(), n(0.0), n(1.0));
        assert_eq!(
            definite.to_engine().unwrap().to_string(),
            "Integrate[x, List[x, 0, 1]]"
        );
        let indefinite = Formula::integral(x(), x());
        assert_eq!(indefinite.to_engine().unwrap().to_string(), "Integrate[x, x]");
        let derivative = Formula::derivative(x().pow(n(2.0)), x());
        assert_eq!(derivative.to_engine().unwrap().to_string(), "D[Power[x, 2], x]");
    }

    #[test]
    fn test_to_engine_rejects_empty_operands() {
        assert!(matches!(
            Formula::Empty.to_engine(),
            Err(FormulaError::ConversionError(_))
        ));
        let half = Formula::Add(x().boxed(), Formula::Empty.boxed());
        assert!(matches!(half.to_engine(), Err(FormulaError::ConversionError(_))));
        let one_bound = Formula::definite_integral(x(), x(), n(0.0), Formula::Empty);
        assert_eq!(one_bound.to_engine(), Err(FormulaError::EmptyOperand(3)));
    }

    #[test]
    fn test_from_engine_folds_chains() {
        let sum = EngineExpr::Plus(vec![sym("x"), sym("y"), sym("z")]);
        let z = Formula::variable('z').unwrap();
        assert_eq!(Formula::from_engine(&sum).unwrap(), x() + (y() + z));

        let product = EngineExpr::Times(vec![
            int(2),
            sym("x"),
            EngineExpr::Plus(vec![sym("y"), int(1)]),
        ]);
        let two_x = NumericSymbol::variable('x').unwrap().with_factor(2.0);
        assert_eq!(
            Formula::from_engine(&product).unwrap(),
            Formula::symbol(two_x) * (y() + n(1.0))
        );
        let difference = EngineExpr::Plus(vec![sym("x"), EngineExpr::Times(vec![int(-1), sym("y")])]);
        assert_eq!(Formula::from_engine(&difference).unwrap(), x() - y());
    }

    #[test]
    fn test_from_engine_heads() {
        let e = || Formula::symbol(NumericSymbol::e());
        assert_eq!(
            Formula::from_engine(&EngineExpr::apply("Exp", vec![sym("x")])).unwrap(),
            e().pow(x())
        );
        assert_eq!(
            Formula::from_engine(&EngineExpr::apply("Log", vec![sym("x")])).unwrap(),
            Formula::log(e(), x())
        );
        assert_eq!(
            Formula::from_engine(&EngineExpr::apply("Cosh", vec![sym("x")])).unwrap(),
            Formula::function(FunctionKind::Cosh, x())
        );
        let limit = EngineExpr::apply(
            "Limit",
            vec![
                EngineExpr::Times(vec![
                    EngineExpr::apply("Sin", vec![sym("x")]),
                    EngineExpr::power(sym("x"), int(-1)),
                ]),
                EngineExpr::apply("Rule", vec![sym("x"), int(0)]),
            ],
        );
        assert_eq!(
            Formula::from_engine(&limit).unwrap(),
            Formula::limit(x(), n(0.0), Formula::function(FunctionKind::Sin, x()) / x())
        );
        assert_eq!(
            Formula::from_engine(&int(5_000_000)).unwrap(),
            n(5.0) * n(10.0).pow(n(6.0))
        );
        assert_eq!(
            Formula::from_engine(&EngineExpr::Times(vec![int(-1), sym("x")])).unwrap(),
            Formula::symbol(NumericSymbol::variable('x').unwrap().negated())
        );
    }

    #[test]
    fn test_from_engine_errors() {
        let huge = EngineExpr::Integer(BigInt::from(i64::MAX) * 4);
        assert!(matches!(Formula::from_engine(&huge), Err(FormulaError::ValueTooLarge(_))));
        let tiny = EngineExpr::Integer(BigInt::from(i64::MIN) * 4);
        assert!(matches!(Formula::from_engine(&tiny), Err(FormulaError::ValueTooSmall(_))));
        assert!(matches!(
            Formula::from_engine(&sym("Gamma")),
            Err(FormulaError::ConversionError(_))
        ));
        assert!(matches!(
            Formula::from_engine(&EngineExpr::apply("BesselJ", vec![int(0), sym("x")])),
            Err(FormulaError::ConversionError(_))
        ));
        assert!(matches!(
            Formula::from_engine(&EngineExpr::apply("Sin", vec![sym("x"), sym("y")])),
            Err(FormulaError::ConversionError(_))
        ));
        assert!(matches!(
            Formula::from_engine(&EngineExpr::apply("Limit", vec![sym("x"), int(0)])),
            Err(FormulaError::ConversionError(_))
        ));
    }

    struct Recording {
        seen: RefCell<Vec<String>>,
        answer: EngineExpr,
    }

    impl AlgebraEngine for Recording {
        fn evaluate(&self, term: &EngineExpr) -> Result<EngineExpr, FormulaError> {
            self.seen.borrow_mut().push(term.to_string());
            Ok(self.answer.clone())
        }
    }

    #[test]
    fn test_evaluate_exact_goes_through_engine() {
        let engine = Recording {
            seen: RefCell::new(Vec::new()),
            answer: EngineExpr::Times(vec![int(2), sym("x")]),
        };
        let derivative = Formula::derivative(x().pow(n(2.0)), x());
        let result = derivative.evaluate_exact(&engine).unwrap();
        assert_eq!(
            result,
            Formula::symbol(NumericSymbol::variable('x').unwrap().with_factor(2.0))
        );
        assert_eq!(engine.seen.borrow().as_slice(), ["D[Power[x, 2], x]".to_string()]);

        let unfinished = Formula::derivative(Formula::Empty, x());
        assert!(unfinished.evaluate_exact(&engine).is_err());
        assert_eq!(engine.seen.borrow().len(), 1);
    }

    #[test]
    fn test_numeric_engine() {
        let area = Formula::definite_integral(x(), x(), n(0.0), n(1.0));
        let result = area.evaluate_exact(&NumericEngine).unwrap();
        assert_relative_eq!(result.approximate().unwrap(), 0.5, epsilon = 1e-9);
        assert_eq!(
            Formula::integral(x(), x()).evaluate_exact(&NumericEngine),
            Err(FormulaError::NotConstant)
        );
    }

    fn random_leaf(rng: &mut StdRng) -> Formula {
        match rng.random_range(0..6) {
            0 => x(),
            1 => y(),
            _ => n(rng.random_range(1..=9) as f64),
        }
    }

    fn random_tree(rng: &mut StdRng, depth: usize) -> Formula {
        if depth <= 1 || rng.random_bool(0.25) {
            return random_leaf(rng);
        }
        match rng.random_range(0..8) {
            0 => random_tree(rng, depth - 1) + random_tree(rng, depth - 1),
            1 => random_tree(rng, depth - 1) - random_tree(rng, depth - 1),
            2 => random_tree(rng, depth - 1) * random_tree(rng, depth - 1),
            3 => random_tree(rng, depth - 1) / random_tree(rng, depth - 1),
            4 => {
                let base = random_tree(rng, depth - 1);
                base.pow(n(rng.random_range(2..=3) as f64))
            }
            5 => {
                let degree = n(rng.random_range(2..=3) as f64);
                Formula::root(degree, random_tree(rng, depth - 1))
            }
            6 => {
                let kind = random_kind(rng);
                Formula::function(kind, random_tree(rng, depth - 1))
            }
            _ => Formula::log(n(2.0), random_tree(rng, depth - 1)),
        }
    }

    fn random_kind(rng: &mut StdRng) -> FunctionKind {
        let kinds: Vec<FunctionKind> = FunctionKind::iter().collect();
        kinds[rng.random_range(0..kinds.len())]
    }

    /// Decimals from `10^-12` to `9·10^9`, negative and rational exponents.
    fn random_wide_tree(rng: &mut StdRng, depth: usize) -> Formula {
        if depth <= 1 || rng.random_bool(0.2) {
            return match rng.random_range(0..5) {
                0 => x(),
                1 => y(),
                _ => n(rng.random_range(1..=9) as f64 * 10f64.powi(rng.random_range(-12..=9))),
            };
        }
        let next = |rng: &mut StdRng| random_wide_tree(rng, depth - 1);
        match rng.random_range(0..9) {
            0 => next(rng) + next(rng),
            1 => next(rng) - next(rng),
            2 => next(rng) * next(rng),
            3 => next(rng) / next(rng),
            4 => {
                let exponent = match rng.random_range(0..7) {
                    0 => n(-2.0),
                    1 => n(-1.0),
                    2 => n(2.0),
                    3 => n(3.0),
                    4 => n(1.0) / n(2.0),
                    5 => n(1.0) / n(3.0),
                    _ => -(n(1.0) / n(2.0)),
                };
                next(rng).pow(exponent)
            }
            5 => Formula::root(n(rng.random_range(2..=3) as f64), next(rng)),
            6 => Formula::log(n(2.0), next(rng)),
            7 => -next(rng),
            _ => {
                let kind = random_kind(rng);
                Formula::function(kind, next(rng))
            }
        }
    }

    #[test]
    fn test_round_trip_of_canonical_trees() {
        let trees = vec![
            x() + n(1.0),
            x() - y(),
            Formula::function(FunctionKind::Sin, x()) / x(),
            Formula::root(n(3.0), x() + n(2.0)),
            Formula::log(n(2.0), y()),
            -(x() + y()),
            Formula::derivative(x().pow(n(3.0)), x()),
            Formula::definite_integral(x() * y(), x(), n(0.0), n(2.0)),
            x() * n(10.0).pow(n(-1.0)),
            x() / n(10.0),
            (n(1.0) / n(128.0)) * x(),
            n(385.0) / n(128.0),
            n(1.0) / n(1e-10),
            Formula::function(FunctionKind::Sin, x()) * n(10.0).pow(n(-7.0)) * n(10.0).pow(n(-8.0)),
        ];
        for tree in trees {
            let canonical = tree.canonicalize();
            let term = canonical.to_engine().unwrap();
            assert_eq!(Formula::from_engine(&term).unwrap(), canonical, "via {}", term);
        }
    }

    #[test]
    fn test_round_trip_of_generated_trees() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..300 {
            let tree = random_tree(&mut rng, 4);
            let term = tree.to_engine().unwrap();
            let back = Formula::from_engine(&term).unwrap();
            assert_eq!(back, tree.clone().canonicalize(), "{} via {}", tree, term);
        }
    }

    #[test]
    fn test_round_trip_of_generated_canonical_trees() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..300 {
            let tree = random_wide_tree(&mut rng, 4);
            let canonical = tree.clone().canonicalize();
            let term = canonical.to_engine().unwrap();
            let back = Formula::from_engine(&term).unwrap();
            assert_eq!(back, canonical, "{} via {}", tree, term);
        }
    }

    #[test]
    fn test_round_trip_keeps_value() {
        let mut rng = StdRng::seed_from_u64(7);
        let bindings = Bindings::from([('x', 1.3), ('y', 0.7)]);
        let mut checked = 0;
        for _ in 0..300 {
            let tree = random_tree(&mut rng, 3);
            let Ok(expected) = tree.evaluate(&bindings) else {
                continue;
            };
            if !expected.is_finite() {
                continue;
            }
            let term = tree.to_engine().unwrap();
            let back = Formula::from_engine(&term).unwrap();
            let actual = back.evaluate(&bindings).unwrap();
            assert!(
                (actual - expected).abs() <= 1e-3 * expected.abs().max(1.0),
                "{} via {} gave {} instead of {}",
                tree,
                term,
                actual,
                expected
            );
            assert_eq!(back.clone().canonicalize(), back);
            checked += 1;
        }
        assert!(checked > 100);
    }
}
