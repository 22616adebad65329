//! Term representation of the external computer-algebra engine.
//!
//! Terms are head-and-arguments trees in the engine's own style: sums and products are
//! n-ary and flattened by the engine, everything else is `Apply(head, args)`.
//! `Display` prints the engine's full form, e.g. `Plus[x, Times[-1, y]]`.

use itertools::Itertools;
use num::BigInt;
use std::fmt;

pub const HEAD_LOG: &str = "Log";
pub const HEAD_SURD: &str = "Surd";
pub const HEAD_SQRT: &str = "Sqrt";
pub const HEAD_EXP: &str = "Exp";
pub const HEAD_D: &str = "D";
pub const HEAD_LIMIT: &str = "Limit";
pub const HEAD_RULE: &str = "Rule";
pub const HEAD_INTEGRATE: &str = "Integrate";
pub const HEAD_LIST: &str = "List";

pub const SYMBOL_PI: &str = "Pi";
pub const SYMBOL_E: &str = "E";
pub const SYMBOL_I: &str = "I";

#[derive(Debug, Clone, PartialEq)]
pub enum EngineExpr {
    Integer(BigInt),
    Real(f64),
    Symbol(String),
    Plus(Vec<EngineExpr>),
    Times(Vec<EngineExpr>),
    Power(Box<EngineExpr>, Box<EngineExpr>),
    Apply(String, Vec<EngineExpr>),
}

impl EngineExpr {
    pub fn integer(value: i64) -> EngineExpr {
        EngineExpr::Integer(BigInt::from(value))
    }

    pub fn symbol(name: &str) -> EngineExpr {
        EngineExpr::Symbol(name.to_string())
    }

    pub fn power(base: EngineExpr, exponent: EngineExpr) -> EngineExpr {
        EngineExpr::Power(Box::new(base), Box::new(exponent))
    }

    pub fn apply(head: &str, args: Vec<EngineExpr>) -> EngineExpr {
        EngineExpr::Apply(head.to_string(), args)
    }

    /// `-1`, the coefficient the engine uses for negation and subtraction
    pub fn is_minus_one(&self) -> bool {
        matches!(self, EngineExpr::Integer(value) if *value == BigInt::from(-1))
    }

    /// `b^-1`, the engine's form of a denominator
    pub fn as_reciprocal(&self) -> Option<&EngineExpr> {
        match self {
            EngineExpr::Power(base, exponent) if exponent.is_minus_one() => Some(base.as_ref()),
            _ => None,
        }
    }

    /// Number of nodes in the term.
    pub fn size(&self) -> usize {
        match self {
            EngineExpr::Integer(_) | EngineExpr::Real(_) | EngineExpr::Symbol(_) => 1,
            EngineExpr::Plus(args) | EngineExpr::Times(args) | EngineExpr::Apply(_, args) => {
                1 + args.iter().map(EngineExpr::size).sum::<usize>()
            }
            EngineExpr::Power(base, exponent) => 1 + base.size() + exponent.size(),
        }
    }
}

impl fmt::Display for EngineExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineExpr::Integer(value) => write!(f, "{}", value),
            EngineExpr::Real(value) => write!(f, "{:?}", value),
            EngineExpr::Symbol(name) => write!(f, "{}", name),
            EngineExpr::Plus(args) => write!(f, "Plus[{}]", args.iter().join(", ")),
            EngineExpr::Times(args) => write!(f, "Times[{}]", args.iter().join(", ")),
            EngineExpr::Power(base, exponent) => write!(f, "Power[{}, {}]", base, exponent),
            EngineExpr::Apply(head, args) => write!(f, "{}[{}]", head, args.iter().join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_full_form() {
        let term = EngineExpr::Plus(vec![
            EngineExpr::symbol("x"),
            EngineExpr::Times(vec![EngineExpr::integer(-1), EngineExpr::Real(0.5)]),
            EngineExpr::apply("Sin", vec![EngineExpr::power(EngineExpr::symbol(SYMBOL_PI), EngineExpr::integer(2))]),
        ]);
        assert_eq!(term.to_string(), "Plus[x, Times[-1, 0.5], Sin[Power[Pi, 2]]]");
        assert_eq!(term.size(), 9);
    }

    #[test]
    fn test_reciprocal() {
        let y = EngineExpr::symbol("y");
        let reciprocal = EngineExpr::power(y.clone(), EngineExpr::integer(-1));
        assert_eq!(reciprocal.as_reciprocal(), Some(&y));
        assert_eq!(EngineExpr::power(y, EngineExpr::integer(-2)).as_reciprocal(), None);
        assert!(EngineExpr::integer(-1).is_minus_one());
        assert!(!EngineExpr::Real(-1.0).is_minus_one());
    }
}
