//! # Expression Tree
//!
//! The mutable formula tree a user assembles by drag-and-drop. Each node is one variant
//! of the closed [`Formula`] enum; arity and precedence are data derived from the
//! variant, so every pass dispatches with a single `match`.
//!
//! ## Ownership
//! A parent owns its children exclusively through `Box<Formula>`; a subtree moved to
//! another parent (see [`Formula::take_child`]) leaves an `Empty` placeholder behind,
//! so two tree positions never alias.
//!
//! ## Child access
//! Children are addressed by their positional index. An index outside the node's arity
//! is a programming error and is reported as `ChildIndexOutOfRange`, never silently
//! ignored.

use crate::formula::errors::FormulaError;
use crate::formula::numeric_symbol::NumericSymbol;
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// precedence of `Add`, `Subtract` and `Negate`
pub const PRECEDENCE_ADD: i32 = 10;
/// precedence of `Multiply`, `Divide` and of the calculus operations
pub const PRECEDENCE_MULTIPLY: i32 = 20;
pub const PRECEDENCE_POWER: i32 = 30;
/// precedence of function-like nodes (`Function`, `Log`, `Root`)
pub const PRECEDENCE_FUNCTION: i32 = 40;
/// precedence of leaves and explicit groups
pub const PRECEDENCE_ATOM: i32 = 50;

/// Elementary functions a `Function` node can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum FunctionKind {
    Sin,
    Cos,
    Tan,
    Cot,
    Sinh,
    Cosh,
    Tanh,
    Arcsin,
    Arccos,
    Arctan,
}

impl FunctionKind {
    /// head name used by the external algebra engine
    pub fn engine_head(&self) -> &'static str {
        match self {
            FunctionKind::Sin => "Sin",
            FunctionKind::Cos => "Cos",
            FunctionKind::Tan => "Tan",
            FunctionKind::Cot => "Cot",
            FunctionKind::Sinh => "Sinh",
            FunctionKind::Cosh => "Cosh",
            FunctionKind::Tanh => "Tanh",
            FunctionKind::Arcsin => "ArcSin",
            FunctionKind::Arccos => "ArcCos",
            FunctionKind::Arctan => "ArcTan",
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        match self {
            FunctionKind::Sin => x.sin(),
            FunctionKind::Cos => x.cos(),
            FunctionKind::Tan => x.tan(),
            FunctionKind::Cot => 1.0 / x.tan(),
            FunctionKind::Sinh => x.sinh(),
            FunctionKind::Cosh => x.cosh(),
            FunctionKind::Tanh => x.tanh(),
            FunctionKind::Arcsin => x.asin(),
            FunctionKind::Arccos => x.acos(),
            FunctionKind::Arctan => x.atan(),
        }
    }
}

/// Type tag of a node; also the element name of the persisted format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum NodeTag {
    Empty,
    Symbol,
    Parentheses,
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Root,
    Log,
    Negate,
    Function,
    Derivative,
    Limit,
    Integral,
}

/// Formula tree node.
///
/// # Examples
/// ```rust, ignore
/// use RustedFormula::formula::formula_tree::Formula;
/// let x = Formula::variable('x').unwrap();
/// let f = Formula::number(3.0) * x + Formula::number(1.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Formula {
    /// placeholder for an unfilled operand
    Empty,
    /// canonical constant term
    Symbol(NumericSymbol),
    /// explicit visual grouping of exactly one child
    Parentheses(Box<Formula>),
    Add(Box<Formula>, Box<Formula>),
    Subtract(Box<Formula>, Box<Formula>),
    Multiply(Box<Formula>, Box<Formula>),
    Divide(Box<Formula>, Box<Formula>),
    /// base ^ exponent
    Power(Box<Formula>, Box<Formula>),
    /// (degree, base)
    Root(Box<Formula>, Box<Formula>),
    /// (base, argument)
    Log(Box<Formula>, Box<Formula>),
    Negate(Box<Formula>),
    Function(FunctionKind, Box<Formula>),
    /// (expression, variable)
    Derivative(Box<Formula>, Box<Formula>),
    /// (start, end, expression): the limit of expression as start → end
    Limit(Box<Formula>, Box<Formula>, Box<Formula>),
    /// (integrand, variable, from, to); `from`/`to` both `Empty` means indefinite
    Integral(Box<Formula>, Box<Formula>, Box<Formula>, Box<Formula>),
}

impl Default for Formula {
    fn default() -> Self {
        Formula::Empty
    }
}

impl Formula {
    //___________________________________CONSTRUCTION____________________________________

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// plain number leaf
    pub fn number(value: f64) -> Formula {
        Formula::Symbol(NumericSymbol::new(value))
    }

    /// single variable leaf `'a'..='z'`
    pub fn variable(name: char) -> Result<Formula, FormulaError> {
        Ok(Formula::Symbol(NumericSymbol::variable(name)?))
    }

    pub fn symbol(symbol: NumericSymbol) -> Formula {
        Formula::Symbol(symbol)
    }

    pub fn parentheses(child: Formula) -> Formula {
        Formula::Parentheses(child.boxed())
    }

    pub fn pow(self, exponent: Formula) -> Formula {
        Formula::Power(self.boxed(), exponent.boxed())
    }

    pub fn root(degree: Formula, base: Formula) -> Formula {
        Formula::Root(degree.boxed(), base.boxed())
    }

    pub fn log(base: Formula, argument: Formula) -> Formula {
        Formula::Log(base.boxed(), argument.boxed())
    }

    pub fn function(kind: FunctionKind, argument: Formula) -> Formula {
        Formula::Function(kind, argument.boxed())
    }

    pub fn derivative(expression: Formula, variable: Formula) -> Formula {
        Formula::Derivative(expression.boxed(), variable.boxed())
    }

    pub fn limit(start: Formula, end: Formula, expression: Formula) -> Formula {
        Formula::Limit(start.boxed(), end.boxed(), expression.boxed())
    }

    pub fn integral(integrand: Formula, variable: Formula) -> Formula {
        Formula::Integral(
            integrand.boxed(),
            variable.boxed(),
            Formula::Empty.boxed(),
            Formula::Empty.boxed(),
        )
    }

    pub fn definite_integral(integrand: Formula, variable: Formula, from: Formula, to: Formula) -> Formula {
        Formula::Integral(integrand.boxed(), variable.boxed(), from.boxed(), to.boxed())
    }

    /// A node of the given type with every slot `Empty`, as inserted by the UI when
    /// an operator is dropped. Symbols carry data and cannot be created this way.
    pub fn with_empty_slots(tag: NodeTag) -> Result<Formula, FormulaError> {
        let e = || Formula::Empty.boxed();
        Ok(match tag {
            NodeTag::Empty => Formula::Empty,
            NodeTag::Symbol => {
                return Err(FormulaError::ConversionError(
                    "a symbol cannot be created without a value".to_string(),
                ));
            }
            NodeTag::Parentheses => Formula::Parentheses(e()),
            NodeTag::Add => Formula::Add(e(), e()),
            NodeTag::Subtract => Formula::Subtract(e(), e()),
            NodeTag::Multiply => Formula::Multiply(e(), e()),
            NodeTag::Divide => Formula::Divide(e(), e()),
            NodeTag::Power => Formula::Power(e(), e()),
            NodeTag::Root => Formula::Root(e(), e()),
            NodeTag::Log => Formula::Log(e(), e()),
            NodeTag::Negate => Formula::Negate(e()),
            NodeTag::Function => Formula::Function(FunctionKind::Sin, e()),
            NodeTag::Derivative => Formula::Derivative(e(), e()),
            NodeTag::Limit => Formula::Limit(e(), e(), e()),
            NodeTag::Integral => Formula::Integral(e(), e(), e(), e()),
        })
    }

    //___________________________________ATTRIBUTES____________________________________

    pub fn tag(&self) -> NodeTag {
        match self {
            Formula::Empty => NodeTag::Empty,
            Formula::Symbol(_) => NodeTag::Symbol,
            Formula::Parentheses(_) => NodeTag::Parentheses,
            Formula::Add(..) => NodeTag::Add,
            Formula::Subtract(..) => NodeTag::Subtract,
            Formula::Multiply(..) => NodeTag::Multiply,
            Formula::Divide(..) => NodeTag::Divide,
            Formula::Power(..) => NodeTag::Power,
            Formula::Root(..) => NodeTag::Root,
            Formula::Log(..) => NodeTag::Log,
            Formula::Negate(_) => NodeTag::Negate,
            Formula::Function(..) => NodeTag::Function,
            Formula::Derivative(..) => NodeTag::Derivative,
            Formula::Limit(..) => NodeTag::Limit,
            Formula::Integral(..) => NodeTag::Integral,
        }
    }

    /// Higher binds tighter.
    pub fn precedence(&self) -> i32 {
        match self {
            Formula::Empty | Formula::Symbol(_) | Formula::Parentheses(_) => PRECEDENCE_ATOM,
            Formula::Add(..) | Formula::Subtract(..) | Formula::Negate(_) => PRECEDENCE_ADD,
            Formula::Multiply(..)
            | Formula::Divide(..)
            | Formula::Derivative(..)
            | Formula::Limit(..)
            | Formula::Integral(..) => PRECEDENCE_MULTIPLY,
            Formula::Power(..) => PRECEDENCE_POWER,
            Formula::Root(..) | Formula::Log(..) | Formula::Function(..) => PRECEDENCE_FUNCTION,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Formula::Empty | Formula::Symbol(_) => 0,
            Formula::Parentheses(_) | Formula::Negate(_) | Formula::Function(..) => 1,
            Formula::Limit(..) => 3,
            Formula::Integral(..) => 4,
            _ => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Formula::Empty)
    }

    pub fn as_symbol(&self) -> Option<&NumericSymbol> {
        match self {
            Formula::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// factor-only symbol (plain number)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Formula::Symbol(symbol) if symbol.is_factor_only() => Some(symbol.factor()),
            _ => None,
        }
    }

    pub fn is_symbol_like(&self) -> bool {
        matches!(self, Formula::Symbol(_))
    }

    pub fn is_zero(&self) -> bool {
        self.as_symbol().is_some_and(|s| s.is_zero())
    }

    pub fn is_one(&self) -> bool {
        self.as_symbol().is_some_and(|s| s.is_one())
    }

    //___________________________________CHILD ACCESS____________________________________

    /// Children in positional order.
    pub fn children(&self) -> Vec<&Formula> {
        match self {
            Formula::Empty | Formula::Symbol(_) => vec![],
            Formula::Parentheses(c) | Formula::Negate(c) | Formula::Function(_, c) => {
                vec![c.as_ref()]
            }
            Formula::Add(a, b)
            | Formula::Subtract(a, b)
            | Formula::Multiply(a, b)
            | Formula::Divide(a, b)
            | Formula::Power(a, b)
            | Formula::Root(a, b)
            | Formula::Log(a, b)
            | Formula::Derivative(a, b) => vec![a.as_ref(), b.as_ref()],
            Formula::Limit(a, b, c) => vec![a.as_ref(), b.as_ref(), c.as_ref()],
            Formula::Integral(a, b, c, d) => vec![a.as_ref(), b.as_ref(), c.as_ref(), d.as_ref()],
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut Formula> {
        match self {
            Formula::Empty | Formula::Symbol(_) => vec![],
            Formula::Parentheses(c) | Formula::Negate(c) | Formula::Function(_, c) => {
                vec![c.as_mut()]
            }
            Formula::Add(a, b)
            | Formula::Subtract(a, b)
            | Formula::Multiply(a, b)
            | Formula::Divide(a, b)
            | Formula::Power(a, b)
            | Formula::Root(a, b)
            | Formula::Log(a, b)
            | Formula::Derivative(a, b) => vec![a.as_mut(), b.as_mut()],
            Formula::Limit(a, b, c) => vec![a.as_mut(), b.as_mut(), c.as_mut()],
            Formula::Integral(a, b, c, d) => vec![a.as_mut(), b.as_mut(), c.as_mut(), d.as_mut()],
        }
    }

    fn out_of_range(&self, index: usize) -> FormulaError {
        FormulaError::ChildIndexOutOfRange {
            index,
            arity: self.arity(),
        }
    }

    pub fn child(&self, index: usize) -> Result<&Formula, FormulaError> {
        let error = self.out_of_range(index);
        self.children().into_iter().nth(index).ok_or(error)
    }

    pub fn child_mut(&mut self, index: usize) -> Result<&mut Formula, FormulaError> {
        let error = self.out_of_range(index);
        self.children_mut().into_iter().nth(index).ok_or(error)
    }

    /// Replaces the child at `index`, returning the previous one.
    pub fn set_child(&mut self, index: usize, child: Formula) -> Result<Formula, FormulaError> {
        let slot = self.child_mut(index)?;
        Ok(std::mem::replace(slot, child))
    }

    /// Detaches the child at `index`, leaving an `Empty` placeholder in its slot.
    pub fn take_child(&mut self, index: usize) -> Result<Formula, FormulaError> {
        self.set_child(index, Formula::Empty)
    }

    /// Rebuilds the node with every child passed through `f`.
    pub fn map_children<F>(self, mut f: F) -> Formula
    where
        F: FnMut(Formula) -> Formula,
    {
        let mut g = |c: Box<Formula>| f(*c).boxed();
        match self {
            Formula::Empty | Formula::Symbol(_) => self,
            Formula::Parentheses(c) => Formula::Parentheses(g(c)),
            Formula::Add(a, b) => Formula::Add(g(a), g(b)),
            Formula::Subtract(a, b) => Formula::Subtract(g(a), g(b)),
            Formula::Multiply(a, b) => Formula::Multiply(g(a), g(b)),
            Formula::Divide(a, b) => Formula::Divide(g(a), g(b)),
            Formula::Power(a, b) => Formula::Power(g(a), g(b)),
            Formula::Root(a, b) => Formula::Root(g(a), g(b)),
            Formula::Log(a, b) => Formula::Log(g(a), g(b)),
            Formula::Negate(c) => Formula::Negate(g(c)),
            Formula::Function(kind, c) => Formula::Function(kind, g(c)),
            Formula::Derivative(a, b) => Formula::Derivative(g(a), g(b)),
            Formula::Limit(a, b, c) => Formula::Limit(g(a), g(b), g(c)),
            Formula::Integral(a, b, c, d) => Formula::Integral(g(a), g(b), g(c), g(d)),
        }
    }

    //___________________________________TREE QUERIES____________________________________

    pub fn contains_empty(&self) -> bool {
        self.is_empty() || self.children().iter().any(|c| c.contains_empty())
    }

    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// `Integral` with at least one bound filled in; laid out in definite mode.
    pub fn is_definite_integral(&self) -> bool {
        match self {
            Formula::Integral(_, _, from, to) => !from.is_empty() || !to.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Formula::Empty => write!(f, "□"),
            Formula::Symbol(symbol) => write!(f, "{}", symbol),
            Formula::Parentheses(c) => write!(f, "({})", c),
            Formula::Add(a, b) => write!(f, "{} + {}", a, b),
            Formula::Subtract(a, b) => write!(f, "{} - {}", a, b),
            Formula::Multiply(a, b) => write!(f, "{} * {}", a, b),
            Formula::Divide(a, b) => write!(f, "{} / {}", a, b),
            Formula::Power(a, b) => write!(f, "{}^{}", a, b),
            Formula::Root(n, x) => write!(f, "root({}, {})", n, x),
            Formula::Log(b, x) => write!(f, "log({}, {})", b, x),
            Formula::Negate(c) => write!(f, "-{}", c),
            Formula::Function(kind, c) => write!(f, "{}({})", kind, c),
            Formula::Derivative(e, v) => write!(f, "diff({}, {})", e, v),
            Formula::Limit(s, t, e) => write!(f, "lim({}, {}, {})", s, t, e),
            Formula::Integral(e, v, from, to) => {
                if from.is_empty() && to.is_empty() {
                    write!(f, "int({}, {})", e, v)
                } else {
                    write!(f, "int({}, {}, {}, {})", e, v, from, to)
                }
            }
        }
    }
}

impl std::ops::Add for Formula {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Formula::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Formula {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Formula::Subtract(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Formula {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Formula::Multiply(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Formula {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Formula::Divide(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Formula {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Formula::Negate(self.boxed())
    }
}

//___________________________________MACROS____________________________________

/// Macro to create variable leaves from single-letter identifiers
/// Usage: vars!(x, y) -> (Formula, Formula)
#[macro_export]
macro_rules! vars {
    ($($var:ident),+ $(,)?) => {
        ($(
            {
                let name = stringify!($var);
                assert!(name.len() == 1, "vars! takes single-letter names");
                $crate::formula::formula_tree::Formula::variable(name.chars().next().unwrap_or('x'))
                    .expect("vars! takes lowercase letters a..z")
            }
        ),+)
    };
}
