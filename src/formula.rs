//! Symbolic formulas as an editable tree: canonical rewriting, display layout,
//! conversion to an external algebra engine and persistence.
/// error kinds shared by every formula module
pub mod errors;
///____________________________________________________________________________________________________________________________
/// # Numeric symbol
/// a constant term: rounded factor times integer powers of π, e, i and of the variables `a..z`
pub mod numeric_symbol;
///____________________________________________________________________________________________________________________________
/// # Expression tree
/// closed enum of node kinds with positional child access
///# Example
/// ```
/// use RustedFormula::formula::formula_tree::Formula;
/// use RustedFormula::vars;
/// let (x, y) = vars!(x, y);
/// let mut f = (x.clone() + y) / Formula::number(2.0);
/// let numerator = f.take_child(0).unwrap();
/// println!("{} was moved out of {}", numerator, f);
/// ```
pub mod formula_tree;
/// numerical value of a tree (`approximate`, `evaluate` with variable bindings)
pub mod evaluation;
///____________________________________________________________________________________________________________________________
/// # Canonicalizer
/// bottom-up rewriting to the unique reduced form: numbers fold, like terms merge,
/// identities vanish, powers with rational exponents become roots
///# Example
/// ```
/// use RustedFormula::formula::formula_tree::Formula;
/// let raw = Formula::parse_expression("2*x + 3*x - 7/3").unwrap();
/// let reduced = raw.canonicalize();
/// println!("canonical form: {}", reduced);
/// ```
pub mod canonicalize;
/// inserts and removes `Parentheses` nodes by operator precedence
pub mod parenthesize;
///____________________________________________________________________________________________________________________________
/// # Layout engine
/// fits every node into a width/height budget and places its operator glyphs
///# Example
/// ```
/// use RustedFormula::formula::formula_tree::Formula;
/// use RustedFormula::formula::layout::{LayoutEngine, MonospaceMetrics};
/// use RustedFormula::formula::layout_config::LayoutConfig;
/// let f = Formula::parse_expression("int(x^2, x, 0, 1) / sqrt(2)").unwrap().canonicalize();
/// let config = LayoutConfig::default();
/// let engine = LayoutEngine::new(&config, &MonospaceMetrics);
/// for node in engine.layout_tree(&f, 600.0, 300.0) {
///     println!("{:?} {} at {:?}", node.path, node.tag, node.rect);
/// }
/// ```
pub mod layout;
/// tunable constants of the layout engine, loadable from a section document
pub mod layout_config;
///____________________________________________________________________________________________________________________________
/// # Engine bridge
/// term type of the external computer-algebra engine and the conversions to and from it
///# Example
/// ```
/// use RustedFormula::formula::engine_bridge::NumericEngine;
/// use RustedFormula::formula::formula_tree::Formula;
/// let area = Formula::parse_expression("int(sin(x), x, 0, pi)").unwrap();
/// println!("engine term: {}", area.to_engine().unwrap());
/// println!("value: {}", area.evaluate_exact(&NumericEngine).unwrap());
/// ```
pub mod engine_bridge;
pub mod engine_expr;
/// xml save/load of trees
pub mod persistence;
/// infix text input (`sqrt(x) + 1/2`) producing raw trees
pub mod parse_expr;

#[cfg(test)]
mod layout_tests;
