//! Numerical approximation of formula trees.
//!
//! Only evaluation reports `EmptyOperand`: an unfilled slot has no value. Calculus
//! nodes are approximated numerically (central difference, one-sided approach,
//! Gauss-Legendre quadrature) since exact evaluation belongs to the external engine.

use crate::formula::errors::FormulaError;
use crate::formula::formula_tree::Formula;
use crate::formula::numeric_symbol::Bindings;
use gauss_quad::GaussLegendre;
use log::debug;
use std::cell::RefCell;

const QUADRATURE_DEGREE: usize = 32;
const DERIVATIVE_STEP: f64 = 1e-5;
const LIMIT_STEPS: [f64; 3] = [1e-4, 1e-6, 1e-8];

fn operand(child: &Formula, index: usize, bindings: &Bindings) -> Result<f64, FormulaError> {
    if child.is_empty() {
        return Err(FormulaError::EmptyOperand(index));
    }
    child.evaluate(bindings)
}

/// the variable named by the slot of a calculus node (`x` in `d/dx`, `∫ … dx`)
fn bound_variable(child: &Formula, index: usize) -> Result<char, FormulaError> {
    if child.is_empty() {
        return Err(FormulaError::EmptyOperand(index));
    }
    child
        .as_symbol()
        .and_then(|symbol| symbol.is_bare_variable())
        .ok_or(FormulaError::NotConstant)
}

fn rebind(bindings: &Bindings, name: char, value: f64) -> Bindings {
    let mut scoped = bindings.clone();
    scoped.insert(name, value);
    scoped
}

fn real_root(x: f64, degree: f64) -> f64 {
    let odd_degree = degree.fract() == 0.0 && (degree as i64) % 2 != 0;
    if x < 0.0 && odd_degree {
        -(-x).powf(1.0 / degree)
    } else {
        x.powf(1.0 / degree)
    }
}

impl Formula {
    /// Real value of a constant formula.
    pub fn approximate(&self) -> Result<f64, FormulaError> {
        self.evaluate(&Bindings::new())
    }

    /// Real value with variables taken from `bindings`.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<f64, FormulaError> {
        match self {
            Formula::Empty => Err(FormulaError::EmptyOperand(0)),
            Formula::Symbol(symbol) => symbol.evaluate(bindings),
            Formula::Parentheses(c) => operand(c, 0, bindings),
            Formula::Add(a, b) => Ok(operand(a, 0, bindings)? + operand(b, 1, bindings)?),
            Formula::Subtract(a, b) => Ok(operand(a, 0, bindings)? - operand(b, 1, bindings)?),
            Formula::Multiply(a, b) => Ok(operand(a, 0, bindings)? * operand(b, 1, bindings)?),
            Formula::Divide(a, b) => Ok(operand(a, 0, bindings)? / operand(b, 1, bindings)?),
            Formula::Power(base, exponent) => {
                Ok(operand(base, 0, bindings)?.powf(operand(exponent, 1, bindings)?))
            }
            Formula::Root(degree, base) => {
                let n = operand(degree, 0, bindings)?;
                Ok(real_root(operand(base, 1, bindings)?, n))
            }
            Formula::Log(base, argument) => {
                let b = operand(base, 0, bindings)?;
                Ok(operand(argument, 1, bindings)?.ln() / b.ln())
            }
            Formula::Negate(c) => Ok(-operand(c, 0, bindings)?),
            Formula::Function(kind, c) => Ok(kind.apply(operand(c, 0, bindings)?)),
            Formula::Derivative(expression, variable) => {
                if expression.is_empty() {
                    return Err(FormulaError::EmptyOperand(0));
                }
                let name = bound_variable(variable, 1)?;
                let x0 = *bindings.get(&name).ok_or(FormulaError::NotConstant)?;
                let h = DERIVATIVE_STEP * x0.abs().max(1.0);
                let forward = expression.evaluate(&rebind(bindings, name, x0 + h))?;
                let backward = expression.evaluate(&rebind(bindings, name, x0 - h))?;
                Ok((forward - backward) / (2.0 * h))
            }
            Formula::Limit(start, end, expression) => {
                let name = bound_variable(start, 0)?;
                let target = operand(end, 1, bindings)?;
                if expression.is_empty() {
                    return Err(FormulaError::EmptyOperand(2));
                }
                match expression.evaluate(&rebind(bindings, name, target)) {
                    Ok(value) if value.is_finite() => return Ok(value),
                    Err(FormulaError::EmptyOperand(index)) => {
                        return Err(FormulaError::EmptyOperand(index));
                    }
                    _ => {}
                }
                debug!("limit at {} = {} is not direct, approaching", name, target);
                let mut estimate = None;
                for step in LIMIT_STEPS {
                    let h = step * target.abs().max(1.0);
                    let left = expression.evaluate(&rebind(bindings, name, target - h))?;
                    let right = expression.evaluate(&rebind(bindings, name, target + h))?;
                    if !left.is_finite() || !right.is_finite() {
                        return Err(FormulaError::NotConstant);
                    }
                    estimate = Some(0.5 * (left + right));
                }
                estimate.ok_or(FormulaError::NotConstant)
            }
            Formula::Integral(integrand, variable, from, to) => {
                match (from.is_empty(), to.is_empty()) {
                    // an antiderivative is a function, not a constant
                    (true, true) => return Err(FormulaError::NotConstant),
                    (true, false) => return Err(FormulaError::EmptyOperand(2)),
                    (false, true) => return Err(FormulaError::EmptyOperand(3)),
                    (false, false) => {}
                }
                if integrand.is_empty() {
                    return Err(FormulaError::EmptyOperand(0));
                }
                let name = bound_variable(variable, 1)?;
                let lower = from.evaluate(bindings)?;
                let upper = to.evaluate(bindings)?;
                let quad = GaussLegendre::new(QUADRATURE_DEGREE)
                    .map_err(|_| FormulaError::NotConstant)?;
                let failure: RefCell<Option<FormulaError>> = RefCell::new(None);
                let value = quad.integrate(lower, upper, |x| {
                    match integrand.evaluate(&rebind(bindings, name, x)) {
                        Ok(y) => y,
                        Err(err) => {
                            failure.borrow_mut().get_or_insert(err);
                            f64::NAN
                        }
                    }
                });
                match failure.into_inner() {
                    Some(err) => Err(err),
                    None => Ok(value),
                }
            }
        }
    }
}
