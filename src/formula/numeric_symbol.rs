//! # Numeric Symbol
//!
//! Canonical representation of a constant term of a formula: a rounded scalar factor
//! times integer powers of the three fixed symbolic constants (π, e, i) and of up to
//! 26 single-letter variables `a..z`.
//!
//! ## Invariants
//! - `factor` is always rounded to [`FACTOR_PRECISION`] significant decimal digits, so
//!   floating noise does not accumulate through repeated rewrites
//! - a zero factor clears every power (`0·x` is just `0`)
//! - two symbols are equal iff all fields compare equal
//!
//! A symbol is *factor-only* when all its powers are zero, i.e. it is a plain real number.

use crate::formula::errors::FormulaError;
use std::collections::HashMap;
use std::f64::consts::{E, PI};
use std::fmt;
use strum_macros::{Display, EnumIter};

/// number of named variables (`a..z`)
pub const VARIABLE_COUNT: usize = 26;
/// significant decimal digits kept in a symbol factor
pub const FACTOR_PRECISION: i32 = 6;

/// Values for the variables of a formula, used by evaluation.
pub type Bindings = HashMap<char, f64>;

/// The three fixed symbolic constants a symbol can carry powers of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SymbolicConstant {
    #[strum(serialize = "π")]
    Pi,
    #[strum(serialize = "e")]
    E,
    #[strum(serialize = "i")]
    I,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericSymbol {
    factor: f64,
    pi_power: i64,
    e_power: i64,
    i_power: i64,
    var_powers: [i64; VARIABLE_COUNT],
}

/// Rounds a value to [`FACTOR_PRECISION`] significant decimal digits.
///
/// Zero (including `-0.0`) maps to `0.0`; non-finite values are returned unchanged.
pub fn round_factor(value: f64) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    if !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let shift = FACTOR_PRECISION - 1 - magnitude;
    if shift >= 0 {
        let scale = 10f64.powi(shift);
        let scaled = value * scale;
        if !scaled.is_finite() {
            return value;
        }
        scaled.round() / scale
    } else {
        let scale = 10f64.powi(-shift);
        (value / scale).round() * scale
    }
}

/// Maps `'a'..='z'` to its slot in the variable power table.
pub fn variable_index(name: char) -> Option<usize> {
    if name.is_ascii_lowercase() {
        Some(name as usize - 'a' as usize)
    } else {
        None
    }
}

/// Inverse of [`variable_index`].
pub fn variable_name(index: usize) -> char {
    (b'a' + index as u8) as char
}

fn is_whole(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

impl NumericSymbol {
    fn from_parts(
        factor: f64,
        pi_power: i64,
        e_power: i64,
        i_power: i64,
        var_powers: [i64; VARIABLE_COUNT],
    ) -> NumericSymbol {
        let factor = round_factor(factor);
        if factor == 0.0 {
            return NumericSymbol::new(0.0);
        }
        NumericSymbol {
            factor,
            pi_power,
            e_power,
            i_power,
            var_powers,
        }
    }

    /// Creates a factor-only symbol (a plain number).
    pub fn new(factor: f64) -> NumericSymbol {
        NumericSymbol {
            factor: round_factor(factor),
            pi_power: 0,
            e_power: 0,
            i_power: 0,
            var_powers: [0; VARIABLE_COUNT],
        }
    }

    /// Creates `constant^power` with factor 1.
    pub fn constant(constant: SymbolicConstant, power: i64) -> NumericSymbol {
        let mut symbol = NumericSymbol::new(1.0);
        symbol.set_power(constant, power);
        symbol
    }

    pub fn pi() -> NumericSymbol {
        NumericSymbol::constant(SymbolicConstant::Pi, 1)
    }

    pub fn e() -> NumericSymbol {
        NumericSymbol::constant(SymbolicConstant::E, 1)
    }

    pub fn i() -> NumericSymbol {
        NumericSymbol::constant(SymbolicConstant::I, 1)
    }

    /// Creates the bare variable `name` (`'a'..='z'`).
    pub fn variable(name: char) -> Result<NumericSymbol, FormulaError> {
        let index = variable_index(name).ok_or_else(|| {
            FormulaError::ConversionError(format!("'{}' is not a variable name", name))
        })?;
        let mut symbol = NumericSymbol::new(1.0);
        symbol.var_powers[index] = 1;
        Ok(symbol)
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Returns a copy with another factor (rounded, zero clears the powers).
    pub fn with_factor(&self, factor: f64) -> NumericSymbol {
        NumericSymbol::from_parts(
            factor,
            self.pi_power,
            self.e_power,
            self.i_power,
            self.var_powers,
        )
    }

    pub fn power(&self, constant: SymbolicConstant) -> i64 {
        match constant {
            SymbolicConstant::Pi => self.pi_power,
            SymbolicConstant::E => self.e_power,
            SymbolicConstant::I => self.i_power,
        }
    }

    pub fn set_power(&mut self, constant: SymbolicConstant, power: i64) {
        if self.factor == 0.0 {
            return;
        }
        match constant {
            SymbolicConstant::Pi => self.pi_power = power,
            SymbolicConstant::E => self.e_power = power,
            SymbolicConstant::I => self.i_power = power,
        }
    }

    /// Power of variable `name`; zero for anything that is not `'a'..='z'`.
    pub fn var_power(&self, name: char) -> i64 {
        variable_index(name).map_or(0, |index| self.var_powers[index])
    }

    pub fn set_var_power(&mut self, name: char, power: i64) -> Result<(), FormulaError> {
        let index = variable_index(name).ok_or_else(|| {
            FormulaError::ConversionError(format!("'{}' is not a variable name", name))
        })?;
        if self.factor != 0.0 {
            self.var_powers[index] = power;
        }
        Ok(())
    }

    pub fn var_powers(&self) -> &[i64; VARIABLE_COUNT] {
        &self.var_powers
    }

    /// Non-zero variable powers as `(name, power)` pairs in alphabetical order.
    pub fn variables(&self) -> Vec<(char, i64)> {
        self.var_powers
            .iter()
            .enumerate()
            .filter(|(_, power)| **power != 0)
            .map(|(index, power)| (variable_name(index), *power))
            .collect()
    }

    fn constant_powers(&self) -> [(SymbolicConstant, i64); 3] {
        [
            (SymbolicConstant::Pi, self.pi_power),
            (SymbolicConstant::E, self.e_power),
            (SymbolicConstant::I, self.i_power),
        ]
    }

    fn nonzero_power_count(&self) -> usize {
        self.constant_powers().iter().filter(|(_, p)| *p != 0).count()
            + self.var_powers.iter().filter(|p| **p != 0).count()
    }

    pub fn is_factor_only(&self) -> bool {
        self.nonzero_power_count() == 0
    }

    pub fn is_zero(&self) -> bool {
        self.factor == 0.0
    }

    pub fn is_one(&self) -> bool {
        self.factor == 1.0 && self.is_factor_only()
    }

    /// factor-only with a whole-number factor
    pub fn is_integer(&self) -> bool {
        self.is_factor_only() && is_whole(self.factor)
    }

    /// true for a symbol that is exactly one variable to the first power (`x`)
    pub fn is_bare_variable(&self) -> Option<char> {
        let vars = self.variables();
        if self.factor == 1.0
            && vars.len() == 1
            && vars[0].1 == 1
            && self.constant_powers().iter().all(|(_, p)| *p == 0)
        {
            Some(vars[0].0)
        } else {
            None
        }
    }

    /// Both symbols carry identical powers (they are like terms).
    pub fn same_powers(&self, other: &NumericSymbol) -> bool {
        self.pi_power == other.pi_power
            && self.e_power == other.e_power
            && self.i_power == other.i_power
            && self.var_powers == other.var_powers
    }

    /// Number of separately drawn pieces: the factor (unless it is an implicit 1),
    /// a detached minus sign on a negative plain number, and every non-zero power.
    pub fn visible_pieces(&self) -> usize {
        let powers = self.nonzero_power_count();
        let mut pieces = powers;
        if self.factor != 1.0 || powers == 0 {
            pieces += 1;
        }
        if self.factor < 0.0 && powers == 0 {
            pieces += 1;
        }
        pieces
    }

    pub fn has_power_above_one(&self) -> bool {
        self.constant_powers().iter().any(|(_, p)| *p > 1) || self.var_powers.iter().any(|p| *p > 1)
    }

    pub fn negated(&self) -> NumericSymbol {
        self.with_factor(-self.factor)
    }

    pub fn abs(&self) -> NumericSymbol {
        self.with_factor(self.factor.abs())
    }

    /// Product of two symbols: factors multiply, every power adds up.
    pub fn multiply(&self, other: &NumericSymbol) -> NumericSymbol {
        let mut var_powers = [0; VARIABLE_COUNT];
        for (k, power) in var_powers.iter_mut().enumerate() {
            *power = self.var_powers[k] + other.var_powers[k];
        }
        NumericSymbol::from_parts(
            self.factor * other.factor,
            self.pi_power + other.pi_power,
            self.e_power + other.e_power,
            self.i_power + other.i_power,
            var_powers,
        )
    }

    /// Raises the symbol to `exponent` by multiplying every stored power.
    ///
    /// Fails with `NonIntegerPowerFold` when a power times the exponent is not an
    /// integer, when a non-integer exponent is applied to a negative factor or leaves
    /// a non-integral factor, or when the result is not finite.
    pub fn pow(&self, exponent: f64) -> Result<NumericSymbol, FormulaError> {
        let fold_error = FormulaError::NonIntegerPowerFold { exponent };
        if !exponent.is_finite() {
            return Err(fold_error);
        }
        let scale_power = |power: i64| -> Option<i64> {
            let scaled = power as f64 * exponent;
            if is_whole(scaled) && scaled.abs() < i64::MAX as f64 / 2.0 {
                Some(scaled as i64)
            } else {
                None
            }
        };
        let factor = if is_whole(exponent) && exponent.abs() <= i32::MAX as f64 {
            self.factor.powi(exponent as i32)
        } else {
            if self.factor < 0.0 {
                return Err(fold_error);
            }
            let raw = self.factor.powf(exponent);
            let whole = raw.round();
            if (raw - whole).abs() > 1e-9 * raw.abs() {
                return Err(fold_error);
            }
            whole
        };
        if !factor.is_finite() {
            return Err(fold_error);
        }
        let mut var_powers = [0; VARIABLE_COUNT];
        for (k, power) in var_powers.iter_mut().enumerate() {
            *power = scale_power(self.var_powers[k]).ok_or(fold_error.clone())?;
        }
        Ok(NumericSymbol::from_parts(
            factor,
            scale_power(self.pi_power).ok_or(fold_error.clone())?,
            scale_power(self.e_power).ok_or(fold_error.clone())?,
            scale_power(self.i_power).ok_or(fold_error)?,
            var_powers,
        ))
    }

    /// Real value of the symbol with variables taken from `bindings`.
    ///
    /// Odd powers of `i` and unbound variables have no real constant value.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<f64, FormulaError> {
        let mut value =
            self.factor * PI.powf(self.pi_power as f64) * E.powf(self.e_power as f64);
        match self.i_power.rem_euclid(4) {
            0 => {}
            2 => value = -value,
            _ => return Err(FormulaError::NotConstant),
        }
        for (name, power) in self.variables() {
            let x = bindings.get(&name).ok_or(FormulaError::NotConstant)?;
            value *= x.powf(power as f64);
        }
        Ok(value)
    }

    pub fn approximate(&self) -> Result<f64, FormulaError> {
        self.evaluate(&Bindings::new())
    }
}

fn format_factor(value: f64) -> String {
    if is_whole(value) && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn write_power(f: &mut fmt::Formatter, name: &str, power: i64) -> fmt::Result {
    match power {
        0 => Ok(()),
        1 => write!(f, "{}", name),
        _ => write!(f, "{}^{}", name, power),
    }
}

impl fmt::Display for NumericSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_factor_only() {
            return write!(f, "{}", format_factor(self.factor));
        }
        if self.factor == -1.0 {
            write!(f, "-")?;
        } else if self.factor != 1.0 {
            write!(f, "{}", format_factor(self.factor))?;
        }
        for (constant, power) in self.constant_powers() {
            write_power(f, &constant.to_string(), power)?;
        }
        for (name, power) in self.variables() {
            write_power(f, &name.to_string(), power)?;
        }
        Ok(())
    }
}
