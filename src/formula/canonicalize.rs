//! # Canonicalizer
//!
//! Rewrites an arbitrary formula tree into a minimal, deterministic normal form:
//! like terms are combined, fractions of plain numbers are reduced (to terminating
//! decimals when possible), large integers are written with powers of ten, signs are
//! pulled out of products and quotients, and chains of `+`/`*` are right-associated.
//!
//! The rewrite is bottom-up: children are reduced first, then the rule for the parent
//! node combines them. A single pass can expose new opportunities one level up (e.g. a
//! product of two symbols becomes a large integer that wants scientific notation), so
//! [`Formula::canonicalize`] repeats passes until the tree stops changing.
//!
//! Canonicalization is total. Nodes with an `Empty` operand are kept as they are, and a
//! rule that fails (see `NonIntegerPowerFold`) leaves its subtree unreduced.

use crate::formula::formula_tree::Formula;
use crate::formula::numeric_symbol::{NumericSymbol, round_factor};
use log::{debug, warn};
use num::Integer;

/// upper bound on the number of passes before giving up on a fixpoint
const MAX_PASSES: usize = 32;
/// trailing zeros an integer factor needs before it is written as `m·10^k`
const SCIENTIFIC_MIN_ZEROS: i32 = 6;
/// decimal digits a terminating fraction may need before it becomes `m·10^k`
const MAX_DECIMAL_DIGITS: u32 = 6;
/// powers of ten tried when scaling decimal operands of a fraction to integers
const MAX_DECIMAL_SCALE: i32 = 12;
/// largest integer an f64 carries exactly
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

impl Formula {
    /// Reduces the tree to its normal form.
    ///
    /// Always use the returned tree: a rewrite may discard the node it was called on.
    /// # Examples
    /// ```rust, ignore
    /// let f = Formula::number(1.0) / Formula::number(4.0);
    /// assert_eq!(f.canonicalize(), Formula::number(0.25));
    /// ```
    pub fn canonicalize(self) -> Formula {
        let mut current = self;
        for pass in 0..MAX_PASSES {
            let next = simplify(current.clone());
            if next == current {
                debug!("canonical form reached after {} passes", pass + 1);
                return next;
            }
            current = next;
        }
        warn!(
            "canonicalization did not reach a fixpoint after {} passes: {}",
            MAX_PASSES, current
        );
        current
    }
}

//___________________________________HELPERS____________________________________

fn number(value: f64) -> Formula {
    Formula::number(value)
}

fn power_of_ten(exponent: i64) -> Formula {
    Formula::Power(number(10.0).boxed(), number(exponent as f64).boxed())
}

fn is_whole(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

fn is_ten(formula: &Formula) -> bool {
    formula.as_number() == Some(10.0)
}

fn whole_number(formula: &Formula) -> Option<f64> {
    formula.as_number().filter(|value| is_whole(*value))
}

/// `k` for `10` or `10^k` with a whole `k`.
fn ten_exponent(formula: &Formula) -> Option<f64> {
    if is_ten(formula) {
        return Some(1.0);
    }
    match formula {
        Formula::Power(base, exponent) if is_ten(base) => whole_number(exponent),
        _ => None,
    }
}

/// Splits off a leading sign: a negative symbol or a `Negate` node.
fn strip_sign(formula: Formula) -> (Formula, bool) {
    match formula {
        Formula::Symbol(symbol) if symbol.factor() < 0.0 => (Formula::Symbol(symbol.abs()), true),
        Formula::Negate(inner) => (*inner, true),
        other => (other, false),
    }
}

fn apply_sign(formula: Formula, negative: bool) -> Formula {
    if negative { negate(formula) } else { formula }
}

/// Writes an integer factor with at least [`SCIENTIFIC_MIN_ZEROS`] trailing zeros as
/// `m · 10^k` (or bare `10^k` when nothing else is left).
fn beautify(symbol: NumericSymbol) -> Formula {
    let factor = symbol.factor();
    if !is_whole(factor) || factor.abs() < 10f64.powi(SCIENTIFIC_MIN_ZEROS) {
        return Formula::Symbol(symbol);
    }
    let top = factor.abs().log10().floor() as i32;
    for k in (SCIENTIFIC_MIN_ZEROS..=top).rev() {
        let reduced = round_factor(factor.abs() / 10f64.powi(k));
        if reduced.fract() != 0.0 {
            continue;
        }
        let scale = power_of_ten(k as i64);
        let body = if reduced == 1.0 && symbol.is_factor_only() {
            scale
        } else {
            Formula::Multiply(Formula::Symbol(symbol.with_factor(reduced)).boxed(), scale.boxed())
        };
        return if factor < 0.0 { Formula::Negate(body.boxed()) } else { body };
    }
    Formula::Symbol(symbol)
}

/// `m · 10^e` for a positive value below one.
fn scientific(value: f64) -> Formula {
    let exponent = value.log10().floor() as i64;
    let mantissa = round_factor(value / 10f64.powi(exponent as i32));
    if mantissa == 1.0 {
        power_of_ten(exponent)
    } else {
        Formula::Multiply(number(mantissa).boxed(), power_of_ten(exponent).boxed())
    }
}

//___________________________________PASS____________________________________

/// One bottom-up rewrite of the whole tree.
fn simplify(formula: Formula) -> Formula {
    let formula = match formula {
        Formula::Parentheses(child) => return simplify(*child),
        Formula::Symbol(symbol) => return beautify(symbol),
        other => other.map_children(simplify),
    };
    if formula.children().iter().any(|c| c.is_empty()) {
        return formula;
    }
    match formula {
        Formula::Add(a, b) => add(*a, *b),
        Formula::Subtract(a, b) => subtract(*a, *b),
        Formula::Multiply(a, b) => multiply(*a, *b),
        Formula::Divide(a, b) => divide(*a, *b),
        Formula::Power(base, exponent) => power(*base, *exponent),
        Formula::Negate(c) => negate(*c),
        Formula::Root(degree, base) => root(*degree, *base),
        Formula::Log(base, argument) => log(*base, *argument),
        // functions and calculus nodes only reduce their operands
        other => other,
    }
}

//___________________________________SUMS____________________________________

fn add(l: Formula, r: Formula) -> Formula {
    if l.is_empty() || r.is_empty() {
        return Formula::Add(l.boxed(), r.boxed());
    }
    if r.is_zero() {
        return l;
    }
    if l.is_zero() {
        return r;
    }
    match (l, r) {
        (Formula::Symbol(a), Formula::Symbol(b)) if a.same_powers(&b) => {
            Formula::Symbol(a.with_factor(a.factor() + b.factor()))
        }
        (Formula::Add(a, b), r) => add(*a, add(*b, r)),
        (Formula::Symbol(a), Formula::Add(head, rest)) if like_terms(&a, &head) => {
            add(add(Formula::Symbol(a), *head), *rest)
        }
        (Formula::Symbol(a), Formula::Subtract(head, rest)) if like_terms(&a, &head) => {
            subtract(add(Formula::Symbol(a), *head), *rest)
        }
        (l, Formula::Symbol(b)) if b.factor() < 0.0 => subtract(l, Formula::Symbol(b.abs())),
        (l, Formula::Negate(b)) => subtract(l, *b),
        // numbers and monomials lead sums
        (l, r) if r.is_symbol_like() && !l.is_symbol_like() => add(r, l),
        (l, r) => Formula::Add(l.boxed(), r.boxed()),
    }
}

fn subtract(l: Formula, r: Formula) -> Formula {
    if l.is_empty() || r.is_empty() {
        return Formula::Subtract(l.boxed(), r.boxed());
    }
    if r.is_zero() {
        return l;
    }
    if l.is_zero() {
        return negate(r);
    }
    match (l, r) {
        (Formula::Symbol(a), Formula::Symbol(b)) if a.same_powers(&b) => {
            Formula::Symbol(a.with_factor(a.factor() - b.factor()))
        }
        (l, Formula::Symbol(b)) if b.factor() < 0.0 => add(l, Formula::Symbol(b.abs())),
        (l, Formula::Negate(b)) => add(l, *b),
        (Formula::Add(a, b), r) => add(*a, subtract(*b, r)),
        (Formula::Subtract(a, b), r) => subtract(*a, add(*b, r)),
        // a - (b + rest) = (a - b) - rest
        (Formula::Symbol(a), Formula::Add(head, rest)) if like_terms(&a, &head) => {
            subtract(subtract(Formula::Symbol(a), *head), *rest)
        }
        // a - (b - rest) = (a - b) + rest
        (Formula::Symbol(a), Formula::Subtract(head, rest)) if like_terms(&a, &head) => {
            add(subtract(Formula::Symbol(a), *head), *rest)
        }
        (l, r) => Formula::Subtract(l.boxed(), r.boxed()),
    }
}

fn like_terms(symbol: &NumericSymbol, other: &Formula) -> bool {
    other.as_symbol().is_some_and(|s| s.same_powers(symbol))
}

fn negate(formula: Formula) -> Formula {
    match formula {
        Formula::Symbol(symbol) => Formula::Symbol(symbol.negated()),
        Formula::Negate(inner) => *inner,
        other => Formula::Negate(other.boxed()),
    }
}

//___________________________________PRODUCTS____________________________________

fn multiply(l: Formula, r: Formula) -> Formula {
    if l.is_empty() || r.is_empty() {
        return Formula::Multiply(l.boxed(), r.boxed());
    }
    let (l, l_negative) = strip_sign(l);
    let (r, r_negative) = strip_sign(r);
    apply_sign(multiply_unsigned(l, r), l_negative != r_negative)
}

fn multiply_unsigned(l: Formula, r: Formula) -> Formula {
    if l.is_zero() || r.is_zero() {
        return number(0.0);
    }
    if l.is_one() {
        return r;
    }
    if r.is_one() {
        return l;
    }
    if let Some(folded) = scaled_number(&l, &r) {
        return folded;
    }
    match (l, r) {
        (Formula::Symbol(a), Formula::Symbol(b)) => Formula::Symbol(a.multiply(&b)),
        (Formula::Divide(a, b), Formula::Divide(c, d))
            if [&a, &b, &c, &d].iter().all(|x| x.is_symbol_like()) =>
        {
            divide(multiply(*a, *c), multiply(*b, *d))
        }
        (Formula::Multiply(a, b), r) => multiply(*a, multiply(*b, r)),
        (Formula::Symbol(a), Formula::Multiply(head, rest)) if head.is_symbol_like() => {
            multiply(multiply(Formula::Symbol(a), *head), *rest)
        }
        (l, Formula::Divide(numerator, denominator)) => {
            divide(multiply(l, *numerator), *denominator)
        }
        (Formula::Divide(numerator, denominator), r) => {
            divide(multiply(*numerator, r), *denominator)
        }
        // coefficients lead products
        (l, r) if r.is_symbol_like() && !l.is_symbol_like() => multiply(r, l),
        (l, Formula::Multiply(head, rest)) if head.is_symbol_like() && !l.is_symbol_like() => {
            multiply(*head, multiply(l, *rest))
        }
        // powers of ten merge, and trail the factors they scale
        (l, r) if is_power_of_ten(&l) && is_power_of_ten(&r) => ten_product(&l, &r),
        (l, Formula::Multiply(head, rest)) if is_power_of_ten(&l) && is_power_of_ten(&head) => {
            multiply(ten_product(&l, &head), *rest)
        }
        (l, Formula::Multiply(head, rest)) if is_power_of_ten(&l) => {
            multiply(*head, multiply(l, *rest))
        }
        (l, r) if is_power_of_ten(&l) => multiply(r, l),
        (l, r) => Formula::Multiply(l.boxed(), r.boxed()),
    }
}

fn is_power_of_ten(formula: &Formula) -> bool {
    matches!(formula, Formula::Power(..)) && ten_exponent(formula).is_some()
}

/// `10^a · 10^b = 10^(a+b)`
fn ten_product(l: &Formula, r: &Formula) -> Formula {
    let exponent = ten_exponent(l).unwrap_or(0.0) + ten_exponent(r).unwrap_or(0.0);
    power(number(10.0), number(exponent))
}

/// `m · 10^-k` with a plain number `m`, folded like the quotient `m / 10^k`.
fn scaled_number(l: &Formula, r: &Formula) -> Option<Formula> {
    let mantissa = l.as_number()?;
    if !is_power_of_ten(r) {
        return None;
    }
    let k = ten_exponent(r).filter(|k| *k < 0.0)?;
    let scale = 10f64.powf(-k);
    if !scale.is_finite() {
        return None;
    }
    divide_numbers(mantissa, scale)
}

//___________________________________QUOTIENTS____________________________________

fn divide(l: Formula, r: Formula) -> Formula {
    if l.is_empty() || r.is_empty() {
        return Formula::Divide(l.boxed(), r.boxed());
    }
    if let (Some(numerator), Some(denominator)) = (l.as_number(), r.as_number()) {
        return match divide_numbers(numerator, denominator) {
            Some(reduced) => reduced,
            None => Formula::Divide(l.boxed(), r.boxed()),
        };
    }
    let (l, l_negative) = strip_sign(l);
    let (r, r_negative) = strip_sign(r);
    apply_sign(divide_unsigned(l, r), l_negative != r_negative)
}

fn divide_unsigned(l: Formula, r: Formula) -> Formula {
    if r.is_one() {
        return l;
    }
    if l.is_zero() && !r.is_zero() {
        return number(0.0);
    }
    // x / 10^k is written x · 10^-k
    if let Some(k) = ten_exponent(&r) {
        return multiply(l, power(number(10.0), number(-k)));
    }
    Formula::Divide(l.boxed(), r.boxed())
}

/// Scales a pair of decimals by a common power of ten until both are integers.
fn integer_pair(numerator: f64, denominator: f64) -> Option<(i64, i64)> {
    let mut scale = 1.0;
    for _ in 0..=MAX_DECIMAL_SCALE {
        let (n, d) = (numerator * scale, denominator * scale);
        if n.abs() >= EXACT_INTEGER_LIMIT || d.abs() >= EXACT_INTEGER_LIMIT {
            return None;
        }
        let close = |x: f64| (x - x.round()).abs() <= 1e-9 * x.abs();
        if close(n) && close(d) && d >= 1.0 {
            return Some((n.round() as i64, d.round() as i64));
        }
        scale *= 10.0;
    }
    None
}

/// Exponents of 2 and 5 in `n` when it has no other prime factor.
fn two_five_exponents(mut n: i64) -> Option<(u32, u32)> {
    let mut twos = 0;
    let mut fives = 0;
    while n % 2 == 0 {
        n /= 2;
        twos += 1;
    }
    while n % 5 == 0 {
        n /= 5;
        fives += 1;
    }
    if n == 1 { Some((twos, fives)) } else { None }
}

/// Quotient of two plain numbers: an integer, a terminating decimal, scientific
/// notation, or an explicit reduced fraction with its integer part split off.
///
/// A terminating decimal with more than [`MAX_DECIMAL_DIGITS`] digits keeps its integer
/// part apart from the scientific fraction (`385/128 = 3 + 7.8125·10^-3`), so no digit
/// is lost to the rounding of numeric symbols.
///
/// `None` when the denominator is zero, which keeps the `Divide` as written.
fn divide_numbers(numerator: f64, denominator: f64) -> Option<Formula> {
    if denominator == 0.0 {
        return None;
    }
    if numerator == 0.0 {
        return Some(number(0.0));
    }
    let negative = (numerator < 0.0) != (denominator < 0.0);
    let sign = if negative { -1.0 } else { 1.0 };
    let Some((n, d)) = integer_pair(numerator.abs(), denominator.abs()) else {
        debug!("{} / {} does not scale to integers, using a decimal", numerator, denominator);
        return Some(number(numerator / denominator));
    };
    let common = n.gcd(&d);
    let (p, q) = (n / common, d / common);
    let (whole, remainder) = p.div_rem(&q);
    if remainder == 0 {
        return Some(number(sign * whole as f64));
    }
    let fraction = match two_five_exponents(q) {
        Some((twos, fives)) if twos.max(fives) <= MAX_DECIMAL_DIGITS => {
            return Some(number(sign * p as f64 / q as f64));
        }
        Some(_) => scientific(remainder as f64 / q as f64),
        None => Formula::Divide(number(remainder as f64).boxed(), number(q as f64).boxed()),
    };
    Some(match (whole, negative) {
        (0, false) => fraction,
        (0, true) => Formula::Negate(fraction.boxed()),
        (_, false) => Formula::Add(number(whole as f64).boxed(), fraction.boxed()),
        (_, true) => Formula::Subtract(number(-(whole as f64)).boxed(), fraction.boxed()),
    })
}

//___________________________________POWERS____________________________________

fn power(base: Formula, exponent: Formula) -> Formula {
    if base.is_empty() || exponent.is_empty() {
        return Formula::Power(base.boxed(), exponent.boxed());
    }
    if exponent.is_one() {
        return base;
    }
    if base.is_one() {
        return number(1.0);
    }
    if exponent.is_zero() && !base.is_zero() {
        return number(1.0);
    }
    if let Some(n) = exponent.as_number() {
        if n < 0.0 {
            if is_ten(&base) && is_whole(n) {
                return Formula::Power(base.boxed(), exponent.boxed());
            }
            return divide(number(1.0), power(base, number(-n)));
        }
        if let Formula::Symbol(symbol) = &base {
            return match symbol.pow(n) {
                Ok(folded) => beautify(folded),
                Err(err) => {
                    debug!("keeping ({})^{} explicit: {}", symbol, n, err);
                    Formula::Power(base.boxed(), exponent.boxed())
                }
            };
        }
        return Formula::Power(base.boxed(), exponent.boxed());
    }
    if let Some((a, b)) = rational_exponent(&exponent) {
        if b > 0.0 && a >= 0.0 {
            return root(number(b), power(base, number(a)));
        }
        if b > 0.0 && a < 0.0 {
            return divide(number(1.0), root(number(b), power(base, number(-a))));
        }
    }
    Formula::Power(base.boxed(), exponent.boxed())
}

/// `a/b` (or `-(a/b)`) with plain-number parts.
fn rational_exponent(exponent: &Formula) -> Option<(f64, f64)> {
    match exponent {
        Formula::Divide(a, b) => Some((a.as_number()?, b.as_number()?)),
        Formula::Negate(inner) => {
            let (a, b) = rational_exponent(inner)?;
            Some((-a, b))
        }
        _ => None,
    }
}

fn root(degree: Formula, base: Formula) -> Formula {
    if degree.is_empty() || base.is_empty() {
        return Formula::Root(degree.boxed(), base.boxed());
    }
    if degree.is_one() {
        return base;
    }
    if let (Some(n), Some(x)) = (whole_number(&degree), base.as_number()) {
        if (2.0..=64.0).contains(&n) {
            let odd = (n as i64) % 2 == 1;
            if x >= 0.0 || odd {
                let magnitude = x.abs().powf(1.0 / n).round();
                if magnitude.powi(n as i32) == x.abs() {
                    return number(if x < 0.0 { -magnitude } else { magnitude });
                }
            }
        }
    }
    Formula::Root(degree.boxed(), base.boxed())
}

fn log(base: Formula, argument: Formula) -> Formula {
    let degenerate_base = base.is_one() || base.is_zero();
    if !degenerate_base && argument.is_one() {
        return number(0.0);
    }
    if !degenerate_base && base == argument {
        return number(1.0);
    }
    Formula::Log(base.boxed(), argument.boxed())
}
