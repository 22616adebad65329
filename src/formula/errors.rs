use std::fmt;

/// Error types produced by the formula passes, the engine bridge and persistence.
///
/// Canonicalization and layout never surface these for `Empty` operands: only
/// evaluation/approximation reports `EmptyOperand`. Errors raised inside a single
/// canonicalization rule are swallowed by the canonicalizer, which leaves that
/// subtree unreduced.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// an operation was evaluated with an unfilled slot (index of the slot)
    EmptyOperand(usize),
    /// approximation requested on a subtree that has no constant real value
    NotConstant,
    /// tree <-> engine mapping failure
    ConversionError(String),
    /// integer literal above the signed 64-bit range
    ValueTooLarge(String),
    /// integer literal below the signed 64-bit range
    ValueTooSmall(String),
    /// folding an exponent into a symbol's stored powers would leave a non-integer power
    NonIntegerPowerFold { exponent: f64 },
    /// child index outside the node's arity
    ChildIndexOutOfRange { index: usize, arity: usize },
    /// malformed persisted document
    Persistence(String),
    /// malformed configuration or logger setup
    Config(String),
    /// malformed formula text
    Parse(String),
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormulaError::EmptyOperand(index) => {
                write!(f, "Operand {} is empty and cannot be evaluated", index)
            }
            FormulaError::NotConstant => write!(f, "Expression has no constant real value"),
            FormulaError::ConversionError(msg) => write!(f, "Conversion error: {}", msg),
            FormulaError::ValueTooLarge(msg) => write!(f, "Value too large: {}", msg),
            FormulaError::ValueTooSmall(msg) => write!(f, "Value too small: {}", msg),
            FormulaError::NonIntegerPowerFold { exponent } => write!(
                f,
                "Exponent {} cannot be folded into integer symbol powers",
                exponent
            ),
            FormulaError::ChildIndexOutOfRange { index, arity } => write!(
                f,
                "Child index {} is out of range for a node of arity {}",
                index, arity
            ),
            FormulaError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            FormulaError::Config(msg) => write!(f, "Configuration error: {}", msg),
            FormulaError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for FormulaError {}

impl From<quick_xml::Error> for FormulaError {
    fn from(err: quick_xml::Error) -> Self {
        FormulaError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for FormulaError {
    fn from(err: std::io::Error) -> Self {
        FormulaError::Persistence(err.to_string())
    }
}
