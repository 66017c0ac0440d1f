// Operation Registry
//
// Maps operation names to pure binary functions over decimals.
// Nothing in this module touches calculator state.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, MathematicalOps};

/// A binary arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    /// nth root computed as `a^(1/n)`.
    Root,
    Modulus,
    IntDivide,
    /// `a / b * 100`.
    Percent,
    AbsDiff,
}

/// Why an operand was rejected.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OperandError {
    #[error("value {0:?} is not numeric")]
    NotNumeric(String),

    #[error("division by zero is not allowed")]
    DivisionByZero,

    #[error("root degree cannot be zero")]
    ZeroRootDegree,

    #[error("value {value} exceeds the maximum allowed magnitude {max}")]
    OutOfRange { value: Decimal, max: Decimal },

    #[error("{operation} overflowed the decimal range")]
    Overflow { operation: Operation },

    #[error("{0}")]
    Domain(String),
}

/// Errors raised while resolving or applying an operation.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("unknown operation '{name}'. Available: {available}")]
    UnknownOperation { name: String, available: String },

    #[error("invalid operand: {0}")]
    InvalidOperand(#[from] OperandError),
}

impl Operation {
    /// Every registered operation, in menu order.
    pub const ALL: [Operation; 10] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
        Operation::Power,
        Operation::Root,
        Operation::Modulus,
        Operation::IntDivide,
        Operation::Percent,
        Operation::AbsDiff,
    ];

    /// Registered name, as accepted by [`Operation::resolve`].
    pub fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
            Operation::Root => "root",
            Operation::Modulus => "modulus",
            Operation::IntDivide => "int_divide",
            Operation::Percent => "percent",
            Operation::AbsDiff => "abs_diff",
        }
    }

    /// Look up an operation by name, ignoring case.
    pub fn resolve(name: &str) -> Result<Operation, OperationError> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OperationError::UnknownOperation {
                name: name.to_string(),
                available: Self::available_names(),
            })
    }

    /// Sorted, comma separated list of registered names.
    pub fn available_names() -> String {
        let mut names: Vec<&str> = Self::ALL.iter().map(|op| op.name()).collect();
        names.sort_unstable();
        names.join(", ")
    }

    /// Apply the operation to two operands.
    ///
    /// The raw result is returned unrounded; the engine owns precision.
    pub fn apply(self, a: Decimal, b: Decimal) -> Result<Decimal, OperationError> {
        let overflow = || OperandError::Overflow { operation: self };

        let value = match self {
            Operation::Add => a.checked_add(b).ok_or_else(overflow)?,
            Operation::Subtract => a.checked_sub(b).ok_or_else(overflow)?,
            Operation::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
            Operation::Divide => {
                non_zero_divisor(b)?;
                a.checked_div(b).ok_or_else(overflow)?
            }
            Operation::Power => power(self, a, b)?,
            Operation::Root => {
                if b.is_zero() {
                    return Err(OperandError::ZeroRootDegree.into());
                }
                let exponent = Decimal::ONE.checked_div(b).ok_or_else(overflow)?;
                power(self, a, exponent)?
            }
            Operation::Modulus => {
                non_zero_divisor(b)?;
                a.checked_rem(b).ok_or_else(overflow)?
            }
            Operation::IntDivide => {
                non_zero_divisor(b)?;
                a.checked_div(b).ok_or_else(overflow)?.trunc()
            }
            Operation::Percent => {
                non_zero_divisor(b)?;
                a.checked_div(b)
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                    .ok_or_else(overflow)?
            }
            Operation::AbsDiff => a.checked_sub(b).ok_or_else(overflow)?.abs(),
        };

        Ok(value)
    }
}

fn non_zero_divisor(divisor: Decimal) -> Result<(), OperandError> {
    if divisor.is_zero() {
        Err(OperandError::DivisionByZero)
    } else {
        Ok(())
    }
}

fn power(operation: Operation, base: Decimal, exponent: Decimal) -> Result<Decimal, OperandError> {
    if base.is_sign_negative() && !base.is_zero() && !exponent.fract().is_zero() {
        return Err(OperandError::Domain(format!(
            "{} of negative base {base} with fractional exponent {exponent} is undefined",
            operation.name()
        )));
    }
    if base.is_zero() && exponent.is_sign_negative() {
        return Err(OperandError::DivisionByZero);
    }
    match base.checked_powd(exponent) {
        Some(value) => Ok(value),
        // |base| > 1 with a negative exponent can only fail by underflowing
        None if exponent.is_sign_negative() && base.abs() > Decimal::ONE => Ok(Decimal::ZERO),
        None => Err(OperandError::Overflow { operation }),
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::resolve(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn apply(name: &str, a: &str, b: &str) -> Result<Decimal, OperationError> {
        Operation::resolve(name)?.apply(dec(a), dec(b))
    }

    #[test]
    fn resolve_is_case_insensitive() {
        assert_eq!(Operation::resolve("ADD").unwrap(), Operation::Add);
        assert_eq!(Operation::resolve("Int_Divide").unwrap(), Operation::IntDivide);
        assert_eq!("abs_diff".parse::<Operation>().unwrap(), Operation::AbsDiff);
    }

    #[test]
    fn unknown_operation_lists_available_names() {
        let err = Operation::resolve("sqrt").unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, OperationError::UnknownOperation { .. }));
        assert!(msg.contains("sqrt"));
        assert!(msg.contains("abs_diff, add, divide"));
    }

    #[test]
    fn basic_arithmetic() {
        assert_eq!(apply("add", "2", "3").unwrap(), dec("5"));
        assert_eq!(apply("subtract", "2", "3").unwrap(), dec("-1"));
        assert_eq!(apply("multiply", "2.5", "4").unwrap(), dec("10"));
        assert_eq!(apply("divide", "7", "2").unwrap(), dec("3.5"));
        assert_eq!(apply("power", "2", "10").unwrap(), dec("1024"));
        assert_eq!(apply("percent", "25", "100").unwrap(), dec("25"));
        assert_eq!(apply("abs_diff", "3", "10").unwrap(), dec("7"));
    }

    #[test]
    fn integer_division_and_modulus_follow_dividend_sign() {
        assert_eq!(apply("int_divide", "7", "2").unwrap(), dec("3"));
        assert_eq!(apply("int_divide", "-7", "2").unwrap(), dec("-3"));
        assert_eq!(apply("modulus", "7", "3").unwrap(), dec("1"));
        assert_eq!(apply("modulus", "-7", "3").unwrap(), dec("-1"));
    }

    #[test]
    fn root_of_perfect_square() {
        let value = apply("root", "16", "2").unwrap();
        assert_eq!(value.round_dp(4), dec("4"));
    }

    #[test]
    fn zero_divisors_are_rejected() {
        for name in ["divide", "int_divide", "modulus", "percent"] {
            let err = apply(name, "1", "0").unwrap_err();
            assert_eq!(
                err,
                OperationError::InvalidOperand(OperandError::DivisionByZero),
                "{name}"
            );
        }
    }

    #[test]
    fn zero_root_degree_is_rejected() {
        let err = apply("root", "9", "0").unwrap_err();
        assert_eq!(
            err,
            OperationError::InvalidOperand(OperandError::ZeroRootDegree)
        );
    }

    #[test]
    fn fractional_power_of_negative_base_is_rejected() {
        let err = apply("root", "-8", "2").unwrap_err();
        assert!(matches!(
            err,
            OperationError::InvalidOperand(OperandError::Domain(_))
        ));
        assert_eq!(apply("power", "-2", "3").unwrap(), dec("-8"));
    }

    #[test]
    fn negative_exponent_underflow_is_zero() {
        assert_eq!(apply("power", "10", "-29").unwrap(), Decimal::ZERO);
        assert_eq!(apply("power", "2", "-100").unwrap(), Decimal::ZERO);
        assert_eq!(apply("power", "-2", "-101").unwrap(), Decimal::ZERO);
        assert_eq!(
            apply("root", "16", "-0.0000000000000000000000000001").unwrap(),
            Decimal::ZERO
        );
        assert!(matches!(
            apply("power", "10", "29").unwrap_err(),
            OperationError::InvalidOperand(OperandError::Overflow { .. })
        ));
    }

    #[test]
    fn overflow_is_reported() {
        let err = Operation::Multiply
            .apply(Decimal::MAX, Decimal::TWO)
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::InvalidOperand(OperandError::Overflow { .. })
        ));
    }
}
