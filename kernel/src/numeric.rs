// Decimal Helpers
//
// Rounding, display formatting and operand parsing shared by the
// engine, the persistence layer and the CLI.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::operations::OperandError;

/// Largest number of fractional digits a `Decimal` can carry.
pub const MAX_PRECISION: u32 = 28;

/// Round half away from zero to `precision` fractional digits.
///
/// The result is padded to `precision` digits after the point, so `5`
/// rounds to `5.0000` at precision 4. Near `Decimal::MAX` the 96-bit
/// mantissa has no room for the padding and the scale stays smaller.
pub fn round_result(value: Decimal, precision: u32) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(precision);
    rounded
}

/// Render a value for display and persistence.
///
/// Whole numbers render without a fractional part; everything else is
/// rounded to `precision` digits.
pub fn display_value(value: Decimal, precision: u32) -> String {
    if value.fract().is_zero() {
        let mut whole = value.trunc();
        whole.rescale(0);
        whole.to_string()
    } else {
        round_result(value, precision).to_string()
    }
}

/// Parse user or file input into a decimal operand.
///
/// Accepts plain (`12.5`) and scientific (`1.25e1`) notation. Values whose
/// magnitude exceeds `max` are rejected.
pub fn parse_operand(raw: &str, max: Decimal) -> Result<Decimal, OperandError> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| OperandError::NotNumeric(trimmed.to_string()))?;

    check_magnitude(value, max)?;
    Ok(value)
}

/// Reject values whose absolute value is above `max`.
pub fn check_magnitude(value: Decimal, max: Decimal) -> Result<(), OperandError> {
    if value.abs() > max {
        return Err(OperandError::OutOfRange { value, max });
    }
    Ok(())
}
