//! Numeric field parsing.
//!
//! Numeric fields travel as text. [`parse_number`] keeps the ledger's
//! historical contract: anything that does not parse becomes `-1`, and that
//! value flows into later comparisons. [`try_parse_number`] is the explicit
//! variant for callers that need to tell the two apart.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Value returned by [`parse_number`] for text that is not a number.
pub const NUMBER_SENTINEL: Decimal = Decimal::NEGATIVE_ONE;

/// Parse decimal text, accepting plain (`"12.50"`) and scientific (`"1e3"`)
/// notation. Surrounding whitespace is not accepted.
pub fn try_parse_number(text: &str) -> Option<Decimal> {
    if text.is_empty() || text.trim() != text {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Parse decimal text, returning [`NUMBER_SENTINEL`] on failure.
pub fn parse_number(text: &str) -> Decimal {
    try_parse_number(text).unwrap_or(NUMBER_SENTINEL)
}

/// Render an amount without trailing fractional zeros (`1050.00` -> `"1050"`).
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}
