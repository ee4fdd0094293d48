//! Human-facing amount text: abbreviated display and suffix-aware parsing.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::AmountParseError;

const THOUSAND: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
const BILLION: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
// 1e12 = 232 * 2^32 + 3_567_587_328
const TRILLION: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Abbreviates an amount for display: `1.5B`, `2.0M`, `12.3k`, or a whole
/// number below one thousand. Abbreviated tiers keep one decimal digit;
/// halves round away from zero.
pub fn format_amount(amount: Decimal) -> String {
    let tiers = [(BILLION, "B"), (MILLION, "M"), (THOUSAND, "k")];
    for (threshold, suffix) in tiers {
        if amount >= threshold {
            let scaled = (amount / threshold)
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            return format!("{:.1}{}", scaled, suffix);
        }
    }
    let whole = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.0}", whole)
}

/// Parses user-entered amount text such as `1.5k`, `2,000` or `3M`.
///
/// Matching is case-insensitive, thousands commas are ignored and a single
/// trailing `k`, `m`, `b` or `t` multiplies by 1e3, 1e6, 1e9 or 1e12. Negative
/// literals parse successfully; rejecting them is up to the caller.
pub fn parse_amount(text: &str) -> Result<Decimal, AmountParseError> {
    let cleaned = text.trim().to_lowercase().replace(',', "");
    if cleaned.is_empty() {
        return Err(AmountParseError::Empty);
    }

    let (number, multiplier) = match cleaned.char_indices().last() {
        Some((idx, 'k')) => (&cleaned[..idx], THOUSAND),
        Some((idx, 'm')) => (&cleaned[..idx], MILLION),
        Some((idx, 'b')) => (&cleaned[..idx], BILLION),
        Some((idx, 't')) => (&cleaned[..idx], TRILLION),
        _ => (cleaned.as_str(), Decimal::ONE),
    };

    let value = Decimal::from_str(number.trim())
        .map_err(|_| AmountParseError::Invalid(text.to_owned()))?;
    value
        .checked_mul(multiplier)
        .ok_or(AmountParseError::Overflow)
}
