//! Token amount parsing and display. All amounts are integers in the
//! 6-decimal atomic denomination; no floating point is involved anywhere.

use crate::types::AmountError;

/// Atomic units per whole token.
pub const DENOMINATION: u128 = 1_000_000;

const MILLION: u128 = 1_000_000;
const BILLION: u128 = 1_000_000_000;
const TRILLION: u128 = 1_000_000_000_000;

/// Parse a user-entered decimal amount into atomic units.
///
/// Accepts plain integers and decimal notation with up to six fractional
/// digits (extra digits are truncated). Rejects empty input, non-numeric
/// input, zero/negative amounts, and amounts above `available`.
pub fn parse_amount(input: &str, available: u128) -> Result<u128, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let (int_part, dec_part) = match trimmed.split_once('.') {
        Some((i, d)) => (i, d),
        None => (trimmed, ""),
    };

    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !dec_part.chars().all(|c| c.is_ascii_digit())
        || (int_part.is_empty() && dec_part.is_empty())
    {
        return Err(AmountError::Invalid);
    }

    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| AmountError::Invalid)?
    };

    // Pad to the full six fractional digits, truncating anything beyond.
    let mut frac_digits = String::from(dec_part);
    frac_digits.truncate(6);
    while frac_digits.len() < 6 {
        frac_digits.push('0');
    }
    let frac: u128 = frac_digits.parse().map_err(|_| AmountError::Invalid)?;

    let amount = whole
        .checked_mul(DENOMINATION)
        .and_then(|v| v.checked_add(frac))
        .ok_or(AmountError::Invalid)?;

    if amount == 0 {
        return Err(AmountError::NotPositive);
    }
    if amount > available {
        return Err(AmountError::InsufficientBalance(format_balance(available)));
    }

    Ok(amount)
}

/// Format an atomic-unit balance for display.
///
/// Whole-token values of a million or more compress to `M`/`B`/`T` with up
/// to two decimals; smaller values show thousands separators and up to six
/// fractional digits. Trailing zeros are trimmed either way.
pub fn format_balance(balance: u128) -> String {
    let whole = balance / DENOMINATION;
    let frac = balance % DENOMINATION;

    for (threshold, suffix) in [(TRILLION, "T"), (BILLION, "B"), (MILLION, "M")] {
        if whole >= threshold {
            let units = whole / threshold;
            let remainder = whole % threshold;
            let hundredths = (remainder * 100) / threshold;

            if hundredths == 0 && frac == 0 {
                return format!("{}{suffix}", group_thousands(units));
            }
            let decimals = format!("{hundredths:02}");
            let decimals = decimals.trim_end_matches('0');
            if decimals.is_empty() {
                return format!("{}{suffix}", group_thousands(units));
            }
            return format!("{}.{decimals}{suffix}", group_thousands(units));
        }
    }

    if frac == 0 {
        group_thousands(whole)
    } else {
        let frac_str = format!("{frac:06}");
        let frac_str = frac_str.trim_end_matches('0');
        format!("{}.{frac_str}", group_thousands(whole))
    }
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLENTY: u128 = u128::MAX;

    #[test]
    fn parses_decimal_notation_at_six_decimal_scale() {
        assert_eq!(parse_amount("1.5", PLENTY).unwrap(), 1_500_000);
        assert_eq!(parse_amount("2.5", PLENTY).unwrap(), 2_500_000);
        assert_eq!(parse_amount("0.000001", PLENTY).unwrap(), 1);
        assert_eq!(parse_amount("10", PLENTY).unwrap(), 10_000_000);
        assert_eq!(parse_amount(".25", PLENTY).unwrap(), 250_000);
    }

    #[test]
    fn truncates_excess_fractional_digits() {
        assert_eq!(parse_amount("1.9999999", PLENTY).unwrap(), 1_999_999);
    }

    #[test]
    fn rejects_zero() {
        assert_eq!(parse_amount("0", PLENTY), Err(AmountError::NotPositive));
        assert_eq!(parse_amount("0.0", PLENTY), Err(AmountError::NotPositive));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_amount("abc", PLENTY), Err(AmountError::Invalid));
        assert_eq!(parse_amount("-1", PLENTY), Err(AmountError::Invalid));
        assert_eq!(parse_amount("1.2.3", PLENTY), Err(AmountError::Invalid));
        assert_eq!(parse_amount(".", PLENTY), Err(AmountError::Invalid));
        assert_eq!(parse_amount("", PLENTY), Err(AmountError::Empty));
    }

    #[test]
    fn rejects_amounts_above_available_balance() {
        let err = parse_amount("3", 2_500_000).unwrap_err();
        assert!(matches!(err, AmountError::InsufficientBalance(_)));
        assert!(err.to_string().contains("insufficient balance"));
        // Exactly the available balance is fine.
        assert_eq!(parse_amount("2.5", 2_500_000).unwrap(), 2_500_000);
    }

    #[test]
    fn formats_small_balances_with_separators_and_fraction() {
        assert_eq!(format_balance(0), "0");
        assert_eq!(format_balance(1_500_000), "1.5");
        assert_eq!(format_balance(2_500_000_000), "2,500");
        assert_eq!(format_balance(123_456_789), "123.456789");
        assert_eq!(format_balance(999_999 * DENOMINATION), "999,999");
    }

    #[test]
    fn formats_large_balances_with_suffix() {
        assert_eq!(format_balance(1_000_000 * DENOMINATION), "1M");
        assert_eq!(format_balance(1_500_000 * DENOMINATION), "1.5M");
        assert_eq!(format_balance(2_340_000_000 * DENOMINATION), "2.34B");
        assert_eq!(format_balance(5_000_000_000_000 * DENOMINATION), "5T");
    }
}
