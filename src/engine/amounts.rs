// src/engine/amounts.rs
//
// Lossless conversion between fixed-point integer ("smallest unit") strings
// and human-readable decimal strings. Token amounts routinely exceed the
// 53-bit float-safe range (an 18-decimal token in the billions is > 2^53),
// so everything here runs on U256 and digit strings, never on f64.
//
// Fractional digits beyond `decimals` (or `max_decimals` when pretty
// printing) are truncated, never rounded.

use ethers_core::types::U256;

use crate::chains::MAX_DECIMALS;
use crate::engine::errors::SwapError;

fn check_decimals(decimals: u32) -> Result<(), SwapError> {
    if decimals > MAX_DECIMALS {
        return Err(SwapError::InvalidFormat(format!(
            "decimals must be between 0 and {}, got {}",
            MAX_DECIMALS, decimals
        )));
    }
    Ok(())
}

/// Parse a smallest-unit amount string into a U256, rejecting anything that
/// is not a plain non-negative base-10 integer.
pub fn parse_smallest_unit(amount: &str) -> Result<U256, SwapError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(SwapError::InvalidAmount("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(SwapError::InvalidAmount(
            "amount must be non-negative".to_string(),
        ));
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(SwapError::InvalidAmount(format!(
            "amount must be an integer in the token's smallest unit, got '{}'",
            trimmed
        )));
    }
    U256::from_dec_str(trimmed)
        .map_err(|_| SwapError::InvalidAmount("amount exceeds the supported range".to_string()))
}

/// Convert a human decimal string (e.g. "1.5") to a smallest-unit integer
/// string (e.g. "1500000000000000000" for 18 decimals). Fractional digits
/// beyond `decimals` are truncated.
pub fn to_smallest_unit(human_amount: &str, decimals: u32) -> Result<String, SwapError> {
    check_decimals(decimals)?;

    let trimmed = human_amount.trim();
    if trimmed.is_empty() {
        return Err(SwapError::InvalidFormat("amount is empty".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(SwapError::InvalidFormat(
            "negative amounts are not valid token quantities".to_string(),
        ));
    }
    if trimmed.contains(['e', 'E']) {
        return Err(SwapError::InvalidFormat(
            "scientific notation is not supported".to_string(),
        ));
    }
    if trimmed.matches('.').count() > 1 {
        return Err(SwapError::InvalidFormat(format!(
            "'{}' has more than one decimal point",
            trimmed
        )));
    }

    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(SwapError::InvalidFormat("amount is empty".to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(SwapError::InvalidFormat(format!(
            "'{}' is not a decimal number",
            trimmed
        )));
    }

    // Truncate excess fractional digits, pad the rest to `decimals` width.
    let frac_truncated = if frac.len() > decimals as usize {
        &frac[..decimals as usize]
    } else {
        frac
    };
    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(frac_truncated);
    for _ in frac_truncated.len()..decimals as usize {
        digits.push('0');
    }
    if digits.is_empty() {
        digits.push('0');
    }

    let value = U256::from_dec_str(&digits)
        .map_err(|_| SwapError::InvalidFormat("amount exceeds the supported range".to_string()))?;
    Ok(value.to_string())
}

/// Convert a smallest-unit integer string to a human decimal string by
/// inserting a decimal point `decimals` digits from the right. Trailing
/// fractional zeros are stripped; a whole result is returned bare.
pub fn to_human_unit(smallest_unit_amount: &str, decimals: u32) -> Result<String, SwapError> {
    check_decimals(decimals)?;

    let trimmed = smallest_unit_amount.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(SwapError::InvalidFormat(format!(
            "'{}' is not a non-negative integer",
            trimmed
        )));
    }
    let value = U256::from_dec_str(trimmed)
        .map_err(|_| SwapError::InvalidFormat("amount exceeds the supported range".to_string()))?;
    // Canonical digits: U256 display strips leading zeros.
    let digits = value.to_string();

    if decimals == 0 {
        return Ok(digits);
    }

    let padded = if digits.len() <= decimals as usize {
        format!("{}{}", "0".repeat(decimals as usize + 1 - digits.len()), digits)
    } else {
        digits
    };
    let split_at = padded.len() - decimals as usize;
    let whole = &padded[..split_at];
    let frac = padded[split_at..].trim_end_matches('0');

    if frac.is_empty() {
        Ok(whole.to_string())
    } else {
        Ok(format!("{}.{}", whole, frac))
    }
}

/// Human-readable formatting for display: as `to_human_unit`, with the
/// fractional part truncated to at most `max_decimals` digits.
pub fn pretty_format(
    smallest_unit_amount: &str,
    decimals: u32,
    max_decimals: u32,
) -> Result<String, SwapError> {
    let human = to_human_unit(smallest_unit_amount, decimals)?;
    let Some((whole, frac)) = human.split_once('.') else {
        return Ok(human);
    };
    let truncated = if frac.len() > max_decimals as usize {
        &frac[..max_decimals as usize]
    } else {
        frac
    };
    let truncated = truncated.trim_end_matches('0');
    if truncated.is_empty() {
        Ok(whole.to_string())
    } else {
        Ok(format!("{}.{}", whole, truncated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_whole_amounts() {
        assert_eq!(to_smallest_unit("1", 18).unwrap(), "1000000000000000000");
        assert_eq!(to_smallest_unit("0", 18).unwrap(), "0");
        assert_eq!(to_smallest_unit("42", 0).unwrap(), "42");
    }

    #[test]
    fn converts_fractional_amounts() {
        assert_eq!(to_smallest_unit("1.5", 18).unwrap(), "1500000000000000000");
        assert_eq!(to_smallest_unit("0.000001", 6).unwrap(), "1");
        assert_eq!(to_smallest_unit(".5", 2).unwrap(), "50");
    }

    #[test]
    fn truncates_excess_fraction_instead_of_rounding() {
        assert_eq!(to_smallest_unit("1.23456789", 4).unwrap(), "12345");
        assert_eq!(to_smallest_unit("0.999999999", 2).unwrap(), "99");
    }

    #[test]
    fn rejects_malformed_human_amounts() {
        assert!(to_smallest_unit("", 18).is_err());
        assert!(to_smallest_unit("-1.5", 18).is_err());
        assert!(to_smallest_unit("1.2.3", 18).is_err());
        assert!(to_smallest_unit("1e18", 18).is_err());
        assert!(to_smallest_unit("abc", 18).is_err());
        assert!(to_smallest_unit("1.5", 31).is_err());
    }

    #[test]
    fn human_unit_inserts_the_point() {
        assert_eq!(to_human_unit("1500000000000000000", 18).unwrap(), "1.5");
        assert_eq!(to_human_unit("1", 18).unwrap(), "0.000000000000000001");
        assert_eq!(to_human_unit("1000000", 6).unwrap(), "1");
        assert_eq!(to_human_unit("123", 0).unwrap(), "123");
        assert_eq!(to_human_unit("0", 18).unwrap(), "0");
    }

    #[test]
    fn human_unit_rejects_non_integers() {
        assert!(to_human_unit("-5", 18).is_err());
        assert!(to_human_unit("1.5", 18).is_err());
        assert!(to_human_unit("", 18).is_err());
        assert!(to_human_unit("0x10", 18).is_err());
    }

    #[test]
    fn round_trips_exactly() {
        for (value, decimals) in [
            ("1000000000000000000", 18),
            ("1", 18),
            ("123456789", 6),
            ("5000000000000000000000000000", 18),
            ("7", 0),
        ] {
            let human = to_human_unit(value, decimals).unwrap();
            assert_eq!(to_smallest_unit(&human, decimals).unwrap(), value);
        }
    }

    #[test]
    fn pretty_format_truncates_never_rounds() {
        // 1.234567890123456789 to 4 places truncates to 1.2345, not 1.2346.
        assert_eq!(
            pretty_format("1234567890123456789", 18, 4).unwrap(),
            "1.2345"
        );
        assert_eq!(pretty_format("1000000000000000000", 18, 6).unwrap(), "1");
        assert_eq!(pretty_format("1999999", 6, 2).unwrap(), "1.99");
        assert_eq!(pretty_format("1000001", 6, 2).unwrap(), "1");
    }

    #[test]
    fn parses_smallest_unit_strictly() {
        assert_eq!(
            parse_smallest_unit("1000000000000000000").unwrap(),
            U256::from_dec_str("1000000000000000000").unwrap()
        );
        assert!(parse_smallest_unit("1.5").is_err());
        assert!(parse_smallest_unit("-1").is_err());
        assert!(parse_smallest_unit("").is_err());
    }

    #[test]
    fn handles_amounts_beyond_f64_precision() {
        // 9007199254740993 is 2^53 + 1, unrepresentable in f64.
        let value = "9007199254740993000000000000000000";
        let human = to_human_unit(value, 18).unwrap();
        assert_eq!(human, "9007199254740993");
        assert_eq!(to_smallest_unit(&human, 18).unwrap(), value);
    }
}
