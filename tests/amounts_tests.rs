//! Conversion properties of the amount codec, exercised through the public
//! API the MCP convert tool uses.

use swap_mcp_server::engine::amounts::{
    parse_smallest_unit, pretty_format, to_human_unit, to_smallest_unit,
};

#[test]
fn round_trip_across_the_full_decimals_range() {
    let values = [
        "0",
        "1",
        "999",
        "1000000000000000000",
        "123456789123456789123456789",
        "9007199254740993", // 2^53 + 1, not representable in f64
    ];
    for decimals in 0..=30u32 {
        for value in values {
            let human = to_human_unit(value, decimals).unwrap();
            let back = to_smallest_unit(&human, decimals).unwrap();
            assert_eq!(
                back, value,
                "round trip failed for {} at {} decimals (human: {})",
                value, decimals, human
            );
        }
    }
}

#[test]
fn truncates_instead_of_rounding() {
    assert_eq!(to_smallest_unit("1.23456789", 4).unwrap(), "12345");
    // Pretty formatting follows the same truncation policy.
    assert_eq!(
        pretty_format("1234567890123456789", 18, 4).unwrap(),
        "1.2345"
    );
}

#[test]
fn rejects_negative_amounts_in_both_directions() {
    assert!(to_smallest_unit("-1.5", 18).is_err());
    assert!(to_human_unit("-1", 18).is_err());
    assert!(parse_smallest_unit("-1000").is_err());
}

#[test]
fn rejects_scientific_notation_and_double_points() {
    assert!(to_smallest_unit("1e18", 18).is_err());
    assert!(to_smallest_unit("1.2E3", 18).is_err());
    assert!(to_smallest_unit("1.2.3", 18).is_err());
}

#[test]
fn pretty_format_default_width() {
    assert_eq!(pretty_format("1234567890123456789", 18, 6).unwrap(), "1.234567");
    assert_eq!(pretty_format("5000000", 6, 6).unwrap(), "5");
    assert_eq!(pretty_format("1", 18, 6).unwrap(), "0");
}

#[test]
fn strips_trailing_zeros_but_keeps_significant_ones() {
    assert_eq!(to_human_unit("1500000000000000000", 18).unwrap(), "1.5");
    assert_eq!(to_human_unit("1050000000000000000", 18).unwrap(), "1.05");
    assert_eq!(to_human_unit("2000000000000000000", 18).unwrap(), "2");
}
