//! Normalization of numeric config values into `0x`-prefixed hex strings.

use alloy_primitives::U256;
use serde_json::Value;

use crate::{Error, Result};

/// Converts a JSON number or number-like string into its canonical `0x` hex form.
///
/// - Numbers are encoded as lowercase hex.
/// - Strings starting with `0x` are passed through untouched (no hex validation).
/// - Strings made only of decimal digits are parsed (up to 256 bits) and re-encoded as hex.
///
/// Everything else is rejected with [`Error::InvalidValue`].
pub fn normalize(value: &Value) -> Result<String> {
    match value {
        Value::Number(number) => normalize_number(number),
        Value::String(s) => normalize_str(s),
        _ => Err(Error::InvalidValue("Value should be either number or string".to_string())),
    }
}

/// String flavour of [`normalize`].
pub fn normalize_str(s: &str) -> Result<String> {
    if s.starts_with("0x") {
        return Ok(s.to_string());
    }
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_decimal(s));
    }
    let parsed = U256::from_str_radix(s, 10).map_err(|_| not_decimal(s))?;
    Ok(format!("0x{parsed:x}"))
}

fn normalize_number(number: &serde_json::Number) -> Result<String> {
    if let Some(n) = number.as_u64() {
        return Ok(format!("{n:#x}"));
    }
    // Integral floats such as `1e20` come through as f64.
    match number.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u128::MAX as f64 => {
            Ok(format!("{:#x}", f as u128))
        }
        _ => Err(Error::InvalidValue(format!(
            "{number} is not a non-negative integer (use a decimal string for large values)"
        ))),
    }
}

fn not_decimal(s: &str) -> Error {
    Error::InvalidValue(format!(
        "\"{s}\" is not a decimal number (use 0x prefix for hexadecimal numbers)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(0), "0x0")]
    #[case(json!(100), "0x64")]
    #[case(json!(255), "0xff")]
    #[case(json!(u64::MAX), "0xffffffffffffffff")]
    #[case(json!(1e20), "0x56bc75e2d63100000")]
    #[case(json!("100"), "0x64")]
    #[case(json!("0x64"), "0x64")]
    #[case(json!("0xnot-really-hex"), "0xnot-really-hex")]
    #[case(json!("1000000000000000000000000"), "0xd3c21bcecceda1000000")]
    fn test_normalize_accepts(#[case] input: Value, #[case] expected: &str) {
        assert_eq!(normalize(&input).unwrap(), expected);
    }

    #[rstest]
    #[case(json!("abc"))]
    #[case(json!(""))]
    #[case(json!("-1"))]
    #[case(json!("1.5"))]
    #[case(json!(" 12"))]
    #[case(json!(true))]
    #[case(json!(null))]
    #[case(json!([1]))]
    #[case(json!({"a": 1}))]
    #[case(json!(-5))]
    #[case(json!(1.5))]
    fn test_normalize_rejects(#[case] input: Value) {
        assert!(matches!(normalize(&input), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for n in [0u64, 1, 9, 10, 4096, 123_456_789] {
            let once = normalize(&json!(n)).unwrap();
            let twice = normalize(&Value::String(once.clone())).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_decimal_string_matches_number() {
        for n in [0u64, 7, 16, 65_535, 1_000_000_007] {
            assert_eq!(normalize(&json!(n.to_string())).unwrap(), normalize(&json!(n)).unwrap());
        }
    }

    #[test]
    fn test_decimal_string_above_u256_is_rejected() {
        let too_big = "1".repeat(80);
        assert!(matches!(normalize_str(&too_big), Err(Error::InvalidValue(_))));
    }
}
