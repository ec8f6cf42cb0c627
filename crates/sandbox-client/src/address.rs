//! Address and private key validation.

use alloy_primitives::{hex, keccak256};
use serde_json::Value;

use crate::{Error, Result};

/// Returns true if `s` is `0x` followed by exactly `digits` lowercase hex characters.
fn is_prefixed_lower_hex(s: &str, digits: usize) -> bool {
    s.strip_prefix("0x").is_some_and(|rest| {
        rest.len() == digits &&
            rest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    })
}

/// Validates an address string. Only the lowercase, `0x`-prefixed, 40-digit form is accepted.
pub fn validate_address(s: &str) -> Result<&str> {
    if is_prefixed_lower_hex(s, 40) {
        Ok(s)
    } else {
        Err(Error::InvalidAddress(
            "Address should be a string with 0x prefix and 40 characters".to_string(),
        ))
    }
}

/// [`validate_address`] over an arbitrary JSON value.
pub fn validate_address_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => validate_address(s).map(str::to_string),
        _ => validate_address("").map(str::to_string),
    }
}

/// Resolves private key material.
///
/// A `0x`-prefixed 64-digit lowercase hex string is returned unchanged; any other string is
/// treated as a pass-phrase and hashed with keccak-256.
pub fn resolve_private_key(raw: &Value) -> Result<String> {
    let Value::String(raw) = raw else {
        return Err(Error::InvalidKey(
            "Private key should be a hexadecimal hash (64 symbols) or a string".to_string(),
        ));
    };
    if is_prefixed_lower_hex(raw, 64) {
        return Ok(raw.clone());
    }
    Ok(format!("0x{}", hex::encode(keccak256(raw.as_bytes()))))
}
