//! Lexical checks for flag value literals.

use crate::registry::FlagType;
use thiserror::Error;

/// A literal that does not match the syntax of its flag type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {flag_type} value ({value})")]
pub struct ValidationError {
    pub flag_type: FlagType,
    pub value: String,
}

impl ValidationError {
    pub fn new(flag_type: FlagType, value: &str) -> Self {
        Self {
            flag_type,
            value: value.to_string(),
        }
    }
}

/// Accepts exactly `true`, `t`, `0`, `false`, `f` and `1`.
pub fn is_boolean(value: &str) -> bool {
    matches!(value, "true" | "t" | "0" | "false" | "f" | "1")
}

/// One or more ASCII digits, nothing else.
pub fn is_unsigned_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// An optional leading `-` followed by digits.
pub fn is_integer(value: &str) -> bool {
    is_unsigned_integer(value.strip_prefix('-').unwrap_or(value))
}

/// Any integer literal, or `[-]digits.digits`. No exponents.
pub fn is_float(value: &str) -> bool {
    if is_integer(value) {
        return true;
    }
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    match unsigned.split_once('.') {
        Some((whole, fraction)) => is_unsigned_integer(whole) && is_unsigned_integer(fraction),
        None => false,
    }
}

/// Check `value` against the syntax of `flag_type`.
pub fn validate(flag_type: FlagType, value: &str) -> Result<(), ValidationError> {
    let valid = match flag_type {
        FlagType::Boolean => is_boolean(value),
        FlagType::Float => is_float(value),
        FlagType::Integer => is_integer(value),
        FlagType::Unsigned => is_unsigned_integer(value),
        FlagType::String => true,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new(flag_type, value))
    }
}
