//! Comparison of an evaluated object against the expected type/value pair.

use thiserror::Error;

use acpihost_interp::{Object, ObjectType};

/// Result type the test author asked for (`int` / `str` on the command line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    Integer,
    String,
}

impl ExpectedType {
    /// Map an invocation token to a type. Unsupported tokens are a
    /// configuration error the caller reports before any evaluation happens.
    pub fn parse(token: &str) -> Option<ExpectedType> {
        match token {
            "int" => Some(ExpectedType::Integer),
            "str" => Some(ExpectedType::String),
            _ => None,
        }
    }

    fn object_type(self) -> ObjectType {
        match self {
            ExpectedType::Integer => ObjectType::Integer,
            ExpectedType::String => ObjectType::String,
        }
    }
}

/// The expected result of evaluating the main test method.
#[derive(Debug, Clone)]
pub struct Expected {
    pub ty: ExpectedType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("returned type '{actual}' doesn't match expected '{expected}'")]
    TypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },
    #[error("returned value '{actual}' doesn't match expected '{expected}'")]
    ValueMismatch { expected: String, actual: String },
    #[error("expected value '{0}' is not a valid integer literal")]
    BadIntegerLiteral(String),
}

/// Parse an unsigned integer with automatic base detection: `0x`/`0X` for
/// hex, a leading `0` for octal, decimal otherwise.
pub fn parse_u64_auto(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).ok();
    }
    if trimmed != "0" {
        if let Some(octal) = trimmed.strip_prefix('0') {
            return u64::from_str_radix(octal, 8).ok();
        }
    }
    trimmed.parse().ok()
}

/// Confirm the object's type tag matches, then compare the value.
pub fn check(object: &Object, expected: &Expected) -> Result<(), ValidationError> {
    let want = expected.ty.object_type();
    let got = object.object_type();
    if got != want {
        return Err(ValidationError::TypeMismatch {
            expected: want,
            actual: got,
        });
    }

    match object {
        Object::Integer(actual) => {
            let wanted = parse_u64_auto(&expected.value)
                .ok_or_else(|| ValidationError::BadIntegerLiteral(expected.value.clone()))?;
            if *actual != wanted {
                return Err(ValidationError::ValueMismatch {
                    expected: expected.value.clone(),
                    actual: actual.to_string(),
                });
            }
        }
        Object::String(actual) => {
            if *actual != expected.value {
                return Err(ValidationError::ValueMismatch {
                    expected: expected.value.clone(),
                    actual: actual.clone(),
                });
            }
        }
    }
    Ok(())
}
