use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const CODE_LEN: usize = 3;

/// Normalized ISO 4217 currency code. Always 3 upper-case ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and normalize a code to upper-case.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCurrencyCode);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len != CODE_LEN {
            return Err(ValidationError::CurrencyCodeLength { len });
        }

        for ch in normalized.chars() {
            if !ch.is_ascii_alphabetic() {
                return Err(ValidationError::CurrencyCodeInvalidChar { ch });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_to_uppercase() {
        let code = CurrencyCode::parse(" usd ").expect("valid code");
        assert_eq!(code.as_str(), "USD");
        assert_eq!(code, CurrencyCode::parse("USD").expect("valid code"));
    }

    #[test]
    fn parse_rejects_empty_input() {
        assert_eq!(
            CurrencyCode::parse("  "),
            Err(ValidationError::EmptyCurrencyCode)
        );
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(
            CurrencyCode::parse("EURO"),
            Err(ValidationError::CurrencyCodeLength { len: 4 })
        );
    }

    #[test]
    fn parse_rejects_non_letters() {
        assert_eq!(
            CurrencyCode::parse("U5D"),
            Err(ValidationError::CurrencyCodeInvalidChar { ch: '5' })
        );
    }
}
