//! Join codes handed to participants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Number of characters in a join code.
pub const CODE_LENGTH: usize = 6;

/// Six-character uppercase alphanumeric code identifying a started session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionCode(String);

impl SessionCode {
    /// Parses a code, normalizing to uppercase.
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }
        if code.len() != CODE_LENGTH || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::invalid_format(
                "code",
                format!("expected {} alphanumeric characters", CODE_LENGTH),
            ));
        }
        Ok(Self(code))
    }

    /// Wraps a code built from the uppercase alphanumeric alphabet.
    pub(crate) fn from_alphabet(code: String) -> Self {
        debug_assert_eq!(code.len(), CODE_LENGTH);
        debug_assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SessionCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionCode> for String {
    fn from(code: SessionCode) -> Self {
        code.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_uppercase() {
        assert_eq!(SessionCode::new(" ab12cd ").unwrap().as_str(), "AB12CD");
    }

    #[test]
    fn rejects_wrong_length_or_symbols() {
        assert!(SessionCode::new("ABC").is_err());
        assert!(SessionCode::new("ABCDEFG").is_err());
        assert!(SessionCode::new("AB-12C").is_err());
        assert!(SessionCode::new("").is_err());
    }

    #[test]
    fn deserialization_validates() {
        assert!(serde_json::from_str::<SessionCode>("\"XYZ789\"").is_ok());
        assert!(serde_json::from_str::<SessionCode>("\"nope\"").is_err());
    }
}
