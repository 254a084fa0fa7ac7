//! Shipment tracking number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`TrackingNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingNumberError {
    /// The input string is empty.
    #[error("tracking number cannot be empty")]
    Empty,
    /// The input is longer than the maximum length.
    #[error("tracking number must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a disallowed character.
    #[error("tracking number may only contain uppercase letters and digits")]
    InvalidCharacter,
}

/// A shipment tracking number.
///
/// Tracking numbers are caller-visible identifiers printed on labels, so
/// they are restricted to uppercase ASCII letters and digits. They are
/// unique per shipment; uniqueness is enforced by the record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    /// Maximum length of a tracking number.
    pub const MAX_LENGTH: usize = 32;

    /// Parse a `TrackingNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 32 characters,
    /// or contains characters other than uppercase letters and digits.
    pub fn parse(s: &str) -> Result<Self, TrackingNumberError> {
        if s.is_empty() {
            return Err(TrackingNumberError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(TrackingNumberError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return Err(TrackingNumberError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the tracking number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `TrackingNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TrackingNumber {
    type Err = TrackingNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TrackingNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(TrackingNumber::parse("SHP1A2B3C4D").is_ok());
        assert!(TrackingNumber::parse("X1").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(
            TrackingNumber::parse(""),
            Err(TrackingNumberError::Empty)
        ));
    }

    #[test]
    fn test_parse_too_long() {
        assert!(matches!(
            TrackingNumber::parse(&"A".repeat(33)),
            Err(TrackingNumberError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_lowercase_and_symbols() {
        assert!(matches!(
            TrackingNumber::parse("shp123"),
            Err(TrackingNumberError::InvalidCharacter)
        ));
        assert!(matches!(
            TrackingNumber::parse("SHP-123"),
            Err(TrackingNumberError::InvalidCharacter)
        ));
    }
}
