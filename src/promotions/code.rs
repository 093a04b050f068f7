//! Promotion Codes

use std::{fmt, str::FromStr};

use thiserror::Error;

/// A redeemable promotion code.
///
/// Codes are matched case-insensitively, so they are stored trimmed and upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromotionCode(String);

/// Errors parsing a promotion code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromotionCodeError {
    /// The code was empty or only whitespace.
    #[error("promotion code is empty")]
    Empty,
}

impl PromotionCode {
    /// Create a normalised promotion code.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionCodeError::Empty`] if the code is blank.
    pub fn new(code: impl AsRef<str>) -> Result<Self, PromotionCodeError> {
        let trimmed = code.as_ref().trim();

        if trimmed.is_empty() {
            return Err(PromotionCodeError::Empty);
        }

        Ok(Self(trimmed.to_uppercase()))
    }

    /// The normalised code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PromotionCode {
    type Err = PromotionCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PromotionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
