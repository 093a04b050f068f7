//! Customers

use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

/// Customer identity (usually an email address), compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomerId(String);

impl CustomerId {
    /// Create a customer id, normalising surrounding whitespace and case.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    /// The normalised identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer loyalty segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoyaltyTier {
    /// Bronze
    Bronze,

    /// Silver
    Silver,

    /// Gold
    Gold,

    /// Platinum
    Platinum,
}

impl LoyaltyTier {
    /// Lowercase tier name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LoyaltyTier::Bronze => "bronze",
            LoyaltyTier::Silver => "silver",
            LoyaltyTier::Gold => "gold",
            LoyaltyTier::Platinum => "platinum",
        }
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown loyalty tier name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown loyalty tier: {0}")]
pub struct UnknownLoyaltyTier(pub String);

impl FromStr for LoyaltyTier {
    type Err = UnknownLoyaltyTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bronze" => Ok(LoyaltyTier::Bronze),
            "silver" => Ok(LoyaltyTier::Silver),
            "gold" => Ok(LoyaltyTier::Gold),
            "platinum" => Ok(LoyaltyTier::Platinum),
            _ => Err(UnknownLoyaltyTier(s.to_string())),
        }
    }
}

/// Customer placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id: CustomerId,
    loyalty_tier: Option<LoyaltyTier>,
}

impl Customer {
    /// Create a customer without a loyalty tier.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: CustomerId::new(id),
            loyalty_tier: None,
        }
    }

    /// Set the customer's loyalty tier.
    #[must_use]
    pub fn with_loyalty_tier(mut self, tier: LoyaltyTier) -> Self {
        self.loyalty_tier = Some(tier);
        self
    }

    /// Customer identity
    pub fn id(&self) -> &CustomerId {
        &self.id
    }

    /// Loyalty tier, if the customer has one
    pub fn loyalty_tier(&self) -> Option<LoyaltyTier> {
        self.loyalty_tier
    }
}
