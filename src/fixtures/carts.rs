//! Cart Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::customers::LoyaltyTier;

/// Wrapper for carts in YAML
#[derive(Debug, Deserialize)]
pub struct CartsFixture {
    /// Map of cart key -> cart fixture
    pub carts: FxHashMap<String, CartFixture>,
}

/// Cart fixture from YAML
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartFixture {
    /// Customer identifier
    pub customer: String,

    /// Customer loyalty tier
    #[serde(default)]
    pub loyalty_tier: Option<LoyaltyTier>,

    /// Cart lines
    pub lines: Vec<CartLineFixture>,

    /// Codes already applied to the order
    #[serde(default)]
    pub applied_codes: Vec<String>,
}

/// Cart line from YAML, priced from the product fixture
#[derive(Debug, Deserialize)]
pub struct CartLineFixture {
    /// Product key
    pub product: String,

    /// Number of units
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn carts_fixture_parses_yaml() -> TestResult {
        let yaml = "
carts:
  gold:
    customer: cust-1
    loyalty_tier: gold
    lines:
      - product: premium
        quantity: 2
      - product: basic
    applied_codes: [welcome]
";
        let fixture: CartsFixture = serde_norway::from_str(yaml)?;
        let cart = fixture.carts.get("gold").ok_or("missing gold cart")?;

        assert_eq!(cart.customer, "cust-1");
        assert_eq!(cart.loyalty_tier, Some(LoyaltyTier::Gold));
        assert_eq!(cart.applied_codes, vec!["welcome".to_string()]);

        let quantities: Vec<u32> = cart.lines.iter().map(|line| line.quantity).collect();

        assert_eq!(quantities, vec![2, 1]);

        Ok(())
    }
}
