//! Promotion Mechanics
//!
//! The primary adjustment a promotion makes. Exactly one mechanic drives each promotion;
//! free shipping is carried separately on the promotion.

use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::products::ProductKey;

/// A promotion definition that cannot produce a discount.
///
/// Never shown to customers; the promotion contributes nothing and a warning is logged.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigurationIssue {
    /// Bulk discount has no tiers.
    #[error("bulk discount has no tiers")]
    EmptyBulkTiers,

    /// Buy-X-get-Y with a zero buy quantity.
    #[error("buy-x-get-y has a zero buy quantity")]
    ZeroBuyQuantity,

    /// Buy-X-get-Y with a zero get quantity.
    #[error("buy-x-get-y has a zero get quantity")]
    ZeroGetQuantity,
}

/// Primary discount mechanic of a promotion.
#[derive(Debug, Clone, PartialEq)]
pub enum Mechanic<'a> {
    /// Percentage off the eligible amount (e.g. "10% off").
    Percentage(Percentage),

    /// Fixed amount off the eligible amount (e.g. "£5 off").
    FixedAmount(Money<'a, Currency>),

    /// Percentage off selected by the eligible quantity.
    Bulk(BulkTiers),

    /// Free or discounted units for every group of units bought.
    BuyXGetY(BuyXGetY),
}

impl Mechanic<'_> {
    /// Check the mechanic can produce a discount at all.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigurationIssue`] that makes this mechanic inert.
    pub fn validate(&self) -> Result<(), ConfigurationIssue> {
        match self {
            Mechanic::Percentage(_) | Mechanic::FixedAmount(_) => Ok(()),
            Mechanic::Bulk(tiers) if tiers.is_empty() => Err(ConfigurationIssue::EmptyBulkTiers),
            Mechanic::Bulk(_) => Ok(()),
            Mechanic::BuyXGetY(offer) => offer.validate(),
        }
    }

    /// Whether a `max_discount` cap applies to this mechanic.
    ///
    /// Fixed amounts are their own cap.
    #[must_use]
    pub const fn honours_max_discount(&self) -> bool {
        !matches!(self, Mechanic::FixedAmount(_))
    }
}

/// A single bulk tier: buying at least `min_quantity` units earns `percent` off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulkTier {
    /// Minimum eligible quantity for this tier.
    pub min_quantity: u32,

    /// Discount for this tier.
    pub percent: Percentage,
}

impl BulkTier {
    /// Create a new tier.
    #[must_use]
    pub const fn new(min_quantity: u32, percent: Percentage) -> Self {
        Self {
            min_quantity,
            percent,
        }
    }
}

/// Bulk tiers, kept sorted ascending by minimum quantity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkTiers {
    tiers: SmallVec<[BulkTier; 4]>,
}

impl BulkTiers {
    /// Create bulk tiers in any order.
    pub fn new(tiers: impl IntoIterator<Item = BulkTier>) -> Self {
        let mut tiers: SmallVec<[BulkTier; 4]> = tiers.into_iter().collect();

        tiers.sort_by_key(|tier| tier.min_quantity);

        Self { tiers }
    }

    /// Tiers in ascending order of minimum quantity.
    #[must_use]
    pub fn tiers(&self) -> &[BulkTier] {
        &self.tiers
    }

    /// Whether there are no tiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// The tier with the largest minimum quantity that `quantity` meets.
    #[must_use]
    pub fn tier_for(&self, quantity: u64) -> Option<&BulkTier> {
        self.tiers
            .iter()
            .rev()
            .find(|tier| u64::from(tier.min_quantity) <= quantity)
    }
}

/// What the "get" units of a buy-X-get-Y offer receive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuyXGetYReward {
    /// The units are free.
    Free,

    /// The units are discounted by a percentage.
    PercentOff(Percentage),
}

/// Buy `buy_quantity`, get `get_quantity` free or discounted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyXGetY {
    /// Units that must be bought per group.
    pub buy_quantity: u32,

    /// Units rewarded per group.
    pub get_quantity: u32,

    /// Restrict the offer to one product; otherwise all eligible lines count.
    pub product: Option<ProductKey>,

    /// Reward for the rewarded units.
    pub reward: BuyXGetYReward,
}

impl BuyXGetY {
    /// Buy `buy`, get `get` free, across all eligible lines.
    #[must_use]
    pub const fn free(buy_quantity: u32, get_quantity: u32) -> Self {
        Self {
            buy_quantity,
            get_quantity,
            product: None,
            reward: BuyXGetYReward::Free,
        }
    }

    /// Restrict the offer to a single product.
    #[must_use]
    pub const fn for_product(mut self, product: ProductKey) -> Self {
        self.product = Some(product);
        self
    }

    /// Discount rewarded units by a percentage rather than giving them away.
    #[must_use]
    pub const fn percent_off(mut self, percent: Percentage) -> Self {
        self.reward = BuyXGetYReward::PercentOff(percent);
        self
    }

    /// Check quantities are usable.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationIssue`] if either quantity is zero.
    pub const fn validate(&self) -> Result<(), ConfigurationIssue> {
        if self.buy_quantity == 0 {
            Err(ConfigurationIssue::ZeroBuyQuantity)
        } else if self.get_quantity == 0 {
            Err(ConfigurationIssue::ZeroGetQuantity)
        } else {
            Ok(())
        }
    }

    /// Number of rewarded units for `quantity` eligible units.
    #[must_use]
    pub fn rewarded_units(&self, quantity: u64) -> u64 {
        let group = u64::from(self.buy_quantity) + u64::from(self.get_quantity);

        if self.validate().is_err() {
            return 0;
        }

        (quantity / group) * u64::from(self.get_quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_tiers_are_sorted_on_construction() {
        let tiers = BulkTiers::new([
            BulkTier::new(10, Percentage::from(0.20)),
            BulkTier::new(5, Percentage::from(0.10)),
        ]);

        let minimums: Vec<u32> = tiers.tiers().iter().map(|tier| tier.min_quantity).collect();

        assert_eq!(minimums, vec![5, 10]);
    }

    #[test]
    fn bulk_tier_selection_picks_highest_met_threshold() {
        let tiers = BulkTiers::new([
            BulkTier::new(5, Percentage::from(0.10)),
            BulkTier::new(10, Percentage::from(0.20)),
        ]);

        assert_eq!(tiers.tier_for(4), None);
        assert_eq!(tiers.tier_for(7).map(|tier| tier.min_quantity), Some(5));
        assert_eq!(tiers.tier_for(10).map(|tier| tier.min_quantity), Some(10));
        assert_eq!(tiers.tier_for(12).map(|tier| tier.min_quantity), Some(10));
    }

    #[test]
    fn buy_two_get_one_rewards_a_third() {
        let offer = BuyXGetY::free(2, 1);

        assert_eq!(offer.rewarded_units(9), 3);
        assert_eq!(offer.rewarded_units(5), 1);
        assert_eq!(offer.rewarded_units(2), 0);
    }

    #[test]
    fn zero_quantities_are_configuration_issues() {
        assert_eq!(
            BuyXGetY::free(0, 1).validate(),
            Err(ConfigurationIssue::ZeroBuyQuantity)
        );
        assert_eq!(
            BuyXGetY::free(2, 0).validate(),
            Err(ConfigurationIssue::ZeroGetQuantity)
        );
        assert_eq!(BuyXGetY::free(0, 0).rewarded_units(10), 0);
    }

    #[test]
    fn empty_bulk_tiers_are_a_configuration_issue() {
        let mechanic = Mechanic::<'static>::Bulk(BulkTiers::default());

        assert_eq!(mechanic.validate(), Err(ConfigurationIssue::EmptyBulkTiers));
    }

    #[test]
    fn fixed_amounts_ignore_max_discount() {
        use rusty_money::iso::GBP;

        assert!(!Mechanic::FixedAmount(Money::from_minor(500, GBP)).honours_max_discount());
        assert!(Mechanic::<'static>::Percentage(Percentage::from(0.1)).honours_max_discount());
    }
}
