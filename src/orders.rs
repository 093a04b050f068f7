//! Order Context
//!
//! Everything the engine needs to know about the order being priced. Owned by the caller and
//! read-only to the engine.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::{
    basket::Basket,
    customers::Customer,
    promotions::{PromotionKey, code::PromotionCode},
};

/// Order being priced.
#[derive(Debug, Clone)]
pub struct OrderContext<'a> {
    customer: Customer,
    basket: Basket<'a>,
    applied_codes: SmallVec<[PromotionCode; 2]>,
    prior_redemptions: FxHashMap<PromotionKey, u32>,
    excluded: FxHashSet<PromotionKey>,
}

impl<'a> OrderContext<'a> {
    /// Create a context for a customer's basket.
    #[must_use]
    pub fn new(customer: Customer, basket: Basket<'a>) -> Self {
        Self {
            customer,
            basket,
            applied_codes: SmallVec::new(),
            prior_redemptions: FxHashMap::default(),
            excluded: FxHashSet::default(),
        }
    }

    /// Add a code already applied to this order.
    #[must_use]
    pub fn with_applied_code(mut self, code: PromotionCode) -> Self {
        if !self.applied_codes.contains(&code) {
            self.applied_codes.push(code);
        }

        self
    }

    /// Record how many times this customer has already redeemed a promotion.
    #[must_use]
    pub fn with_prior_redemptions(mut self, promotion: PromotionKey, count: u32) -> Self {
        self.prior_redemptions.insert(promotion, count);
        self
    }

    /// Exclude a promotion from evaluation, e.g. after its cap was reached at confirmation.
    #[must_use]
    pub fn excluding(mut self, promotion: PromotionKey) -> Self {
        self.excluded.insert(promotion);
        self
    }

    /// The customer placing the order.
    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    /// The basket being priced.
    pub fn basket(&self) -> &Basket<'a> {
        &self.basket
    }

    /// Codes already applied to this order.
    pub fn applied_codes(&self) -> &[PromotionCode] {
        &self.applied_codes
    }

    /// This customer's prior redemptions of a promotion.
    pub fn prior_redemptions(&self, promotion: PromotionKey) -> u32 {
        self.prior_redemptions
            .get(&promotion)
            .copied()
            .unwrap_or_default()
    }

    /// Whether the caller excluded a promotion.
    pub fn is_excluded(&self, promotion: PromotionKey) -> bool {
        self.excluded.contains(&promotion)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use slotmap::SlotMap;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn prior_redemptions_default_to_zero() {
        let mut keys = SlotMap::<PromotionKey, ()>::with_key();
        let seen = keys.insert(());
        let unseen = keys.insert(());

        let ctx = OrderContext::new(Customer::new("a@b.c"), Basket::new(GBP))
            .with_prior_redemptions(seen, 2);

        assert_eq!(ctx.prior_redemptions(seen), 2);
        assert_eq!(ctx.prior_redemptions(unseen), 0);
    }

    #[test]
    fn applied_codes_are_deduplicated() -> TestResult {
        let ctx = OrderContext::new(Customer::new("a@b.c"), Basket::new(GBP))
            .with_applied_code(PromotionCode::new("save10")?)
            .with_applied_code(PromotionCode::new("SAVE10")?);

        assert_eq!(ctx.applied_codes().len(), 1);

        Ok(())
    }

    #[test]
    fn excluded_promotions_are_tracked() {
        let mut keys = SlotMap::<PromotionKey, ()>::with_key();
        let key = keys.insert(());

        let ctx = OrderContext::new(Customer::new("a@b.c"), Basket::new(GBP)).excluding(key);

        assert!(ctx.is_excluded(key));
    }
}
