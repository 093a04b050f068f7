//! Promotions

use chrono::{DateTime, Utc};
use rusty_money::{Money, iso::Currency};
use slotmap::new_key_type;

use crate::{
    customers::LoyaltyTier,
    promotions::{
        code::PromotionCode,
        mechanics::Mechanic,
        scope::ProductScope,
        usage::UsageLimits,
        validity::{ValidityWindow, WindowStatus},
    },
};

pub mod code;
pub mod mechanics;
pub mod scope;
pub mod usage;
pub mod validity;

new_key_type! {
    /// Promotion Key
    pub struct PromotionKey;
}

/// Promotion metadata
#[derive(Debug, Default, Clone)]
pub struct PromotionMeta {
    /// Promotion name
    pub name: String,
}

/// A persisted discount rule, optionally redeemable by code.
#[derive(Debug, Clone, PartialEq)]
pub struct Promotion<'a> {
    key: PromotionKey,
    code: Option<PromotionCode>,
    mechanic: Mechanic<'a>,
    scope: ProductScope,
    validity: ValidityWindow,
    is_active: bool,
    usage: UsageLimits,
    used_count: u32,
    version: u64,
    min_purchase: Option<Money<'a, Currency>>,
    max_discount: Option<Money<'a, Currency>>,
    minimum_items: Option<u32>,
    loyalty_tier: Option<LoyaltyTier>,
    priority: i32,
    stackable: bool,
    auto_apply: bool,
    free_shipping: bool,
}

impl<'a> Promotion<'a> {
    /// Create an active, stackable, whole-cart promotion with no code and default usage limits.
    #[must_use]
    pub fn new(key: PromotionKey, mechanic: Mechanic<'a>) -> Self {
        Self {
            key,
            code: None,
            mechanic,
            scope: ProductScope::whole_cart(),
            validity: ValidityWindow::always(),
            is_active: true,
            usage: UsageLimits::default(),
            used_count: 0,
            version: 0,
            min_purchase: None,
            max_discount: None,
            minimum_items: None,
            loyalty_tier: None,
            priority: 0,
            stackable: true,
            auto_apply: false,
            free_shipping: false,
        }
    }

    /// Set the redeemable code.
    #[must_use]
    pub fn with_code(mut self, code: PromotionCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Restrict the products the promotion applies to.
    #[must_use]
    pub fn with_scope(mut self, scope: ProductScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the validity window.
    #[must_use]
    pub fn with_validity(mut self, validity: ValidityWindow) -> Self {
        self.validity = validity;
        self
    }

    /// Enable or disable the promotion.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Set usage limits.
    #[must_use]
    pub fn with_usage(mut self, usage: UsageLimits) -> Self {
        self.usage = usage;
        self
    }

    /// Set the number of redemptions already recorded.
    #[must_use]
    pub fn with_used_count(mut self, used_count: u32) -> Self {
        self.used_count = used_count;
        self
    }

    /// Require a minimum spend on eligible lines.
    #[must_use]
    pub fn with_min_purchase(mut self, amount: Money<'a, Currency>) -> Self {
        self.min_purchase = Some(amount);
        self
    }

    /// Cap the discount amount (ignored for fixed amount promotions).
    #[must_use]
    pub fn with_max_discount(mut self, amount: Money<'a, Currency>) -> Self {
        self.max_discount = Some(amount);
        self
    }

    /// Require a minimum quantity of eligible units.
    #[must_use]
    pub fn with_minimum_items(mut self, quantity: u32) -> Self {
        self.minimum_items = Some(quantity);
        self
    }

    /// Restrict to a loyalty tier.
    #[must_use]
    pub fn with_loyalty_tier(mut self, tier: LoyaltyTier) -> Self {
        self.loyalty_tier = Some(tier);
        self
    }

    /// Set the priority (lower applies first).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set whether the promotion combines with others.
    #[must_use]
    pub fn with_stackable(mut self, stackable: bool) -> Self {
        self.stackable = stackable;
        self
    }

    /// Set whether the promotion applies without a code.
    #[must_use]
    pub fn with_auto_apply(mut self, auto_apply: bool) -> Self {
        self.auto_apply = auto_apply;
        self
    }

    /// Set whether the promotion grants free shipping.
    #[must_use]
    pub fn with_free_shipping(mut self, free_shipping: bool) -> Self {
        self.free_shipping = free_shipping;
        self
    }

    /// Return the promotion key.
    pub fn key(&self) -> PromotionKey {
        self.key
    }

    /// Return the code, if the promotion is redeemable by code.
    pub fn code(&self) -> Option<&PromotionCode> {
        self.code.as_ref()
    }

    /// Return the mechanic.
    pub fn mechanic(&self) -> &Mechanic<'a> {
        &self.mechanic
    }

    /// Return the product scope.
    pub fn scope(&self) -> &ProductScope {
        &self.scope
    }

    /// Return the validity window.
    pub fn validity(&self) -> &ValidityWindow {
        &self.validity
    }

    /// Whether the promotion is enabled.
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Return the usage limits.
    pub fn usage(&self) -> &UsageLimits {
        &self.usage
    }

    /// Number of recorded redemptions.
    pub fn used_count(&self) -> u32 {
        self.used_count
    }

    /// Revision of the definition, bumped whenever the promotion is edited or toggled.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Minimum spend on eligible lines.
    pub fn min_purchase(&self) -> Option<&Money<'a, Currency>> {
        self.min_purchase.as_ref()
    }

    /// Discount cap that applies to this promotion's mechanic.
    pub fn max_discount(&self) -> Option<&Money<'a, Currency>> {
        self.max_discount
            .as_ref()
            .filter(|_| self.mechanic.honours_max_discount())
    }

    /// Minimum quantity of eligible units.
    pub fn minimum_items(&self) -> Option<u32> {
        self.minimum_items
    }

    /// Loyalty tier restriction.
    pub fn loyalty_tier(&self) -> Option<LoyaltyTier> {
        self.loyalty_tier
    }

    /// Priority (lower applies first).
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether the promotion combines with others.
    pub fn is_stackable(&self) -> bool {
        self.stackable
    }

    /// Whether the promotion applies without a code.
    pub fn is_auto_apply(&self) -> bool {
        self.auto_apply
    }

    /// Whether the promotion grants free shipping.
    pub fn grants_free_shipping(&self) -> bool {
        self.free_shipping
    }

    /// Where `now` falls in the validity window.
    pub fn window_status(&self, now: DateTime<Utc>) -> WindowStatus {
        self.validity.status(now)
    }

    /// Whether the promotion is enabled and `now` is inside its window.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.window_status(now) == WindowStatus::Open
    }

    /// Record one redemption.
    pub(crate) fn record_redemption(&mut self) {
        self.used_count = self.used_count.saturating_add(1);
    }

    /// Take over the identity and redemption count of the definition this one replaces.
    pub(crate) fn supersede(&mut self, previous: &Promotion<'a>) {
        self.key = previous.key;
        self.used_count = previous.used_count;
        self.version = previous.version.wrapping_add(1);
    }

    pub(crate) fn set_key(&mut self, key: PromotionKey) {
        self.key = key;
    }

    pub(crate) fn set_active(&mut self, is_active: bool) {
        if self.is_active != is_active {
            self.is_active = is_active;
            self.version = self.version.wrapping_add(1);
        }
    }
}
