//! Promotion Usage Limits

/// Redemption caps for a promotion.
///
/// A limit of `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageLimits {
    /// Maximum number of redemptions across all customers.
    pub global: u32,

    /// Maximum number of redemptions by a single customer.
    pub per_customer: u32,
}

impl UsageLimits {
    /// No global cap, unlimited redemptions per customer.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            global: 0,
            per_customer: 0,
        }
    }

    /// Global cap only, with the default one redemption per customer.
    #[must_use]
    pub const fn with_global_limit(limit: u32) -> Self {
        Self {
            global: limit,
            per_customer: 1,
        }
    }

    /// Set the per-customer cap.
    #[must_use]
    pub const fn per_customer(mut self, limit: u32) -> Self {
        self.per_customer = limit;
        self
    }

    /// Whether another redemption is allowed after `used_count` global redemptions.
    #[must_use]
    pub const fn allows_global(&self, used_count: u32) -> bool {
        self.global == 0 || used_count < self.global
    }

    /// Whether another redemption is allowed after a customer's `redeemed` redemptions.
    #[must_use]
    pub const fn allows_customer(&self, redeemed: u32) -> bool {
        self.per_customer == 0 || redeemed < self.per_customer
    }
}

impl Default for UsageLimits {
    /// No global cap, one redemption per customer.
    fn default() -> Self {
        Self {
            global: 0,
            per_customer: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_one_redemption_per_customer() {
        let limits = UsageLimits::default();

        assert!(limits.allows_global(u32::MAX - 1));
        assert!(limits.allows_customer(0));
        assert!(!limits.allows_customer(1));
    }

    #[test]
    fn global_limit_is_exclusive_upper_bound() {
        let limits = UsageLimits::with_global_limit(3);

        assert!(limits.allows_global(2));
        assert!(!limits.allows_global(3));
    }

    #[test]
    fn zero_means_unlimited() {
        let limits = UsageLimits::unlimited();

        assert!(limits.allows_global(1_000_000));
        assert!(limits.allows_customer(1_000_000));
    }

    #[test]
    fn per_customer_overrides_default() {
        let limits = UsageLimits::with_global_limit(10).per_customer(3);

        assert!(limits.allows_customer(2));
        assert!(!limits.allows_customer(3));
    }
}
