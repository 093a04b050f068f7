//! Eligibility
//!
//! Decides whether an order qualifies for a promotion, independent of the discount amount.
//! Checks run cheapest first and stop at the first failure so the caller can show a specific
//! reason.

use chrono::{DateTime, Utc};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::debug;

use crate::{
    basket::Basket,
    customers::LoyaltyTier,
    orders::OrderContext,
    pricing::{TotalPriceError, total_price, total_quantity},
    promotions::{
        Promotion, PromotionKey, code::PromotionCode, scope::ProductScope,
        validity::WindowStatus,
    },
};

/// Why a promotion does not apply to an order.
///
/// These are normal outcomes, not failures: the order is still priced, just without the
/// promotion.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Ineligible<'a> {
    /// No promotion has this code.
    #[error("code {0} is not valid")]
    NotFound(PromotionCode),

    /// The validity window has closed.
    #[error("this promotion has expired")]
    Expired,

    /// The validity window has not opened yet.
    #[error("this promotion is not active yet")]
    NotYetValid,

    /// The promotion is disabled.
    #[error("this promotion is not active")]
    Inactive,

    /// The promotion has been redeemed as often as allowed.
    #[error("this promotion has reached its usage limit of {limit}")]
    LimitExceededGlobal {
        /// Global limit
        limit: u32,
    },

    /// The customer has redeemed the promotion as often as allowed.
    #[error("you have already used this promotion {limit} time(s)")]
    LimitExceededCustomer {
        /// Per-customer limit
        limit: u32,
    },

    /// The promotion is reserved for another loyalty tier.
    #[error("this promotion is only available to {required} members")]
    LoyaltyTierMismatch {
        /// Tier the promotion is restricted to
        required: LoyaltyTier,

        /// Customer's tier
        actual: Option<LoyaltyTier>,
    },

    /// Eligible items do not reach the minimum spend.
    #[error("minimum purchase of {required} not met (eligible items total {actual})")]
    MinimumPurchaseNotMet {
        /// Minimum spend
        required: Money<'a, Currency>,

        /// Spend on eligible items
        actual: Money<'a, Currency>,
    },

    /// Eligible items do not reach the minimum quantity.
    #[error("at least {required} eligible items are required ({actual} in cart)")]
    MinimumItemsNotMet {
        /// Minimum quantity
        required: u32,

        /// Eligible quantity in the cart
        actual: u64,
    },

    /// No cart line is covered by the promotion.
    #[error("no items in the cart qualify for this promotion")]
    NoApplicableItems,

    /// The caller excluded the promotion from this evaluation.
    #[error("this promotion was excluded from the order")]
    Excluded,

    /// A non-stackable promotion on the order was applied instead.
    #[error("this promotion cannot be combined with another promotion on the order")]
    NotCombinable {
        /// Promotion applied instead
        winner: PromotionKey,
    },

    /// The promotion is misconfigured and gives no discount.
    #[error("this promotion is currently unavailable")]
    Unavailable,
}

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility<'a> {
    /// The order qualifies.
    Eligible,

    /// The order does not qualify, for this reason.
    Ineligible(Ineligible<'a>),
}

impl<'a> Eligibility<'a> {
    /// Whether the order qualifies.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    /// The failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&Ineligible<'a>> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::Ineligible(reason) => Some(reason),
        }
    }
}

/// Spend and quantity of the lines a scope covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibleTotals<'a> {
    /// Sum of eligible line totals
    pub subtotal: Money<'a, Currency>,

    /// Sum of eligible quantities
    pub quantity: u64,
}

/// Sum the lines of `basket` covered by `scope`.
///
/// # Errors
///
/// Returns a [`TotalPriceError`] if the line totals overflow.
pub fn eligible_totals<'a>(
    scope: &ProductScope,
    basket: &Basket<'a>,
) -> Result<EligibleTotals<'a>, TotalPriceError> {
    let subtotal = match total_price(scope.eligible_lines(basket.iter())) {
        Ok(subtotal) => subtotal,
        Err(TotalPriceError::NoItems) => Money::from_minor(0, basket.currency()),
        Err(err) => return Err(err),
    };

    Ok(EligibleTotals {
        subtotal,
        quantity: total_quantity(scope.eligible_lines(basket.iter())),
    })
}

/// Check whether the order in `ctx` qualifies for `promotion` at `now`.
///
/// # Errors
///
/// Returns a [`TotalPriceError`] if the eligible subtotal cannot be calculated or compared with
/// the promotion's minimum spend.
pub fn check_eligibility<'a>(
    promotion: &Promotion<'a>,
    ctx: &OrderContext<'a>,
    now: DateTime<Utc>,
) -> Result<Eligibility<'a>, TotalPriceError> {
    let eligibility = match first_failure(promotion, ctx, now)? {
        None => Eligibility::Eligible,
        Some(reason) => {
            debug!(
                promotion = ?promotion.key(),
                code = promotion.code().map(PromotionCode::as_str),
                %reason,
                "promotion not eligible"
            );

            Eligibility::Ineligible(reason)
        }
    };

    Ok(eligibility)
}

/// Convenience wrapper around [`check_eligibility`].
///
/// # Errors
///
/// Returns a [`TotalPriceError`] under the same conditions as [`check_eligibility`].
pub fn is_eligible<'a>(
    promotion: &Promotion<'a>,
    ctx: &OrderContext<'a>,
    now: DateTime<Utc>,
) -> Result<bool, TotalPriceError> {
    Ok(check_eligibility(promotion, ctx, now)?.is_eligible())
}

fn first_failure<'a>(
    promotion: &Promotion<'a>,
    ctx: &OrderContext<'a>,
    now: DateTime<Utc>,
) -> Result<Option<Ineligible<'a>>, TotalPriceError> {
    if ctx.is_excluded(promotion.key()) {
        return Ok(Some(Ineligible::Excluded));
    }

    if !promotion.is_active() {
        return Ok(Some(Ineligible::Inactive));
    }

    match promotion.window_status(now) {
        WindowStatus::Open => {}
        WindowStatus::NotYetValid => return Ok(Some(Ineligible::NotYetValid)),
        WindowStatus::Expired => return Ok(Some(Ineligible::Expired)),
    }

    let usage = promotion.usage();

    if !usage.allows_global(promotion.used_count()) {
        return Ok(Some(Ineligible::LimitExceededGlobal {
            limit: usage.global,
        }));
    }

    if !usage.allows_customer(ctx.prior_redemptions(promotion.key())) {
        return Ok(Some(Ineligible::LimitExceededCustomer {
            limit: usage.per_customer,
        }));
    }

    if let Some(required) = promotion.loyalty_tier() {
        let actual = ctx.customer().loyalty_tier();

        if actual != Some(required) {
            return Ok(Some(Ineligible::LoyaltyTierMismatch { required, actual }));
        }
    }

    let totals = eligible_totals(promotion.scope(), ctx.basket())?;

    if let Some(required) = promotion.min_purchase() {
        let shortfall = required.sub(totals.subtotal)?;

        if shortfall.to_minor_units() > 0 {
            return Ok(Some(Ineligible::MinimumPurchaseNotMet {
                required: *required,
                actual: totals.subtotal,
            }));
        }
    }

    if let Some(required) = promotion.minimum_items()
        && totals.quantity < u64::from(required)
    {
        return Ok(Some(Ineligible::MinimumItemsNotMet {
            required,
            actual: totals.quantity,
        }));
    }

    if totals.quantity == 0 {
        return Ok(Some(Ineligible::NoApplicableItems));
    }

    Ok(None)
}
