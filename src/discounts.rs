//! Discounts
//!
//! Per-promotion discount arithmetic. Amounts are computed in minor units and rounded half away
//! from zero.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, MoneyError, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::warn;

use crate::{
    basket::Basket,
    eligibility::eligible_totals,
    items::{LineItem, cheapest_units_total},
    pricing::{TotalPriceError, total_quantity},
    promotions::{
        Promotion, PromotionKey,
        mechanics::{BuyXGetY, BuyXGetYReward, ConfigurationIssue, Mechanic},
    },
};

/// Errors specific to discount calculations.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// An amount did not fit in minor units.
    #[error("discount amount overflowed")]
    Overflow,

    /// A promotion amount is in a different currency to the basket.
    #[error("promotion amount is in {actual}, but basket is in {expected}")]
    CurrencyMismatch {
        /// Basket currency
        expected: &'static str,

        /// Promotion amount currency
        actual: &'static str,
    },

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Errors bubbled up from total price calculation.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),
}

/// Discount a single promotion contributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromotionDiscount<'a> {
    /// Promotion that produced the discount
    pub promotion: PromotionKey,

    /// Amount taken off
    pub amount: Money<'a, Currency>,

    /// Set when the promotion is misconfigured and contributed nothing
    pub issue: Option<ConfigurationIssue>,
}

/// Calculate the discount `promotion` takes off `running`, the amount still payable.
///
/// The discount is taken from the smaller of `running` and the promotion's eligible
/// subtotal, capped by the promotion's maximum discount, and never negative.
///
/// # Errors
///
/// Returns a [`DiscountError`] if:
/// - a percentage cannot be safely represented in minor units (`PercentConversion`).
/// - an amount overflows (`Overflow`, `TotalPrice`).
/// - a promotion amount is in another currency (`CurrencyMismatch`).
pub fn promotion_discount<'a>(
    promotion: &Promotion<'a>,
    basket: &Basket<'a>,
    running: Money<'a, Currency>,
) -> Result<PromotionDiscount<'a>, DiscountError> {
    let currency = basket.currency();

    if let Err(issue) = promotion.mechanic().validate() {
        warn!(
            promotion = ?promotion.key(),
            %issue,
            "misconfigured promotion contributes no discount"
        );

        return Ok(PromotionDiscount {
            promotion: promotion.key(),
            amount: Money::from_minor(0, currency),
            issue: Some(issue),
        });
    }

    let totals = eligible_totals(promotion.scope(), basket)?;
    let base = running
        .to_minor_units()
        .min(totals.subtotal.to_minor_units())
        .max(0);

    let raw = match promotion.mechanic() {
        Mechanic::Percentage(percent) => percent_of_minor(percent, base)?,
        Mechanic::FixedAmount(amount) => minor_in(amount, currency)?,
        Mechanic::Bulk(tiers) => match tiers.tier_for(totals.quantity) {
            Some(tier) => percent_of_minor(&tier.percent, base)?,
            None => 0,
        },
        Mechanic::BuyXGetY(offer) => buy_x_get_y_minor(offer, promotion, basket)?,
    };

    let capped = match promotion.max_discount() {
        Some(max) => raw.min(minor_in(max, currency)?),
        None => raw,
    };

    Ok(PromotionDiscount {
        promotion: promotion.key(),
        amount: Money::from_minor(capped.clamp(0, base), currency),
        issue: None,
    })
}

/// Value of the rewarded units of a buy-X-get-Y offer.
///
/// Rewarded units are the cheapest eligible units.
fn buy_x_get_y_minor(
    offer: &BuyXGetY,
    promotion: &Promotion<'_>,
    basket: &Basket<'_>,
) -> Result<i64, DiscountError> {
    let targets: SmallVec<[&LineItem<'_>; 8]> = promotion
        .scope()
        .eligible_lines(basket.iter())
        .filter(|line| offer.product.is_none_or(|product| line.product() == product))
        .collect();

    let units = offer.rewarded_units(total_quantity(targets.iter().copied()));
    let value =
        cheapest_units_total(targets.iter().copied(), units).ok_or(DiscountError::Overflow)?;

    match offer.reward {
        BuyXGetYReward::Free => Ok(value),
        BuyXGetYReward::PercentOff(percent) => percent_of_minor(&percent, value),
    }
}

/// Minor units of `amount`, which must be in `currency`.
fn minor_in(amount: &Money<'_, Currency>, currency: &Currency) -> Result<i64, DiscountError> {
    if amount.currency() == currency {
        Ok(amount.to_minor_units())
    } else {
        Err(DiscountError::CurrencyMismatch {
            expected: currency.iso_alpha_code,
            actual: amount.currency().iso_alpha_code,
        })
    }
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
///
/// # Errors
///
/// Returns an error if:
/// - The percentage calculation overflows or cannot be safely represented (`DiscountError::PercentConversion`).
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage doesn't expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}
