//! Discount Calculator
//!
//! Combines the promotions that apply to an order into a single discount. Misconfigured
//! promotions are set aside first. An eligible non-stackable promotion wins outright; otherwise
//! stackable promotions apply in priority order, each taken from what is still payable after the
//! ones before it.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use rusty_money::{Money, iso::Currency};
use smallvec::{SmallVec, smallvec};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    basket::Basket,
    discounts::{DiscountError, PromotionDiscount, promotion_discount},
    eligibility::{Eligibility, Ineligible, check_eligibility},
    orders::OrderContext,
    promotions::{Promotion, PromotionKey, code::PromotionCode, mechanics::ConfigurationIssue},
};

/// An eligible promotion dropped because a non-stackable promotion won.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("promotion {dropped:?} dropped in favour of non-stackable promotion {winner:?}")]
pub struct NonStackableConflict {
    /// Promotion that was not applied
    pub dropped: PromotionKey,

    /// Non-stackable promotion that was applied instead
    pub winner: PromotionKey,
}

/// A promotion that contributed to the discount.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPromotion<'a> {
    /// Promotion key
    pub promotion: PromotionKey,

    /// Code the promotion is redeemed with, if any
    pub code: Option<PromotionCode>,

    /// Amount taken off
    pub amount: Money<'a, Currency>,

    /// Whether the promotion grants free shipping
    pub free_shipping: bool,
}

/// A promotion that was considered but did not apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection<'a> {
    /// Promotion key
    pub promotion: PromotionKey,

    /// Code the promotion is redeemed with, if any
    pub code: Option<PromotionCode>,

    /// Why it did not apply
    pub reason: Ineligible<'a>,
}

/// A misconfigured promotion that contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationNote {
    /// Promotion key
    pub promotion: PromotionKey,

    /// What is wrong with it
    pub issue: ConfigurationIssue,
}

/// Result of combining promotions for an order.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountOutcome<'a> {
    subtotal: Money<'a, Currency>,
    discount: Money<'a, Currency>,
    total: Money<'a, Currency>,
    free_shipping: bool,
    breakdown: SmallVec<[AppliedPromotion<'a>; 4]>,
    rejections: Vec<Rejection<'a>>,
    conflicts: SmallVec<[NonStackableConflict; 2]>,
    configuration_issues: SmallVec<[ConfigurationNote; 2]>,
}

impl<'a> DiscountOutcome<'a> {
    /// An outcome that leaves `subtotal` untouched.
    #[must_use]
    pub fn undiscounted(subtotal: Money<'a, Currency>) -> Self {
        Self {
            subtotal,
            discount: Money::from_minor(0, subtotal.currency()),
            total: subtotal,
            free_shipping: false,
            breakdown: SmallVec::new(),
            rejections: Vec::new(),
            conflicts: SmallVec::new(),
            configuration_issues: SmallVec::new(),
        }
    }

    /// Basket subtotal before discounts.
    pub fn subtotal(&self) -> &Money<'a, Currency> {
        &self.subtotal
    }

    /// Total discount, within `[0, subtotal]`.
    pub fn discount(&self) -> &Money<'a, Currency> {
        &self.discount
    }

    /// Amount payable after discounts.
    pub fn total(&self) -> &Money<'a, Currency> {
        &self.total
    }

    /// Whether any applied promotion grants free shipping.
    pub fn free_shipping(&self) -> bool {
        self.free_shipping
    }

    /// Applied promotions in application order.
    pub fn breakdown(&self) -> &[AppliedPromotion<'a>] {
        &self.breakdown
    }

    /// Promotions that were not eligible, with reasons.
    pub fn rejections(&self) -> &[Rejection<'a>] {
        &self.rejections
    }

    /// Promotions dropped by a non-stackable winner.
    pub fn conflicts(&self) -> &[NonStackableConflict] {
        &self.conflicts
    }

    /// Misconfigured promotions that contributed nothing.
    pub fn configuration_issues(&self) -> &[ConfigurationNote] {
        &self.configuration_issues
    }

    /// Keys of the applied promotions, in application order.
    pub fn applied_keys(&self) -> impl Iterator<Item = PromotionKey> + '_ {
        self.breakdown.iter().map(|applied| applied.promotion)
    }

    pub(crate) fn push_rejection(&mut self, rejection: Rejection<'a>) {
        self.rejections.push(rejection);
    }
}

/// Combine `promotions` into a discount for the order in `ctx` at `now`.
///
/// Ineligible promotions are reported as rejections and misconfigured ones as configuration
/// notes; neither takes part in selection. If any remaining promotion is
/// non-stackable, exactly one non-stackable promotion is applied: the lowest priority, then the
/// larger discount against the subtotal, then the earlier in `promotions`. Otherwise every
/// eligible promotion applies in ascending priority order (ties keep input order).
///
/// # Errors
///
/// Returns a [`DiscountError`] if the basket or a discount cannot be calculated.
pub fn compute_discount<'a>(
    promotions: &[Promotion<'a>],
    ctx: &OrderContext<'a>,
    now: DateTime<Utc>,
) -> Result<DiscountOutcome<'a>, DiscountError> {
    let basket = ctx.basket();
    let subtotal = basket.subtotal()?;

    let mut outcome = DiscountOutcome::undiscounted(subtotal);
    let mut eligible: SmallVec<[&Promotion<'a>; 4]> = SmallVec::new();

    for promotion in promotions {
        match check_eligibility(promotion, ctx, now)? {
            Eligibility::Eligible => match promotion.mechanic().validate() {
                Ok(()) => eligible.push(promotion),
                Err(issue) => {
                    warn!(promotion = ?promotion.key(), %issue, "skipping misconfigured promotion");

                    outcome.configuration_issues.push(ConfigurationNote {
                        promotion: promotion.key(),
                        issue,
                    });
                }
            },
            Eligibility::Ineligible(reason) => outcome.push_rejection(Rejection {
                promotion: promotion.key(),
                code: promotion.code().cloned(),
                reason,
            }),
        }
    }

    let selected = match exclusive_winner(&eligible, basket, subtotal)? {
        Some(index) => {
            let winner = eligible.remove(index);

            outcome
                .conflicts
                .extend(eligible.iter().map(|dropped| NonStackableConflict {
                    dropped: dropped.key(),
                    winner: winner.key(),
                }));

            smallvec![winner]
        }
        None => {
            eligible.sort_by_key(|promotion| promotion.priority());
            eligible
        }
    };

    let mut running = subtotal;

    for promotion in selected {
        let PromotionDiscount { amount, issue, .. } =
            promotion_discount(promotion, basket, running)?;

        if let Some(issue) = issue {
            outcome.configuration_issues.push(ConfigurationNote {
                promotion: promotion.key(),
                issue,
            });

            continue;
        }

        running = running.sub(amount)?;

        debug!(
            promotion = ?promotion.key(),
            %amount,
            %running,
            "applied promotion"
        );

        outcome.free_shipping |= promotion.grants_free_shipping();
        outcome.breakdown.push(AppliedPromotion {
            promotion: promotion.key(),
            code: promotion.code().cloned(),
            amount,
            free_shipping: promotion.grants_free_shipping(),
        });
    }

    let discount_minor = subtotal
        .to_minor_units()
        .saturating_sub(running.to_minor_units())
        .clamp(0, subtotal.to_minor_units().max(0));

    outcome.discount = Money::from_minor(discount_minor, subtotal.currency());
    outcome.total = subtotal.sub(outcome.discount)?;

    Ok(outcome)
}

/// Index of the non-stackable promotion to apply alone, if any are eligible.
fn exclusive_winner<'a>(
    eligible: &[&Promotion<'a>],
    basket: &Basket<'a>,
    subtotal: Money<'a, Currency>,
) -> Result<Option<usize>, DiscountError> {
    let mut ranked: SmallVec<[(i32, Reverse<i64>, usize); 2]> = SmallVec::new();

    for (index, promotion) in eligible.iter().enumerate() {
        if promotion.is_stackable() {
            continue;
        }

        let amount = promotion_discount(promotion, basket, subtotal)?.amount;

        ranked.push((promotion.priority(), Reverse(amount.to_minor_units()), index));
    }

    let winner = ranked.into_iter().min().map(|(_, _, index)| index);

    if let Some(index) = winner {
        debug!(
            winner = ?eligible.get(index).map(|promotion| promotion.key()),
            candidates = eligible.len(),
            "non-stackable promotion applies alone"
        );
    }

    Ok(winner)
}
