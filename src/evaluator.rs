//! Promotion Evaluator
//!
//! The request/response boundary of the engine. [`Evaluator::quote`] prices an order without
//! side effects; [`Evaluator::confirm`] records the redemptions of a quote exactly once.

use chrono::{DateTime, Utc};
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    calculator::{
        AppliedPromotion, ConfigurationNote, DiscountOutcome, NonStackableConflict, Rejection,
        compute_discount,
    },
    customers::Customer,
    discounts::DiscountError,
    eligibility::Ineligible,
    orders::OrderContext,
    pricing::TotalPriceError,
    promotions::{Promotion, PromotionKey, code::PromotionCode},
    registry::{ResolveError, auto_apply, resolve_code},
    store::{Confirmation, ConfirmError, OrderRef, PromotionStore, RedemptionClaim, StoreError},
};

/// Errors that prevent an order from being quoted at all.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// A discount could not be calculated.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// The basket could not be totalled.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Priced order, ready to show to the customer and to confirm.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote<'a> {
    eligible: bool,
    code: Option<PromotionCode>,
    reason: Option<Ineligible<'a>>,
    outcome: DiscountOutcome<'a>,
    claims: SmallVec<[RedemptionClaim; 4]>,
}

impl<'a> Quote<'a> {
    /// Whether the requested code applies. Without a code, whether any promotion applied.
    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// The code the customer entered, normalised.
    pub fn code(&self) -> Option<&PromotionCode> {
        self.code.as_ref()
    }

    /// Why the entered code does not apply.
    pub fn reason(&self) -> Option<&Ineligible<'a>> {
        self.reason.as_ref()
    }

    /// Basket subtotal before discounts.
    pub fn subtotal(&self) -> &Money<'a, Currency> {
        self.outcome.subtotal()
    }

    /// Total discount.
    pub fn discount(&self) -> &Money<'a, Currency> {
        self.outcome.discount()
    }

    /// Amount payable after discounts.
    pub fn final_total(&self) -> &Money<'a, Currency> {
        self.outcome.total()
    }

    /// Whether shipping is free.
    pub fn free_shipping(&self) -> bool {
        self.outcome.free_shipping()
    }

    /// Applied promotions, in application order.
    pub fn breakdown(&self) -> &[AppliedPromotion<'a>] {
        self.outcome.breakdown()
    }

    /// Considered promotions that did not apply.
    pub fn rejections(&self) -> &[Rejection<'a>] {
        self.outcome.rejections()
    }

    /// Promotions dropped in favour of a non-stackable promotion.
    pub fn conflicts(&self) -> &[NonStackableConflict] {
        self.outcome.conflicts()
    }

    /// Misconfigured promotions that contributed nothing.
    pub fn configuration_issues(&self) -> &[ConfigurationNote] {
        self.outcome.configuration_issues()
    }

    /// Redemptions to record when the order is confirmed.
    pub fn claims(&self) -> &[RedemptionClaim] {
        &self.claims
    }
}

/// Quotes and confirms orders against a promotion store.
#[derive(Debug)]
pub struct Evaluator<S> {
    store: S,
}

impl<S> Evaluator<S> {
    /// Create an evaluator over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Price an order at `now`, optionally with a customer-entered code.
    ///
    /// Candidates are the entered code's promotion, the codes already applied to the order
    /// and the live auto-apply promotions. If the entered code does not apply, the quote is not
    /// eligible and carries the reason; the order's other promotions are still priced.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] if the store cannot be read or the discount cannot be
    /// calculated.
    pub fn quote<'a>(
        &self,
        code: Option<&str>,
        ctx: &OrderContext<'a>,
        now: DateTime<Utc>,
    ) -> Result<Quote<'a>, EvaluationError>
    where
        S: PromotionStore<'a>,
    {
        let code = code.and_then(|code| PromotionCode::new(code).ok());

        let mut candidates: Vec<Promotion<'a>> = Vec::new();
        let mut rejections: Vec<Rejection<'a>> = Vec::new();
        let mut refused: Option<Ineligible<'a>> = None;

        if let Some(code) = &code {
            match resolve_code(&self.store, code, now) {
                Ok(promotion) => candidates.push(promotion),
                Err(ResolveError::Rejected(reason)) => {
                    if let Some(promotion) = self.store.find_by_code(code)? {
                        rejections.push(Rejection {
                            promotion: promotion.key(),
                            code: Some(code.clone()),
                            reason: reason.clone(),
                        });
                    }

                    refused = Some(reason);
                }
                Err(ResolveError::Store(err)) => return Err(err.into()),
            }
        }

        for applied in ctx.applied_codes() {
            if code.as_ref() == Some(applied) {
                continue;
            }

            match resolve_code(&self.store, applied, now) {
                Ok(promotion) => candidates.push(promotion),
                Err(ResolveError::Rejected(reason)) => {
                    if let Some(promotion) = self.store.find_by_code(applied)? {
                        rejections.push(Rejection {
                            promotion: promotion.key(),
                            code: Some(applied.clone()),
                            reason,
                        });
                    }
                }
                Err(ResolveError::Store(err)) => return Err(err.into()),
            }
        }

        candidates.extend(auto_apply(&self.store, now)?);

        let mut seen: SmallVec<[_; 8]> = SmallVec::new();
        candidates.retain(|promotion| {
            let first = !seen.contains(&promotion.key());
            seen.push(promotion.key());
            first
        });

        let ctx = self.with_ledger_counts(ctx, &candidates)?;
        let mut outcome = compute_discount(&candidates, &ctx, now)?;

        for rejection in rejections {
            outcome.push_rejection(rejection);
        }

        let entered = code.as_ref().and_then(|code| {
            candidates
                .iter()
                .find(|promotion| promotion.code() == Some(code))
                .map(Promotion::key)
        });

        if let (None, Some(key)) = (&refused, entered) {
            refused = entered_code_reason(&outcome, key);
        }

        if let (Some(code), Some(reason)) = (&code, &refused) {
            debug!(%code, %reason, "entered code not applied");
        }

        let claims = outcome
            .applied_keys()
            .filter_map(|key| candidates.iter().find(|promotion| promotion.key() == key))
            .map(|promotion| RedemptionClaim {
                promotion: promotion.key(),
                version: promotion.version(),
            })
            .collect();

        let eligible = if code.is_some() {
            refused.is_none()
        } else {
            !outcome.breakdown().is_empty()
        };

        debug!(
            code = code.as_ref().map(PromotionCode::as_str),
            discount = %outcome.discount(),
            total = %outcome.total(),
            applied = outcome.breakdown().len(),
            "quoted order"
        );

        Ok(Quote {
            eligible,
            code,
            reason: refused,
            outcome,
            claims,
        })
    }

    /// Record the redemptions of a quote for an order.
    ///
    /// Confirming the same order again returns the original confirmation. If a cap was reached
    /// or a promotion changed since quoting, nothing is recorded; re-quote with the failing
    /// promotion excluded.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfirmError`] if any redemption can no longer be honoured.
    pub fn confirm<'a>(
        &self,
        order: &OrderRef,
        quote: &Quote<'a>,
        customer: &Customer,
    ) -> Result<Confirmation, ConfirmError>
    where
        S: PromotionStore<'a>,
    {
        let confirmation = self
            .store
            .commit_redemptions(order, customer.id(), quote.claims())?;

        info!(
            %order,
            customer = %customer.id(),
            promotions = confirmation.promotions().len(),
            "confirmed order"
        );

        Ok(confirmation)
    }

    /// Raise the context's per-customer redemption counts to what the store has recorded.
    fn with_ledger_counts<'a>(
        &self,
        ctx: &OrderContext<'a>,
        candidates: &[Promotion<'a>],
    ) -> Result<OrderContext<'a>, StoreError>
    where
        S: PromotionStore<'a>,
    {
        let mut ctx = ctx.clone();

        for promotion in candidates {
            let recorded = self
                .store
                .redemption_count(promotion.key(), ctx.customer().id())?;

            if recorded > ctx.prior_redemptions(promotion.key()) {
                ctx = ctx.with_prior_redemptions(promotion.key(), recorded);
            }
        }

        Ok(ctx)
    }
}

/// Why the entered code's promotion is missing from the outcome, if it is.
fn entered_code_reason<'a>(
    outcome: &DiscountOutcome<'a>,
    promotion: PromotionKey,
) -> Option<Ineligible<'a>> {
    if outcome.applied_keys().any(|key| key == promotion) {
        return None;
    }

    if let Some(rejection) = outcome
        .rejections()
        .iter()
        .find(|rejection| rejection.promotion == promotion)
    {
        return Some(rejection.reason.clone());
    }

    if let Some(conflict) = outcome
        .conflicts()
        .iter()
        .find(|conflict| conflict.dropped == promotion)
    {
        return Some(Ineligible::NotCombinable {
            winner: conflict.winner,
        });
    }

    Some(Ineligible::Unavailable)
}
