//! Code Registry
//!
//! Resolves the promotions to consider for an order: the one a customer's code names, or every
//! live auto-apply promotion when no code is given.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::{
    eligibility::Ineligible,
    promotions::{Promotion, code::PromotionCode, validity::WindowStatus},
    store::{PromotionStore, StoreError},
};

/// Errors resolving promotions.
#[derive(Debug, Error, PartialEq)]
pub enum ResolveError<'a> {
    /// The code does not name a usable promotion.
    #[error(transparent)]
    Rejected(Ineligible<'a>),

    /// The store could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolve candidate promotions for an order.
///
/// With a code, returns the single promotion it names. Without one (or with a blank code),
/// returns the live auto-apply promotions in ascending priority order, ties in insertion order.
///
/// # Errors
///
/// Returns [`ResolveError::Rejected`] if the code is unknown, disabled, expired or not yet
/// valid, and [`ResolveError::Store`] if the store cannot be read.
pub fn resolve<'a, S>(
    store: &S,
    code: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<Promotion<'a>>, ResolveError<'a>>
where
    S: PromotionStore<'a> + ?Sized,
{
    match code.and_then(|code| PromotionCode::new(code).ok()) {
        Some(code) => Ok(vec![resolve_code(store, &code, now)?]),
        None => Ok(auto_apply(store, now)?),
    }
}

/// Look up the promotion a code names and check it can currently be redeemed.
///
/// # Errors
///
/// Returns [`ResolveError::Rejected`] with `NotFound`, `Inactive`, `Expired` or `NotYetValid`,
/// or [`ResolveError::Store`] if the store cannot be read.
pub fn resolve_code<'a, S>(
    store: &S,
    code: &PromotionCode,
    now: DateTime<Utc>,
) -> Result<Promotion<'a>, ResolveError<'a>>
where
    S: PromotionStore<'a> + ?Sized,
{
    let promotion = store
        .find_by_code(code)?
        .ok_or_else(|| ResolveError::Rejected(Ineligible::NotFound(code.clone())))?;

    let rejection = if promotion.is_active() {
        match promotion.window_status(now) {
            WindowStatus::Open => None,
            WindowStatus::NotYetValid => Some(Ineligible::NotYetValid),
            WindowStatus::Expired => Some(Ineligible::Expired),
        }
    } else {
        Some(Ineligible::Inactive)
    };

    match rejection {
        None => Ok(promotion),
        Some(reason) => {
            debug!(%code, %reason, "code rejected");

            Err(ResolveError::Rejected(reason))
        }
    }
}

/// Live auto-apply promotions, in ascending priority order (ties in insertion order).
///
/// # Errors
///
/// Returns a [`StoreError`] if the store cannot be read.
pub fn auto_apply<'a, S>(store: &S, now: DateTime<Utc>) -> Result<Vec<Promotion<'a>>, StoreError>
where
    S: PromotionStore<'a> + ?Sized,
{
    let mut promotions: Vec<Promotion<'a>> = store
        .auto_apply()?
        .into_iter()
        .filter(|promotion| promotion.is_live(now))
        .collect();

    promotions.sort_by_key(Promotion::priority);

    Ok(promotions)
}
