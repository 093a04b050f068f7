//! Promotion Store
//!
//! The persistence seam of the engine. Evaluation only reads promotions; the single write is
//! [`PromotionStore::commit_redemptions`], which records every redemption of a confirmed order
//! in one transaction.

use std::{
    fmt,
    sync::{PoisonError, RwLock},
};

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    customers::CustomerId,
    promotions::{Promotion, PromotionKey, code::PromotionCode},
};

/// Caller's reference for an order; confirmations are idempotent per reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderRef(String);

impl OrderRef {
    /// Create an order reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// The reference as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A promotion to redeem, with the version it was quoted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionClaim {
    /// Promotion to redeem
    pub promotion: PromotionKey,

    /// Version of the promotion when the order was quoted
    pub version: u64,
}

/// Record of a confirmed order's redemptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    order: OrderRef,
    customer: CustomerId,
    promotions: SmallVec<[PromotionKey; 4]>,
}

impl Confirmation {
    /// The confirmed order.
    pub fn order(&self) -> &OrderRef {
        &self.order
    }

    /// The customer that placed the order.
    pub fn customer(&self) -> &CustomerId {
        &self.customer
    }

    /// Promotions redeemed by the order.
    pub fn promotions(&self) -> &[PromotionKey] {
        &self.promotions
    }
}

/// Store infrastructure errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A writer panicked while holding the store lock.
    #[error("promotion store lock was poisoned")]
    Poisoned,

    /// Another promotion already uses this code.
    #[error("promotion code {0} is already in use")]
    DuplicateCode(PromotionCode),

    /// No promotion has this key.
    #[error("promotion {0:?} does not exist")]
    UnknownPromotion(PromotionKey),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

/// Why redemptions could not be recorded. Nothing is recorded when any claim fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfirmError {
    /// The promotion reached its global limit after the order was quoted.
    #[error("promotion {promotion:?} has reached its usage limit of {limit}")]
    LimitExceededGlobal {
        /// Promotion that is exhausted
        promotion: PromotionKey,

        /// Global limit
        limit: u32,
    },

    /// The customer reached the promotion's per-customer limit after the order was quoted.
    #[error("customer has already used promotion {promotion:?} {limit} time(s)")]
    LimitExceededCustomer {
        /// Promotion that is exhausted for this customer
        promotion: PromotionKey,

        /// Per-customer limit
        limit: u32,
    },

    /// The promotion was edited, disabled or removed after the order was quoted.
    #[error("promotion {promotion:?} changed since the order was quoted")]
    PromotionChanged {
        /// Promotion that changed
        promotion: PromotionKey,
    },

    /// Store infrastructure failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Source of promotions and sink of redemptions.
pub trait PromotionStore<'a> {
    /// Find the promotion with a code.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    fn find_by_code(&self, code: &PromotionCode) -> Result<Option<Promotion<'a>>, StoreError>;

    /// All auto-apply promotions, in insertion order, whatever their state.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    fn auto_apply(&self) -> Result<Vec<Promotion<'a>>, StoreError>;

    /// Get a promotion by key.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    fn get(&self, promotion: PromotionKey) -> Result<Option<Promotion<'a>>, StoreError>;

    /// Number of confirmed redemptions of a promotion by a customer.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    fn redemption_count(
        &self,
        promotion: PromotionKey,
        customer: &CustomerId,
    ) -> Result<u32, StoreError>;

    /// Atomically record one redemption of every claimed promotion for an order.
    ///
    /// Caps are re-checked and versions compared at commit time. Either every claim is
    /// recorded or none is. Committing an order that was already confirmed returns the
    /// original confirmation without recording anything.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfirmError`] naming the first claim that can no longer be honoured.
    fn commit_redemptions(
        &self,
        order: &OrderRef,
        customer: &CustomerId,
        claims: &[RedemptionClaim],
    ) -> Result<Confirmation, ConfirmError>;
}

#[derive(Debug, Default)]
struct Inner<'a> {
    promotions: SlotMap<PromotionKey, Promotion<'a>>,
    insertion_order: Vec<PromotionKey>,
    codes: FxHashMap<PromotionCode, PromotionKey>,
    redemptions: FxHashMap<(PromotionKey, CustomerId), u32>,

    /// Every confirmed order, kept for the life of the store so retries stay idempotent.
    confirmed: FxHashMap<OrderRef, Confirmation>,
}

impl Inner<'_> {
    fn redeemed(&self, promotion: PromotionKey, customer: &CustomerId) -> u32 {
        self.redemptions
            .get(&(promotion, customer.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn claim_code(
        &self,
        code: Option<&PromotionCode>,
        owner: Option<PromotionKey>,
    ) -> Result<(), StoreError> {
        match code.and_then(|code| self.codes.get(code).map(|key| (code, *key))) {
            Some((code, key)) if Some(key) != owner => Err(StoreError::DuplicateCode(code.clone())),
            _ => Ok(()),
        }
    }
}

/// Thread-safe in-memory promotion store.
///
/// Confirmations are never evicted: the order ledger grows with every confirmed order, so this
/// store suits tests, demos and short-lived processes rather than long-running services.
#[derive(Debug, Default)]
pub struct MemoryStore<'a> {
    inner: RwLock<Inner<'a>>,
}

impl<'a> MemoryStore<'a> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from promotions, in order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if two promotions share a code.
    pub fn with_promotions(
        promotions: impl IntoIterator<Item = Promotion<'a>>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();

        for promotion in promotions {
            store.insert(promotion)?;
        }

        Ok(store)
    }

    /// Add a promotion, assigning it a new key.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the code is already in use.
    pub fn insert(&self, mut promotion: Promotion<'a>) -> Result<PromotionKey, StoreError> {
        let mut inner = self.inner.write()?;

        inner.claim_code(promotion.code(), None)?;

        let code = promotion.code().cloned();
        let key = inner.promotions.insert_with_key(|key| {
            promotion.set_key(key);
            promotion
        });

        inner.insertion_order.push(key);

        if let Some(code) = code {
            inner.codes.insert(code, key);
        }

        Ok(key)
    }

    /// Replace a promotion's definition, keeping its key and redemption count.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the promotion does not exist or the new code is in use.
    pub fn replace(
        &self,
        key: PromotionKey,
        mut promotion: Promotion<'a>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write()?;

        inner.claim_code(promotion.code(), Some(key))?;

        let inner = &mut *inner;
        let existing = inner
            .promotions
            .get_mut(key)
            .ok_or(StoreError::UnknownPromotion(key))?;

        if let Some(code) = existing.code() {
            inner.codes.remove(code);
        }

        if let Some(code) = promotion.code() {
            inner.codes.insert(code.clone(), key);
        }

        promotion.supersede(existing);
        *existing = promotion;

        Ok(())
    }

    /// Enable or disable a promotion.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the promotion does not exist.
    pub fn set_active(&self, key: PromotionKey, is_active: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write()?;

        inner
            .promotions
            .get_mut(key)
            .ok_or(StoreError::UnknownPromotion(key))?
            .set_active(is_active);

        Ok(())
    }

    /// Remove a promotion. Its redemption history is kept.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be written.
    pub fn remove(&self, key: PromotionKey) -> Result<Option<Promotion<'a>>, StoreError> {
        let mut inner = self.inner.write()?;

        let removed = inner.promotions.remove(key);

        if let Some(code) = removed.as_ref().and_then(Promotion::code) {
            inner.codes.remove(code);
        }

        inner.insertion_order.retain(|existing| *existing != key);

        Ok(removed)
    }

    /// Number of promotions in the store.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read()?.promotions.len())
    }

    /// Whether the store has no promotions.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// The confirmation recorded for an order, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be read.
    pub fn confirmation(&self, order: &OrderRef) -> Result<Option<Confirmation>, StoreError> {
        Ok(self.inner.read()?.confirmed.get(order).cloned())
    }
}

impl<'a> PromotionStore<'a> for MemoryStore<'a> {
    fn find_by_code(&self, code: &PromotionCode) -> Result<Option<Promotion<'a>>, StoreError> {
        let inner = self.inner.read()?;

        Ok(inner
            .codes
            .get(code)
            .and_then(|key| inner.promotions.get(*key))
            .cloned())
    }

    fn auto_apply(&self) -> Result<Vec<Promotion<'a>>, StoreError> {
        let inner = self.inner.read()?;

        Ok(inner
            .insertion_order
            .iter()
            .filter_map(|key| inner.promotions.get(*key))
            .filter(|promotion| promotion.is_auto_apply())
            .cloned()
            .collect())
    }

    fn get(&self, promotion: PromotionKey) -> Result<Option<Promotion<'a>>, StoreError> {
        Ok(self.inner.read()?.promotions.get(promotion).cloned())
    }

    fn redemption_count(
        &self,
        promotion: PromotionKey,
        customer: &CustomerId,
    ) -> Result<u32, StoreError> {
        Ok(self.inner.read()?.redeemed(promotion, customer))
    }

    fn commit_redemptions(
        &self,
        order: &OrderRef,
        customer: &CustomerId,
        claims: &[RedemptionClaim],
    ) -> Result<Confirmation, ConfirmError> {
        let mut guard = self.inner.write().map_err(StoreError::from)?;
        let inner = &mut *guard;

        if let Some(existing) = inner.confirmed.get(order) {
            debug!(%order, "order already confirmed");

            return Ok(existing.clone());
        }

        let mut unique: SmallVec<[RedemptionClaim; 4]> = SmallVec::new();

        for claim in claims {
            if !unique.iter().any(|seen| seen.promotion == claim.promotion) {
                unique.push(*claim);
            }
        }

        for claim in &unique {
            let promotion = inner
                .promotions
                .get(claim.promotion)
                .filter(|promotion| promotion.is_active() && promotion.version() == claim.version)
                .ok_or(ConfirmError::PromotionChanged {
                    promotion: claim.promotion,
                })?;

            let usage = promotion.usage();

            if !usage.allows_global(promotion.used_count()) {
                return Err(ConfirmError::LimitExceededGlobal {
                    promotion: claim.promotion,
                    limit: usage.global,
                });
            }

            if !usage.allows_customer(inner.redeemed(claim.promotion, customer)) {
                return Err(ConfirmError::LimitExceededCustomer {
                    promotion: claim.promotion,
                    limit: usage.per_customer,
                });
            }
        }

        for claim in &unique {
            if let Some(promotion) = inner.promotions.get_mut(claim.promotion) {
                promotion.record_redemption();

                info!(
                    %order,
                    promotion = ?claim.promotion,
                    used_count = promotion.used_count(),
                    "recorded redemption"
                );
            }

            *inner
                .redemptions
                .entry((claim.promotion, customer.clone()))
                .or_default() += 1;
        }

        let confirmation = Confirmation {
            order: order.clone(),
            customer: customer.clone(),
            promotions: unique.iter().map(|claim| claim.promotion).collect(),
        };

        inner.confirmed.insert(order.clone(), confirmation.clone());

        Ok(confirmation)
    }
}
