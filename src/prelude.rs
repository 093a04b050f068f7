//! Rebate prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    basket::{Basket, BasketError},
    calculator::{
        AppliedPromotion, ConfigurationNote, DiscountOutcome, NonStackableConflict, Rejection,
        compute_discount,
    },
    customers::{Customer, CustomerId, LoyaltyTier},
    discounts::{DiscountError, PromotionDiscount, promotion_discount},
    eligibility::{Eligibility, Ineligible, check_eligibility, is_eligible},
    evaluator::{EvaluationError, Evaluator, Quote},
    items::LineItem,
    orders::OrderContext,
    pricing::TotalPriceError,
    products::{Product, ProductKey},
    promotions::{
        Promotion, PromotionKey, PromotionMeta,
        code::{PromotionCode, PromotionCodeError},
        mechanics::{BulkTier, BulkTiers, BuyXGetY, BuyXGetYReward, ConfigurationIssue, Mechanic},
        scope::ProductScope,
        usage::UsageLimits,
        validity::{ValidityWindow, WindowStatus},
    },
    receipt::{Receipt, ReceiptError},
    registry::{ResolveError, resolve},
    store::{
        Confirmation, ConfirmError, MemoryStore, OrderRef, PromotionStore, RedemptionClaim,
        StoreError,
    },
};
