//! Rebate
//!
//! Rebate is a promotion evaluation engine: it resolves discount codes, checks whether an order
//! qualifies for them, and computes the resulting price adjustment across percentage, fixed
//! amount, bulk tier and buy-X-get-Y promotions, honouring stacking, priority and usage caps.

pub mod basket;
pub mod calculator;
pub mod customers;
pub mod discounts;
pub mod eligibility;
pub mod evaluator;
pub mod fixtures;
pub mod items;
pub mod orders;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod promotions;
pub mod receipt;
pub mod registry;
pub mod store;
pub mod utils;
