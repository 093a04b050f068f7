//! Integration tests for the `storefront` fixture set.
//!
//! All quotes are taken on 2026-06-01, inside the `SAVE10` window and after the spring sale.
//!
//! Carts:
//!
//! - `family`: 2x Streaming Premium ($17.99), Music Family ($16.99), 2x Cloud Storage ($9.99)
//!   - Subtotal: $72.95, 5 units eligible for "Bundle & Save"
//!   - Auto-apply only: bundle takes 10% = $7.30 (729.5 cents rounds half away from zero)
//!   - With `SAVE10` (priority 10): $7.30 first, then the bundle (priority 30) takes 10% of the
//!     remaining $65.65 = $6.57, total $59.08
//!
//! - `gold`: 2x VPN Annual ($59.99), Streaming Premium, Gift Card ($25.00), gold tier
//!   - Subtotal: $162.97, `VIP25` base excludes the gift card: $137.97
//!   - 25% = $34.49, capped at $30.00, total $132.97 with free shipping
//!
//! - `stacked`: 2x VPN Annual, Streaming Basic ($8.99), `WELCOME5` already applied
//!   - Subtotal: $128.97
//!   - `VPNPAIR` (priority 5): second VPN half price = $30.00 (2999.5 cents rounded)
//!   - `WELCOME5` (priority 20): $5.00, total $93.97

use chrono::{DateTime, Duration, Utc};
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::USD};
use testresult::TestResult;

use rebate::{
    customers::LoyaltyTier,
    eligibility::Ineligible,
    evaluator::Evaluator,
    fixtures::{Fixture, promotions::parse_day},
    promotions::{PromotionKey, PromotionMeta, code::PromotionCode},
    store::{MemoryStore, PromotionStore},
};

struct Storefront {
    fixture: Fixture<'static>,
    names: FxHashMap<PromotionKey, PromotionMeta>,
    evaluator: Evaluator<MemoryStore<'static>>,
}

impl Storefront {
    fn load() -> TestResult<Self> {
        let fixture = Fixture::from_set("storefront")?;
        let store = MemoryStore::new();
        let names = fixture.populate(&store)?;

        Ok(Self {
            fixture,
            names,
            evaluator: Evaluator::new(store),
        })
    }

    fn key_of(&self, code: &str) -> TestResult<PromotionKey> {
        let promotion = self
            .evaluator
            .store()
            .find_by_code(&PromotionCode::new(code)?)?
            .ok_or("unknown code")?;

        Ok(promotion.key())
    }

    fn key_named(&self, name: &str) -> TestResult<PromotionKey> {
        let key = self
            .names
            .iter()
            .find(|(_, meta)| meta.name == name)
            .map(|(key, _)| *key)
            .ok_or("unknown promotion name")?;

        Ok(key)
    }
}

fn june() -> TestResult<DateTime<Utc>> {
    Ok(parse_day("2026-06-01")? + Duration::hours(12))
}

#[test]
fn auto_apply_bundle_discounts_family_cart() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("family")?;

    let quote = shop.evaluator.quote(None, &order, june()?)?;

    assert!(quote.is_eligible());
    assert_eq!(quote.subtotal(), &Money::from_minor(7295, USD));
    assert_eq!(quote.discount(), &Money::from_minor(730, USD));
    assert_eq!(quote.final_total(), &Money::from_minor(6565, USD));
    assert_eq!(quote.breakdown().len(), 1);

    Ok(())
}

#[test]
fn save10_stacks_with_bundle_in_priority_order() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("family")?;

    let quote = shop.evaluator.quote(Some("save10"), &order, june()?)?;

    let applied: Vec<(PromotionKey, i64)> = quote
        .breakdown()
        .iter()
        .map(|applied| (applied.promotion, applied.amount.to_minor_units()))
        .collect();

    assert!(quote.is_eligible());
    assert_eq!(
        applied,
        vec![
            (shop.key_of("SAVE10")?, 730),
            (shop.key_named("Bundle & Save")?, 657)
        ]
    );
    assert_eq!(quote.discount(), &Money::from_minor(1387, USD));
    assert_eq!(quote.final_total(), &Money::from_minor(5908, USD));

    Ok(())
}

#[test]
fn vip_code_is_capped_and_grants_free_shipping() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("gold")?;

    let quote = shop.evaluator.quote(Some("VIP25"), &order, june()?)?;

    assert!(quote.is_eligible());
    assert_eq!(quote.subtotal(), &Money::from_minor(16_297, USD));
    assert_eq!(quote.discount(), &Money::from_minor(3000, USD));
    assert_eq!(quote.final_total(), &Money::from_minor(13_297, USD));
    assert!(quote.free_shipping());
    assert_eq!(quote.breakdown().len(), 1);

    Ok(())
}

#[test]
fn vip_code_is_refused_without_gold_tier() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("starter")?;

    let quote = shop.evaluator.quote(Some("VIP25"), &order, june()?)?;

    assert!(!quote.is_eligible());
    assert_eq!(
        quote.reason(),
        Some(&Ineligible::LoyaltyTierMismatch {
            required: LoyaltyTier::Gold,
            actual: None,
        })
    );
    assert_eq!(quote.discount(), &Money::from_minor(0, USD));
    assert_eq!(quote.final_total(), quote.subtotal());
    assert!(quote.claims().is_empty());

    Ok(())
}

#[test]
fn applied_code_stacks_with_entered_code() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("stacked")?;

    let quote = shop.evaluator.quote(Some("VPNPAIR"), &order, june()?)?;

    let applied: Vec<i64> = quote
        .breakdown()
        .iter()
        .map(|applied| applied.amount.to_minor_units())
        .collect();

    assert_eq!(applied, vec![3000, 500]);
    assert_eq!(quote.final_total(), &Money::from_minor(9397, USD));
    assert_eq!(quote.claims().len(), 2);

    Ok(())
}

#[test]
fn mistyped_code_keeps_codes_already_applied() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("stacked")?;

    let quote = shop.evaluator.quote(Some("SAVE1O"), &order, june()?)?;

    assert!(!quote.is_eligible());
    assert_eq!(
        quote.reason(),
        Some(&Ineligible::NotFound(PromotionCode::new("SAVE1O")?))
    );
    assert_eq!(quote.discount(), &Money::from_minor(500, USD));
    assert_eq!(quote.final_total(), &Money::from_minor(12_397, USD));
    assert_eq!(
        quote
            .claims()
            .iter()
            .map(|claim| claim.promotion)
            .collect::<Vec<_>>(),
        vec![shop.key_of("WELCOME5")?]
    );

    Ok(())
}

#[test]
fn unusable_codes_explain_why() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("family")?;
    let now = june()?;

    let reason = |code: &str| -> TestResult<Option<Ineligible<'static>>> {
        Ok(shop.evaluator.quote(Some(code), &order, now)?.reason().cloned())
    };

    assert_eq!(reason("SPRING15")?, Some(Ineligible::Expired));
    assert_eq!(reason("PAUSED")?, Some(Ineligible::Inactive));
    assert_eq!(
        reason("SAVE20")?,
        Some(Ineligible::NotFound(PromotionCode::new("SAVE20")?))
    );

    Ok(())
}

#[test]
fn excluded_products_do_not_count_towards_minimum_spend() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("gifts")?;

    let quote = shop.evaluator.quote(Some("SAVE10"), &order, june()?)?;

    assert!(!quote.is_eligible());
    assert_eq!(
        quote.reason(),
        Some(&Ineligible::MinimumPurchaseNotMet {
            required: Money::from_minor(2000, USD),
            actual: Money::from_minor(0, USD),
        })
    );

    Ok(())
}

#[test]
fn save10_expires_after_its_last_day() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("family")?;

    let last_day = parse_day("2026-12-31")? + Duration::hours(23);
    let next_year = parse_day("2027-01-01")?;

    assert!(
        shop.evaluator
            .quote(Some("SAVE10"), &order, last_day)?
            .is_eligible()
    );
    assert_eq!(
        shop.evaluator
            .quote(Some("SAVE10"), &order, next_year)?
            .reason(),
        Some(&Ineligible::Expired)
    );

    Ok(())
}

#[test]
fn quoting_is_free_of_side_effects() -> TestResult {
    let shop = Storefront::load()?;
    let order = shop.fixture.cart("family")?;
    let now = june()?;

    let first = shop.evaluator.quote(Some("SAVE10"), &order, now)?;
    let second = shop.evaluator.quote(Some("SAVE10"), &order, now)?;

    assert_eq!(first, second);

    let save10 = shop
        .evaluator
        .store()
        .get(shop.key_of("SAVE10")?)?
        .ok_or("SAVE10 missing")?;

    assert_eq!(save10.used_count(), 0);

    Ok(())
}
