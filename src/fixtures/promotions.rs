//! Promotion Fixtures

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;

use crate::{
    customers::LoyaltyTier,
    fixtures::{
        FixtureError,
        products::{parse_money_in, parse_price},
    },
    products::ProductKey,
    promotions::{
        Promotion, PromotionKey, PromotionMeta, code::PromotionCode, scope::ProductScope,
        usage::UsageLimits, validity::ValidityWindow,
    },
};

pub mod mechanics;

use mechanics::MechanicFixture;

/// Wrapper for promotions in YAML
///
/// Promotions load in key order, which decides ties between equal priorities.
#[derive(Debug, Deserialize)]
pub struct PromotionsFixture {
    /// Map of promotion key -> promotion fixture
    pub promotions: BTreeMap<String, PromotionFixture>,
}

fn enabled() -> bool {
    true
}

fn one() -> u32 {
    1
}

/// Promotion fixture from YAML
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromotionFixture {
    /// Promotion name
    pub name: String,

    /// Redeemable code
    pub code: Option<String>,

    /// Discount mechanic
    pub mechanic: MechanicFixture,

    /// Minimum spend on eligible items (e.g. "50.00 USD")
    pub min_purchase: Option<String>,

    /// Discount cap (e.g. "5.00 USD")
    pub max_discount: Option<String>,

    /// First valid day, from midnight UTC
    pub valid_from: Option<NaiveDate>,

    /// Last valid day, until the end of the day UTC
    pub valid_to: Option<NaiveDate>,

    /// Whether the promotion is enabled
    #[serde(default = "enabled")]
    pub active: bool,

    /// Global redemption limit, 0 for unlimited
    #[serde(default)]
    pub usage_limit: u32,

    /// Per-customer redemption limit, 0 for unlimited
    #[serde(default = "one")]
    pub per_customer_limit: u32,

    /// Redemptions already recorded
    #[serde(default)]
    pub used_count: u32,

    /// Priority, lower applies first
    #[serde(default)]
    pub priority: i32,

    /// Whether the promotion combines with others
    #[serde(default = "enabled")]
    pub stackable: bool,

    /// Whether the promotion applies without a code
    #[serde(default)]
    pub auto_apply: bool,

    /// Whether the promotion grants free shipping
    #[serde(default)]
    pub free_shipping: bool,

    /// Loyalty tier restriction
    pub loyalty_tier: Option<LoyaltyTier>,

    /// Minimum quantity of eligible units
    pub minimum_items: Option<u32>,

    /// Product keys the promotion is limited to
    #[serde(default)]
    pub applicable_products: Vec<String>,

    /// Product keys the promotion never applies to
    #[serde(default)]
    pub excluded_products: Vec<String>,
}

impl PromotionFixture {
    /// Convert to `PromotionMeta` and `Promotion`
    ///
    /// # Errors
    ///
    /// Returns an error if a value is malformed, a product is unknown, or an amount is in a
    /// different currency to the loaded products.
    pub fn try_into_promotion(
        self,
        products: &FxHashMap<String, ProductKey>,
        currency: Option<&'static Currency>,
    ) -> Result<(PromotionMeta, Promotion<'static>), FixtureError> {
        let meta = PromotionMeta {
            name: self.name.clone(),
        };

        let mechanic = self.mechanic.try_into_mechanic(products, currency)?;
        let scope = ProductScope::new(
            product_keys(products, &self.applicable_products)?,
            product_keys(products, &self.excluded_products)?,
        );

        let mut promotion = Promotion::new(PromotionKey::default(), mechanic)
            .with_scope(scope)
            .with_validity(validity(self.valid_from, self.valid_to)?)
            .with_active(self.active)
            .with_usage(
                UsageLimits::with_global_limit(self.usage_limit)
                    .per_customer(self.per_customer_limit),
            )
            .with_used_count(self.used_count)
            .with_priority(self.priority)
            .with_stackable(self.stackable)
            .with_auto_apply(self.auto_apply)
            .with_free_shipping(self.free_shipping);

        if let Some(code) = self.code {
            let code = PromotionCode::new(&code).map_err(FixtureError::Code)?;

            promotion = promotion.with_code(code);
        }

        if let Some(amount) = self.min_purchase {
            promotion = promotion.with_min_purchase(money(&amount, currency)?);
        }

        if let Some(amount) = self.max_discount {
            promotion = promotion.with_max_discount(money(&amount, currency)?);
        }

        if let Some(tier) = self.loyalty_tier {
            promotion = promotion.with_loyalty_tier(tier);
        }

        if let Some(quantity) = self.minimum_items {
            promotion = promotion.with_minimum_items(quantity);
        }

        Ok((meta, promotion))
    }
}

fn product_keys(
    products: &FxHashMap<String, ProductKey>,
    keys: &[String],
) -> Result<Vec<ProductKey>, FixtureError> {
    keys.iter()
        .map(|key| {
            products
                .get(key)
                .copied()
                .ok_or_else(|| FixtureError::ProductNotFound(key.clone()))
        })
        .collect()
}

fn money(
    amount: &str,
    currency: Option<&'static Currency>,
) -> Result<Money<'static, Currency>, FixtureError> {
    match currency {
        Some(currency) => parse_money_in(amount, currency),
        None => {
            let (minor_units, currency) = parse_price(amount)?;

            Ok(Money::from_minor(minor_units, currency))
        }
    }
}

/// Whole-day validity window in UTC, inclusive at both ends.
fn validity(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<ValidityWindow, FixtureError> {
    let start = from
        .map(|day| {
            day.and_hms_opt(0, 0, 0)
                .map(|time| time.and_utc())
                .ok_or_else(|| FixtureError::InvalidPromotionData(format!("valid_from {day}")))
        })
        .transpose()?;

    let end = to
        .map(|day| {
            day.and_hms_milli_opt(23, 59, 59, 999)
                .map(|time| time.and_utc())
                .ok_or_else(|| FixtureError::InvalidPromotionData(format!("valid_to {day}")))
        })
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(FixtureError::InvalidPromotionData(format!(
            "validity window ends ({end}) before it starts ({start})"
        )));
    }

    Ok(ValidityWindow {
        from: start,
        to: end,
    })
}

/// Parse a fixture date into the start of that day in UTC.
///
/// # Errors
///
/// Returns [`FixtureError::InvalidPromotionData`] if the date is not `YYYY-MM-DD`.
pub fn parse_day(day: &str) -> Result<DateTime<Utc>, FixtureError> {
    NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| FixtureError::InvalidPromotionData(format!("invalid date {day}")))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use decimal_percentage::Percentage;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::promotions::{mechanics::Mechanic, validity::WindowStatus};

    use super::*;

    const SAVE10: &str = "
promotions:
  save10:
    name: Save 10%
    code: save10
    mechanic:
      type: percentage
      value: 10%
    min_purchase: 50.00 USD
    max_discount: 5.00 USD
    valid_from: 2026-01-01
    valid_to: 2026-01-31
    usage_limit: 100
    priority: 1
";

    #[test]
    fn promotions_fixture_parses_yaml() -> TestResult {
        let fixture: PromotionsFixture = serde_norway::from_str(SAVE10)?;

        assert_eq!(fixture.promotions.len(), 1);
        assert!(fixture.promotions.contains_key("save10"));

        Ok(())
    }

    #[test]
    fn promotion_fixture_converts_every_field() -> TestResult {
        let mut fixture: PromotionsFixture = serde_norway::from_str(SAVE10)?;
        let promotion = fixture
            .promotions
            .remove("save10")
            .ok_or("missing save10")?;

        let (meta, promotion) = promotion.try_into_promotion(&FxHashMap::default(), Some(USD))?;

        assert_eq!(meta.name, "Save 10%");
        assert_eq!(promotion.code().map(PromotionCode::as_str), Some("SAVE10"));
        assert_eq!(
            promotion.mechanic(),
            &Mechanic::Percentage(Percentage::from(0.1))
        );
        assert_eq!(promotion.min_purchase(), Some(&Money::from_minor(5000, USD)));
        assert_eq!(promotion.max_discount(), Some(&Money::from_minor(500, USD)));
        assert_eq!(promotion.usage(), &UsageLimits::with_global_limit(100));
        assert_eq!(promotion.priority(), 1);
        assert!(promotion.is_active());
        assert!(promotion.is_stackable());
        assert!(!promotion.is_auto_apply());

        Ok(())
    }

    #[test]
    fn fixture_dates_cover_whole_days() -> TestResult {
        let mut fixture: PromotionsFixture = serde_norway::from_str(SAVE10)?;
        let promotion = fixture
            .promotions
            .remove("save10")
            .ok_or("missing save10")?;

        let (_, promotion) = promotion.try_into_promotion(&FxHashMap::default(), Some(USD))?;

        let first_day = parse_day("2026-01-01")?;
        let last_day = parse_day("2026-01-31")?;

        assert_eq!(
            promotion.window_status(first_day - Duration::milliseconds(1)),
            WindowStatus::NotYetValid
        );
        assert_eq!(promotion.window_status(first_day), WindowStatus::Open);
        assert_eq!(
            promotion.window_status(last_day + Duration::hours(23)),
            WindowStatus::Open
        );
        assert_eq!(
            promotion.window_status(last_day + Duration::days(1)),
            WindowStatus::Expired
        );

        Ok(())
    }

    #[test]
    fn unknown_scope_products_are_rejected() -> TestResult {
        let yaml = "
promotions:
  scoped:
    name: Scoped
    mechanic:
      type: percentage
      value: 10%
    applicable_products: [missing]
";
        let mut fixture: PromotionsFixture = serde_norway::from_str(yaml)?;
        let promotion = fixture.promotions.remove("scoped").ok_or("missing scoped")?;

        assert!(matches!(
            promotion.try_into_promotion(&FxHashMap::default(), Some(USD)),
            Err(FixtureError::ProductNotFound(product)) if product == "missing"
        ));

        Ok(())
    }

    #[test]
    fn inverted_windows_are_rejected() {
        let from = NaiveDate::from_ymd_opt(2026, 2, 1);
        let to = NaiveDate::from_ymd_opt(2026, 1, 1);

        assert!(matches!(
            validity(from, to),
            Err(FixtureError::InvalidPromotionData(_))
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = "
promotions:
  typo:
    name: Typo
    mechanic:
      type: percentage
      value: 10%
    stackabel: false
";

        assert!(serde_norway::from_str::<PromotionsFixture>(yaml).is_err());
    }
}
