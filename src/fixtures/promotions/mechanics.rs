//! Promotion Mechanic Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    fixtures::{
        FixtureError,
        products::{parse_money_in, parse_percentage, parse_price},
    },
    products::ProductKey,
    promotions::mechanics::{BulkTier, BulkTiers, BuyXGetY, Mechanic},
};

/// Mechanic configuration from YAML fixtures
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MechanicFixture {
    /// Percentage off (e.g. "10%")
    Percentage {
        /// Percentage string
        value: String,
    },

    /// Fixed amount off (e.g. "5.00 USD")
    FixedAmount {
        /// Price string
        value: String,
    },

    /// Quantity tiers, each with a percentage off
    Bulk {
        /// Tiers in any order
        tiers: Vec<BulkTierFixture>,
    },

    /// Buy some units, get some free or discounted
    BuyXGetY {
        /// Units bought per group
        buy: u32,

        /// Units rewarded per group
        get: u32,

        /// Product key the offer is restricted to
        #[serde(default)]
        product: Option<String>,

        /// Discount on rewarded units instead of making them free (e.g. "50%")
        #[serde(default)]
        percent_off: Option<String>,
    },
}

/// Bulk tier from YAML fixtures
#[derive(Debug, Deserialize)]
pub struct BulkTierFixture {
    /// Minimum eligible quantity
    pub min_quantity: u32,

    /// Percentage string (e.g. "20%")
    pub percent: String,
}

impl MechanicFixture {
    /// Convert to a [`Mechanic`], resolving product keys and checking amounts against the
    /// fixture currency when one is known.
    ///
    /// # Errors
    ///
    /// Returns a [`FixtureError`] if a value is malformed or a product is unknown.
    pub fn try_into_mechanic(
        self,
        products: &FxHashMap<String, ProductKey>,
        currency: Option<&'static rusty_money::iso::Currency>,
    ) -> Result<Mechanic<'static>, FixtureError> {
        match self {
            MechanicFixture::Percentage { value } => {
                Ok(Mechanic::Percentage(parse_percentage(&value)?))
            }
            MechanicFixture::FixedAmount { value } => {
                let currency = match currency {
                    Some(currency) => currency,
                    None => parse_price(&value)?.1,
                };

                Ok(Mechanic::FixedAmount(parse_money_in(&value, currency)?))
            }
            MechanicFixture::Bulk { tiers } => {
                let tiers = tiers
                    .into_iter()
                    .map(|tier| {
                        let percent = parse_percentage(&tier.percent)?;

                        Ok(BulkTier::new(tier.min_quantity, percent))
                    })
                    .collect::<Result<Vec<_>, FixtureError>>()?;

                Ok(Mechanic::Bulk(BulkTiers::new(tiers)))
            }
            MechanicFixture::BuyXGetY {
                buy,
                get,
                product,
                percent_off,
            } => {
                let mut offer = BuyXGetY::free(buy, get);

                if let Some(product) = product {
                    let key = products
                        .get(&product)
                        .ok_or(FixtureError::ProductNotFound(product))?;

                    offer = offer.for_product(*key);
                }

                if let Some(percent) = percent_off {
                    offer = offer.percent_off(parse_percentage(&percent)?);
                }

                Ok(Mechanic::BuyXGetY(offer))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rusty_money::{
        Money,
        iso::{GBP, USD},
    };
    use slotmap::SlotMap;
    use testresult::TestResult;

    use crate::promotions::mechanics::BuyXGetYReward;

    use super::*;

    #[test]
    fn percentage_fixture_parses() -> TestResult {
        let yaml = "type: percentage\nvalue: 10%\n";
        let fixture: MechanicFixture = serde_norway::from_str(yaml)?;

        assert_eq!(
            fixture.try_into_mechanic(&FxHashMap::default(), None)?,
            Mechanic::Percentage(Percentage::from(0.1))
        );

        Ok(())
    }

    #[test]
    fn fixed_amount_fixture_checks_currency() -> TestResult {
        let fixture: MechanicFixture =
            serde_norway::from_str("type: fixed_amount\nvalue: 5.00 USD\n")?;

        assert_eq!(
            fixture.try_into_mechanic(&FxHashMap::default(), Some(USD))?,
            Mechanic::FixedAmount(Money::from_minor(500, USD))
        );

        let fixture: MechanicFixture =
            serde_norway::from_str("type: fixed_amount\nvalue: 5.00 USD\n")?;

        assert!(matches!(
            fixture.try_into_mechanic(&FxHashMap::default(), Some(GBP)),
            Err(FixtureError::CurrencyMismatch(_, _))
        ));

        Ok(())
    }

    #[test]
    fn bulk_fixture_sorts_tiers() -> TestResult {
        let yaml = "type: bulk\n\
                    tiers:\n\
                    \x20 - min_quantity: 10\n\
                    \x20   percent: 20%\n\
                    \x20 - min_quantity: 5\n\
                    \x20   percent: 10%\n";
        let fixture: MechanicFixture = serde_norway::from_str(yaml)?;

        let Mechanic::Bulk(tiers) = fixture.try_into_mechanic(&FxHashMap::default(), None)? else {
            return Err("expected a bulk mechanic".into());
        };

        let minimums: Vec<u32> = tiers.tiers().iter().map(|tier| tier.min_quantity).collect();

        assert_eq!(minimums, vec![5, 10]);

        Ok(())
    }

    #[test]
    fn buy_x_get_y_fixture_resolves_product() -> TestResult {
        let mut keys = SlotMap::<ProductKey, ()>::with_key();
        let premium = keys.insert(());
        let mut products = FxHashMap::default();
        products.insert("premium".to_string(), premium);

        let yaml = "type: buy_x_get_y\nbuy: 2\nget: 1\nproduct: premium\npercent_off: 50%\n";
        let fixture: MechanicFixture = serde_norway::from_str(yaml)?;

        let Mechanic::BuyXGetY(offer) = fixture.try_into_mechanic(&products, None)? else {
            return Err("expected a buy-x-get-y mechanic".into());
        };

        assert_eq!(offer.product, Some(premium));
        assert_eq!(offer.reward, BuyXGetYReward::PercentOff(Percentage::from(0.5)));

        Ok(())
    }

    #[test]
    fn buy_x_get_y_fixture_rejects_unknown_product() -> TestResult {
        let yaml = "type: buy_x_get_y\nbuy: 2\nget: 1\nproduct: missing\n";
        let fixture: MechanicFixture = serde_norway::from_str(yaml)?;

        assert!(matches!(
            fixture.try_into_mechanic(&FxHashMap::default(), None),
            Err(FixtureError::ProductNotFound(product)) if product == "missing"
        ));

        Ok(())
    }
}
