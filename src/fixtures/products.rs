//! Product Fixtures

use std::str::FromStr;

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use serde::Deserialize;

use crate::{fixtures::FixtureError, products::Product};

/// Wrapper for products in YAML
#[derive(Debug, Deserialize)]
pub struct ProductsFixture {
    /// Map of product key -> product fixture
    pub products: FxHashMap<String, ProductFixture>,
}

/// Product fixture from YAML
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    /// Product name
    pub name: String,

    /// Price string (e.g., "9.99 USD")
    pub price: String,
}

impl TryFrom<ProductFixture> for Product<'_> {
    type Error = FixtureError;

    fn try_from(fixture: ProductFixture) -> Result<Self, Self::Error> {
        let (minor_units, currency) = parse_price(&fixture.price)?;

        Ok(Product {
            name: fixture.name,
            price: Money::from_minor(minor_units, currency),
        })
    }
}

/// Parse a price string like "2.99 GBP" into minor units and a currency.
///
/// # Errors
///
/// Returns [`FixtureError::InvalidPrice`] if the string is malformed or has more decimal places
/// than the currency, and [`FixtureError::UnknownCurrency`] for unknown currency codes.
pub fn parse_price(price: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let mut parts = price.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(FixtureError::InvalidPrice(price.to_string()));
    };

    let amount =
        Decimal::from_str(amount).map_err(|_err| FixtureError::InvalidPrice(price.to_string()))?;

    let currency = iso::find(&code.to_ascii_uppercase())
        .ok_or_else(|| FixtureError::UnknownCurrency(code.to_string()))?;

    let minor = amount
        .checked_mul(Decimal::from(10_i64.pow(currency.exponent)))
        .filter(|minor| minor.fract().is_zero())
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| FixtureError::InvalidPrice(price.to_string()))?;

    Ok((minor, currency))
}

/// Parse a price string into money in an expected currency.
///
/// # Errors
///
/// Returns a [`FixtureError`] if the price is malformed or in another currency.
pub fn parse_money_in(
    price: &str,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, FixtureError> {
    let (minor_units, parsed) = parse_price(price)?;

    if parsed != currency {
        return Err(FixtureError::CurrencyMismatch(
            currency.iso_alpha_code.to_string(),
            parsed.iso_alpha_code.to_string(),
        ));
    }

    Ok(Money::from_minor(minor_units, currency))
}

/// Parse a percentage string like "15%" (or a bare fraction like "0.15").
///
/// # Errors
///
/// Returns [`FixtureError::InvalidPercentage`] if the value is malformed or outside 0-100%.
pub fn parse_percentage(percent: &str) -> Result<Percentage, FixtureError> {
    let invalid = || FixtureError::InvalidPercentage(percent.to_string());
    let trimmed = percent.trim();

    let fraction = match trimmed.strip_suffix('%') {
        Some(points) => Decimal::from_str(points.trim())
            .map_err(|_err| invalid())?
            .checked_div(Decimal::ONE_HUNDRED)
            .ok_or_else(invalid)?,
        None => Decimal::from_str(trimmed).map_err(|_err| invalid())?,
    };

    if fraction < Decimal::ZERO || fraction > Decimal::ONE {
        return Err(invalid());
    }

    Ok(Percentage::from(fraction))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, JPY, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parse_price_reads_amount_and_currency() -> TestResult {
        assert_eq!(parse_price("2.99 GBP")?, (299, GBP));
        assert_eq!(parse_price("100 usd")?, (10_000, USD));
        assert_eq!(parse_price("500 JPY")?, (500, JPY));

        Ok(())
    }

    #[test]
    fn parse_price_rejects_malformed_input() {
        for input in ["2.99", "GBP 2.99", "abc GBP", "1.999 GBP", "1 GBP extra"] {
            assert!(
                matches!(parse_price(input), Err(FixtureError::InvalidPrice(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn parse_price_rejects_unknown_currency() {
        assert!(matches!(
            parse_price("1.00 XXQ"),
            Err(FixtureError::UnknownCurrency(code)) if code == "XXQ"
        ));
    }

    #[test]
    fn parse_money_in_checks_currency() -> TestResult {
        assert_eq!(parse_money_in("5.00 USD", USD)?, Money::from_minor(500, USD));
        assert!(matches!(
            parse_money_in("5.00 GBP", USD),
            Err(FixtureError::CurrencyMismatch(_, _))
        ));

        Ok(())
    }

    #[test]
    fn parse_percentage_accepts_points_and_fractions() -> TestResult {
        assert_eq!(parse_percentage("15%")?, Percentage::from(0.15));
        assert_eq!(parse_percentage("0.15")?, Percentage::from(0.15));
        assert_eq!(parse_percentage("100%")?, Percentage::from(1.0));

        Ok(())
    }

    #[test]
    fn parse_percentage_rejects_out_of_range_values() {
        for input in ["-5%", "150%", "ten%", "1.5"] {
            assert!(
                matches!(parse_percentage(input), Err(FixtureError::InvalidPercentage(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn product_fixture_converts_to_product() -> TestResult {
        let product = Product::try_from(ProductFixture {
            name: "Streaming Premium".to_string(),
            price: "17.99 USD".to_string(),
        })?;

        assert_eq!(product.name, "Streaming Premium");
        assert_eq!(product.price, Money::from_minor(1799, USD));

        Ok(())
    }
}
