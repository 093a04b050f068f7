//! Basket

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    items::LineItem,
    pricing::{TotalPriceError, total_price, total_quantity},
};

/// Errors related to basket construction or totals.
#[derive(Debug, Error)]
pub enum BasketError {
    /// A line's currency differs from the basket currency (index, line currency, basket currency).
    #[error("Line {0} has currency {1}, but basket has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// A line was not found in the basket.
    #[error("Line {0} not found")]
    LineNotFound(usize),
}

/// Basket
#[derive(Debug, Clone)]
pub struct Basket<'a> {
    lines: Vec<LineItem<'a>>,
    currency: &'static Currency,
}

impl<'a> Basket<'a> {
    /// Create a new, empty basket.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Basket {
            lines: Vec::new(),
            currency,
        }
    }

    /// Create a new basket with the given lines.
    ///
    /// # Errors
    ///
    /// Returns a `BasketError` if there was a currency mismatch error.
    pub fn with_lines(
        lines: impl Into<Vec<LineItem<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, BasketError> {
        let lines = lines.into();

        lines.iter().enumerate().try_for_each(|(i, line)| {
            let line_currency = line.unit_price().currency();

            if line_currency == currency {
                Ok(())
            } else {
                Err(BasketError::CurrencyMismatch(
                    i,
                    line_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ))
            }
        })?;

        Ok(Basket { lines, currency })
    }

    /// Calculate the subtotal of the basket.
    ///
    /// # Errors
    ///
    /// Returns a `TotalPriceError` if there was a money arithmetic or overflow error.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, TotalPriceError> {
        if self.is_empty() {
            return Ok(Money::from_minor(0, self.currency));
        }

        total_price(&self.lines)
    }

    /// Total quantity of all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        total_quantity(&self.lines)
    }

    /// Get a line from the basket.
    ///
    /// # Errors
    ///
    /// Returns a `BasketError::LineNotFound` if the line is not found.
    pub fn get_line(&self, line: usize) -> Result<&LineItem<'a>, BasketError> {
        self.lines.get(line).ok_or(BasketError::LineNotFound(line))
    }

    /// Iterate over the lines in the basket.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem<'a>> {
        self.lines.iter()
    }

    /// Get the number of lines in the basket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the basket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get the currency of the basket.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{
        Money,
        iso::{GBP, USD},
    };
    use testresult::TestResult;

    use crate::products::ProductKey;

    use super::*;

    fn test_lines<'a>() -> [LineItem<'a>; 3] {
        [
            LineItem::new(ProductKey::default(), Money::from_minor(100, GBP), 1),
            LineItem::new(ProductKey::default(), Money::from_minor(200, GBP), 2),
            LineItem::new(ProductKey::default(), Money::from_minor(300, GBP), 1),
        ]
    }

    #[test]
    fn new_with_currency() {
        let basket = Basket::new(GBP);

        assert_eq!(basket.currency, GBP);
        assert!(basket.is_empty());
    }

    #[test]
    fn with_lines_currency_mismatch_errors() {
        let lines = [
            LineItem::new(ProductKey::default(), Money::from_minor(100, GBP), 1),
            LineItem::new(ProductKey::default(), Money::from_minor(100, USD), 1),
        ];

        let result = Basket::with_lines(lines, GBP);

        assert!(
            matches!(
                result,
                Err(BasketError::CurrencyMismatch(1, item, basket)) if item == USD.iso_alpha_code && basket == GBP.iso_alpha_code
            ),
            "expected CurrencyMismatch error, got {result:?}"
        );
    }

    #[test]
    fn subtotal_multiplies_quantities() -> TestResult {
        let basket = Basket::with_lines(test_lines(), GBP)?;

        assert_eq!(basket.subtotal()?, Money::from_minor(800, GBP));

        Ok(())
    }

    #[test]
    fn subtotal_with_no_lines() -> TestResult {
        let basket = Basket::new(GBP);

        assert_eq!(basket.subtotal()?, Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn total_quantity_sums_lines() -> TestResult {
        let basket = Basket::with_lines(test_lines(), GBP)?;

        assert_eq!(basket.total_quantity(), 4);
        assert_eq!(basket.len(), 3);

        Ok(())
    }

    #[test]
    fn get_line_returns_line() -> TestResult {
        let basket = Basket::with_lines(test_lines(), GBP)?;
        let line = basket.get_line(1)?;

        assert_eq!(line.unit_price().to_minor_units(), 200);
        assert_eq!(line.quantity(), 2);

        Ok(())
    }

    #[test]
    fn get_line_missing_returns_error() {
        let basket = Basket::new(GBP);

        assert!(matches!(
            basket.get_line(0),
            Err(BasketError::LineNotFound(0))
        ));
    }
}
