//! Prices

use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::items::LineItem;

/// Errors that can occur while calculating total price.
#[derive(Debug, Error, PartialEq)]
pub enum TotalPriceError {
    /// No items were provided, so currency could not be determined.
    #[error("no items provided; cannot determine currency")]
    NoItems,

    /// A line total or running sum does not fit in minor units.
    #[error("total price overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Calculates the total price of a list of line items
///
/// # Errors
///
/// - [`TotalPriceError::NoItems`]: No items were provided, so currency could not be determined.
/// - [`TotalPriceError::Overflow`]: A line total or the sum overflowed.
/// - [`TotalPriceError::Money`]: Wrapped money arithmetic or currency mismatch error.
pub fn total_price<'a, 'b>(
    lines: impl IntoIterator<Item = &'b LineItem<'a>>,
) -> Result<Money<'a, Currency>, TotalPriceError>
where
    'a: 'b,
{
    let mut lines = lines.into_iter().peekable();
    let first: &LineItem<'a> = *lines.peek().ok_or(TotalPriceError::NoItems)?;

    let total = lines.try_fold(
        Money::from_minor(0, first.unit_price().currency()),
        |acc, line| Ok::<_, TotalPriceError>(acc.add(line.line_total()?)?),
    )?;

    Ok(total)
}

/// Total quantity across the given line items.
pub fn total_quantity<'a, 'b>(lines: impl IntoIterator<Item = &'b LineItem<'a>>) -> u64
where
    'a: 'b,
{
    lines
        .into_iter()
        .map(|line| u64::from(line.quantity()))
        .sum()
}
