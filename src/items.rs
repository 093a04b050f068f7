//! Line Items

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;

use crate::{pricing::TotalPriceError, products::ProductKey};

/// A cart line: one product at a unit price, bought `quantity` times.
#[derive(Clone, Debug, PartialEq)]
pub struct LineItem<'a> {
    product: ProductKey,
    unit_price: Money<'a, Currency>,
    quantity: u32,
}

impl<'a> LineItem<'a> {
    /// Creates a new line item.
    #[must_use]
    pub fn new(product: ProductKey, unit_price: Money<'a, Currency>, quantity: u32) -> Self {
        Self {
            product,
            unit_price,
            quantity,
        }
    }

    /// Returns the product of the line
    pub fn product(&self) -> ProductKey {
        self.product
    }

    /// Returns the unit price of the line
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Returns the quantity of the line
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price multiplied by quantity.
    ///
    /// # Errors
    ///
    /// Returns [`TotalPriceError::Overflow`] if the line total does not fit in minor units.
    pub fn line_total(&self) -> Result<Money<'a, Currency>, TotalPriceError> {
        let minor = self
            .unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
            .ok_or(TotalPriceError::Overflow)?;

        Ok(Money::from_minor(minor, self.unit_price.currency()))
    }
}

/// Sum the prices (minor units) of the `units` cheapest units across `lines`.
///
/// Returns `None` if the sum overflows. Asking for more units than the lines hold sums every
/// unit.
pub fn cheapest_units_total<'a, 'b>(
    lines: impl IntoIterator<Item = &'b LineItem<'a>>,
    units: u64,
) -> Option<i64>
where
    'a: 'b,
{
    let mut by_price: SmallVec<[(i64, u32); 8]> = lines
        .into_iter()
        .map(|line| (line.unit_price().to_minor_units(), line.quantity()))
        .collect();

    by_price.sort_by_key(|(price, _)| *price);

    let mut remaining = units;
    let mut total: i64 = 0;

    for (price, quantity) in by_price {
        if remaining == 0 {
            break;
        }

        let taken = remaining.min(u64::from(quantity));
        remaining -= taken;

        let cost = price.checked_mul(i64::try_from(taken).ok()?)?;
        total = total.checked_add(cost)?;
    }

    Some(total)
}
