//! Receipt

use std::{fmt::Write, io, ops::Range};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::{Money, MoneyError, iso::Currency};
use slotmap::SlotMap;
use smallvec::{SmallVec, smallvec};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    basket::Basket,
    calculator::{AppliedPromotion, NonStackableConflict, Rejection},
    evaluator::Quote,
    pricing::TotalPriceError,
    products::{Product, ProductKey},
    promotions::{PromotionKey, PromotionMeta, code::PromotionCode},
};

/// Errors that can occur when building a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Error calculating a line total.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Error finding a product in the product catalog.
    #[error("Missing product")]
    MissingProduct(ProductKey),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Printable summary of a quote.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    /// Promotions that took money off, in application order
    applied: SmallVec<[AppliedPromotion<'a>; 4]>,

    /// Promotions that were considered but did not apply
    rejections: Vec<Rejection<'a>>,

    /// Promotions dropped in favour of a non-stackable promotion
    conflicts: SmallVec<[NonStackableConflict; 2]>,

    /// Entered code and why it was refused, if it was
    refused_code: Option<(PromotionCode, String)>,

    /// Total cost before any promotions
    subtotal: Money<'a, Currency>,

    /// Total amount paid after promotions
    total: Money<'a, Currency>,

    /// Whether shipping is free
    free_shipping: bool,
}

impl<'a> Receipt<'a> {
    /// Build a receipt from a quote.
    #[must_use]
    pub fn from_quote(quote: &Quote<'a>) -> Self {
        let refused_code = match (quote.code(), quote.reason()) {
            (Some(code), Some(reason)) => Some((code.clone(), reason.to_string())),
            _ => None,
        };

        Self {
            applied: quote.breakdown().iter().cloned().collect(),
            rejections: quote.rejections().to_vec(),
            conflicts: quote.conflicts().iter().copied().collect(),
            refused_code,
            subtotal: *quote.subtotal(),
            total: *quote.final_total(),
            free_shipping: quote.free_shipping(),
        }
    }

    /// Total cost before any promotions
    #[must_use]
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.subtotal
    }

    /// Total amount paid after promotions
    #[must_use]
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Whether shipping is free
    #[must_use]
    pub fn free_shipping(&self) -> bool {
        self.free_shipping
    }

    /// Promotions that took money off
    #[must_use]
    pub fn applied(&self) -> &[AppliedPromotion<'a>] {
        &self.applied
    }

    /// Calculate the savings made by applying promotions.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings(&self) -> Result<Money<'a, Currency>, MoneyError> {
        self.subtotal.sub(self.total)
    }

    /// Calculates the savings as a fraction of the subtotal
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings_percent(&self) -> Result<Percentage, MoneyError> {
        let savings_minor = self.savings()?.to_minor_units();
        let subtotal_minor = self.subtotal.to_minor_units();

        if subtotal_minor == 0 {
            return Ok(Percentage::from(0.0));
        }

        Ok(Percentage::from(
            Decimal::from(savings_minor) / Decimal::from(subtotal_minor),
        ))
    }

    /// Writes the receipt as tables of basket lines and promotions, followed by the totals.
    ///
    /// # Errors
    ///
    /// Returns an error if a product is missing from `product_meta` or the output fails.
    pub fn write_to(
        &self,
        mut out: impl io::Write,
        basket: &Basket<'_>,
        product_meta: &SlotMap<ProductKey, Product<'_>>,
        promotion_meta: &FxHashMap<PromotionKey, PromotionMeta>,
    ) -> Result<(), ReceiptError> {
        let items = item_rows(basket, product_meta)?;

        write_table(&mut out, items, 2..5, smallvec![])?;

        if !(self.applied.is_empty() && self.rejections.is_empty() && self.conflicts.is_empty()) {
            let (promotions, color_ops) = self.promotion_rows(promotion_meta);

            write_table(&mut out, promotions, 3..4, color_ops)?;
        }

        write_receipt_summary(&mut out, self)
    }

    fn promotion_rows(
        &self,
        promotion_meta: &FxHashMap<PromotionKey, PromotionMeta>,
    ) -> (Builder, SmallVec<[(usize, usize, Color); 16]>) {
        let mut builder = Builder::default();
        let mut color_ops: SmallVec<[(usize, usize, Color); 16]> = smallvec![];

        builder.push_record(["", "Promotion", "Code", "Discount", "Note"]);

        let mut row = 0;

        for applied in &self.applied {
            let note = if applied.free_shipping {
                "free shipping"
            } else {
                ""
            };

            builder.push_record([
                "✓".to_string(),
                promotion_name(applied.promotion, applied.code.as_ref(), promotion_meta),
                code_display(applied.code.as_ref()),
                format!("-{}", applied.amount),
                note.to_string(),
            ]);

            row += 1;
            color_ops.push((row, 3, Color::FG_GREEN));
        }

        for conflict in &self.conflicts {
            builder.push_record([
                "✗".to_string(),
                promotion_name(conflict.dropped, None, promotion_meta),
                String::new(),
                String::new(),
                format!(
                    "not combinable with {}",
                    promotion_name(conflict.winner, None, promotion_meta)
                ),
            ]);

            row += 1;
            color_ops.push((row, 4, color_dark_grey()));
        }

        for rejection in &self.rejections {
            builder.push_record([
                "✗".to_string(),
                promotion_name(rejection.promotion, rejection.code.as_ref(), promotion_meta),
                code_display(rejection.code.as_ref()),
                String::new(),
                rejection.reason.to_string(),
            ]);

            row += 1;
            color_ops.push((row, 4, color_dark_grey()));
        }

        (builder, color_ops)
    }
}

fn item_rows(
    basket: &Basket<'_>,
    product_meta: &SlotMap<ProductKey, Product<'_>>,
) -> Result<Builder, ReceiptError> {
    let mut builder = Builder::default();

    builder.push_record(["", "Item", "Qty", "Unit Price", "Line Total"]);

    for (line_idx, line) in basket.iter().enumerate() {
        let product = product_meta
            .get(line.product())
            .ok_or(ReceiptError::MissingProduct(line.product()))?;

        builder.push_record([
            format!("#{:<3}", line_idx + 1),
            product.name.clone(),
            line.quantity().to_string(),
            line.unit_price().to_string(),
            line.line_total()?.to_string(),
        ]);
    }

    Ok(builder)
}

fn promotion_name(
    promotion: PromotionKey,
    code: Option<&PromotionCode>,
    promotion_meta: &FxHashMap<PromotionKey, PromotionMeta>,
) -> String {
    match (promotion_meta.get(&promotion), code) {
        (Some(meta), _) => meta.name.clone(),
        (None, Some(code)) => code.to_string(),
        (None, None) => "<unknown>".to_string(),
    }
}

fn code_display(code: Option<&PromotionCode>) -> String {
    code.map_or_else(|| "auto".to_string(), PromotionCode::to_string)
}

fn write_table(
    out: &mut impl io::Write,
    builder: Builder,
    right_aligned: Range<usize>,
    color_ops: SmallVec<[(usize, usize, Color); 16]>,
) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(right_aligned), Alignment::right());

    for (row, col, color) in color_ops {
        table.modify((row, col), color);
    }

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReceiptError::IO)
}

fn write_receipt_summary(
    out: &mut impl io::Write,
    receipt: &Receipt<'_>,
) -> Result<(), ReceiptError> {
    let savings = receipt.savings()?;
    let savings_percent_points =
        percent_points_from_fractional_percentage(receipt.savings_percent()?);

    let subtotal_label = " Subtotal:";
    let discount_label = " Discount:";
    let shipping_label = " Shipping:";
    let total_label = " \x1b[1mTotal:\x1b[0m";
    let savings_label = " Savings:";

    let subtotal_val = format!("{}  ", receipt.subtotal());
    let discount_val = format!("-{savings}  ");
    let shipping_val = if receipt.free_shipping() {
        "Free  ".to_string()
    } else {
        "Standard  ".to_string()
    };
    let total_val = format!("{}  ", receipt.total());
    let savings_val = format!("({savings_percent_points:.2}%) {savings}  ");

    let label_width = [
        subtotal_label,
        discount_label,
        shipping_label,
        total_label,
        savings_label,
    ]
    .into_iter()
    .map(visible_width)
    .max()
    .unwrap_or_default();

    let value_width = [
        &subtotal_val,
        &discount_val,
        &shipping_val,
        &total_val,
        &savings_val,
    ]
    .into_iter()
    .map(String::len)
    .max()
    .unwrap_or_default();

    write_summary_line(out, subtotal_label, &subtotal_val, label_width, value_width)?;
    write_summary_line(out, discount_label, &discount_val, label_width, value_width)?;
    write_summary_line(out, shipping_label, &shipping_val, label_width, value_width)?;

    write_summary_line(
        out,
        total_label,
        &format!("\x1b[1m{total_val}\x1b[0m"),
        label_width,
        value_width,
    )?;

    write_summary_line(out, savings_label, &savings_val, label_width, value_width)?;

    if let Some((code, reason)) = &receipt.refused_code {
        writeln!(out, "\n Code {code} not applied: {reason}").map_err(|_err| ReceiptError::IO)?;
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}

/// Converts a fractional percentage to percent points for display.
fn percent_points_from_fractional_percentage(percentage: Percentage) -> Decimal {
    ((percentage * Decimal::ONE) * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Wraps runs of UTF-8 box-drawing characters in ANSI dark-grey escape codes.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a fixed-width value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(|_err| ReceiptError::IO)
}

/// ANSI dark grey foreground.
fn color_dark_grey() -> Color {
    Color::new("\x1b[90m", "\x1b[0m")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{
        customers::Customer,
        evaluator::Evaluator,
        items::LineItem,
        orders::OrderContext,
        promotions::{Promotion, mechanics::Mechanic},
        store::MemoryStore,
    };

    use super::*;

    struct Shop {
        products: SlotMap<ProductKey, Product<'static>>,
        names: FxHashMap<PromotionKey, PromotionMeta>,
        evaluator: Evaluator<MemoryStore<'static>>,
        order: OrderContext<'static>,
    }

    fn shop() -> TestResult<Shop> {
        let mut products = SlotMap::with_key();
        let premium = products.insert(Product {
            name: "Streaming Premium".to_string(),
            price: Money::from_minor(2500, USD),
        });

        let store = MemoryStore::new();
        let save10 = store.insert(
            Promotion::new(
                PromotionKey::default(),
                Mechanic::Percentage(Percentage::from(0.1)),
            )
            .with_code("SAVE10".parse()?)
            .with_free_shipping(true),
        )?;

        let mut names = FxHashMap::default();
        names.insert(
            save10,
            PromotionMeta {
                name: "Save 10%".to_string(),
            },
        );

        let basket = Basket::with_lines(
            [LineItem::new(premium, Money::from_minor(2500, USD), 4)],
            USD,
        )?;

        Ok(Shop {
            products,
            names,
            evaluator: Evaluator::new(store),
            order: OrderContext::new(Customer::new("cust-1"), basket),
        })
    }

    #[test]
    fn receipt_reflects_quote_totals() -> TestResult {
        let shop = shop()?;
        let quote = shop.evaluator.quote(Some("SAVE10"), &shop.order, Utc::now())?;
        let receipt = Receipt::from_quote(&quote);

        assert_eq!(receipt.subtotal(), Money::from_minor(10_000, USD));
        assert_eq!(receipt.total(), Money::from_minor(9000, USD));
        assert_eq!(receipt.savings()?, Money::from_minor(1000, USD));
        assert_eq!(
            percent_points_from_fractional_percentage(receipt.savings_percent()?),
            Decimal::TEN
        );
        assert!(receipt.free_shipping());
        assert_eq!(receipt.applied().len(), 1);

        Ok(())
    }

    #[test]
    fn write_to_renders_items_promotions_and_totals() -> TestResult {
        let shop = shop()?;
        let quote = shop.evaluator.quote(Some("SAVE10"), &shop.order, Utc::now())?;
        let mut out = Vec::new();

        Receipt::from_quote(&quote).write_to(
            &mut out,
            shop.order.basket(),
            &shop.products,
            &shop.names,
        )?;

        let rendered = String::from_utf8(out)?;

        assert!(rendered.contains("Streaming Premium"));
        assert!(rendered.contains("Save 10%"));
        assert!(rendered.contains("free shipping"));
        assert!(rendered.contains("$90.00"));
        assert!(rendered.contains("Free"));

        Ok(())
    }

    #[test]
    fn write_to_explains_refused_codes() -> TestResult {
        let shop = shop()?;
        let quote = shop.evaluator.quote(Some("NOPE"), &shop.order, Utc::now())?;
        let mut out = Vec::new();

        Receipt::from_quote(&quote).write_to(
            &mut out,
            shop.order.basket(),
            &shop.products,
            &shop.names,
        )?;

        let rendered = String::from_utf8(out)?;

        assert!(rendered.contains("Code NOPE not applied"));
        assert!(!rendered.contains("Save 10%"));

        Ok(())
    }

    #[test]
    fn write_to_requires_every_product() -> TestResult {
        let shop = shop()?;
        let quote = shop.evaluator.quote(None, &shop.order, Utc::now())?;

        let result = Receipt::from_quote(&quote).write_to(
            Vec::new(),
            shop.order.basket(),
            &SlotMap::with_key(),
            &shop.names,
        );

        assert!(matches!(result, Err(ReceiptError::MissingProduct(_))));

        Ok(())
    }

    #[test]
    fn savings_percent_is_zero_when_subtotal_is_zero() -> TestResult {
        let shop = shop()?;
        let order = OrderContext::new(Customer::new("cust-2"), Basket::new(USD));
        let quote = shop.evaluator.quote(None, &order, Utc::now())?;

        assert_eq!(
            Receipt::from_quote(&quote).savings_percent()?,
            Percentage::from(0.0)
        );

        Ok(())
    }

    #[test]
    fn percent_points_converts_fractional_percentage_to_percent_points() {
        let points = percent_points_from_fractional_percentage(Percentage::from(0.25));

        assert_eq!(points, Decimal::from(25));
    }

    #[test]
    fn visible_width_ignores_ansi_escapes() {
        assert_eq!(visible_width("\x1b[1mTotal:\x1b[0m"), 6);
    }

    #[test]
    fn colorize_borders_wraps_box_drawing_runs() {
        assert_eq!(colorize_borders("├──┤ a"), "\x1b[90m├──┤\x1b[0m a");
    }
}
