//! Utils

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;

/// Arguments for the quote demo
#[derive(Debug, Parser)]
pub struct QuoteArgs {
    /// Fixture set to load products, promotions and carts from
    #[clap(short, long, default_value = "storefront")]
    pub fixture: String,

    /// Cart to quote
    #[clap(short = 'C', long, default_value = "family")]
    pub cart: String,

    /// Promotion code entered by the customer
    #[clap(short, long)]
    pub code: Option<String>,

    /// Evaluate as of this day (YYYY-MM-DD) instead of now
    #[clap(short, long)]
    pub date: Option<NaiveDate>,

    /// Confirm the quote under this order reference
    #[clap(long)]
    pub confirm: Option<String>,
}

impl QuoteArgs {
    /// Instant to evaluate at: noon UTC on `--date`, or the current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.date
            .and_then(|day| day.and_hms_opt(12, 0, 0))
            .map_or_else(Utc::now, |time| time.and_utc())
    }
}
