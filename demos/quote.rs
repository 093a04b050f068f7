//! Quote Example
//!
//! Prices a fixture cart, optionally with a promotion code, and prints the receipt.
//!
//! Use `-f` to load a fixture set by name
//! Use `-C` to pick the cart and `-c` to enter a promotion code
//! Use `-d` to evaluate as of a given day
//! Use `--confirm` to record the redemptions under an order reference
//!
//! Set `RUST_LOG=rebate=debug` to trace eligibility decisions.

use std::{io, io::Write, time::Instant};

use anyhow::Result;
use clap::Parser;
use humanize_duration::{Truncate, prelude::DurationExt};
use tracing_subscriber::EnvFilter;

use rebate::{
    evaluator::Evaluator,
    fixtures::Fixture,
    receipt::Receipt,
    store::{MemoryStore, OrderRef},
    utils::QuoteArgs,
};

/// Quote Example
pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new("rebate=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = QuoteArgs::parse();

    let fixture = Fixture::from_set(&args.fixture)?;
    let store = MemoryStore::new();
    let names = fixture.populate(&store)?;
    let order = fixture.cart(&args.cart)?;
    let evaluator = Evaluator::new(store);

    let start = Instant::now();
    let quote = evaluator.quote(args.code.as_deref(), &order, args.now())?;
    let elapsed = start.elapsed();

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    Receipt::from_quote(&quote).write_to(
        &mut handle,
        order.basket(),
        fixture.product_meta_map(),
        &names,
    )?;

    writeln!(
        handle,
        " {} ({}s)",
        elapsed.human(Truncate::Nano),
        elapsed.as_secs_f32()
    )?;

    if let Some(reference) = args.confirm {
        let confirmation = evaluator.confirm(&OrderRef::new(reference), &quote, order.customer())?;

        writeln!(
            handle,
            " Confirmed {} for {} ({} promotion(s) redeemed)",
            confirmation.order(),
            confirmation.customer(),
            confirmation.promotions().len()
        )?;
    }

    Ok(())
}
