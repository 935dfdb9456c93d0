use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

use student_invoicer::{AmountRange, BillingCalculator, InvoiceConfig, InvoiceGenerator};

/// Generates one PDF invoice per student of a CSV table
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    /// The student table: name, student id and phone, one header row
    #[clap(default_value = "Students.csv")]
    input: std::path::PathBuf,
    /// Where invoices and QR images are written to
    #[clap(long, default_value = "results")]
    output_dir: std::path::PathBuf,
    /// The logo printed at the top of every invoice
    #[clap(long, default_value = "assets/logo.png")]
    logo: std::path::PathBuf,
    /// The tax rate applied to the subtotal
    #[clap(long, default_value = "0.18")]
    tax_rate: Decimal,
    /// The lowest base amount that is charged
    #[clap(long, default_value = "500")]
    min_amount: u32,
    /// The highest base amount that is charged
    #[clap(long, default_value = "2000")]
    max_amount: u32,
    /// Seed for the amount generator, to reproduce a run
    #[clap(long)]
    seed: Option<u64>,
    /// The invoice date as YYYY-MM-DD, defaults to today
    #[clap(long)]
    date: Option<chrono::NaiveDate>,
    /// Delete the QR images once they are embedded into the invoices
    #[clap(long)]
    discard_qr: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let range = AmountRange::new(args.min_amount, args.max_amount)?;
    let billing = BillingCalculator::new(args.tax_rate, range)?;
    let defaults = InvoiceConfig::default();
    let config = InvoiceConfig {
        input_path: args.input,
        output_dir: args.output_dir,
        logo_path: args.logo,
        billing,
        invoice_date: args.date.unwrap_or(defaults.invoice_date),
        retain_verification_images: !args.discard_qr,
        ..defaults
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let summary = InvoiceGenerator::new(config, rng).run();
    log::info!(
        "{} invoices generated, {} rows skipped, {} failed",
        summary.succeeded(), summary.skipped(), summary.failed_count(),
    );

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(std::io::stdout());

    for invoice in &summary.generated {
        writer.serialize(invoice)?;
    }
    writer.flush().context("Failed to write the invoice manifest")?;

    Ok(())
}
