use rand::Rng;

use crate::billing::format_money;
use crate::roster::load_roster;
use crate::{GeneratedInvoice, InvoiceAssembler, InvoiceConfig, InvoiceError, StudentRecord};

/// A student whose invoice could not be written
#[derive(Debug)]
pub struct FailedInvoice {
    pub student: StudentRecord,
    pub error: InvoiceError,
}

/// The outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Invoices that were written, in input order
    pub generated: Vec<GeneratedInvoice>,
    /// Rows that were rejected because of a missing name or id
    pub skipped: usize,
    /// Students whose invoice could not be written
    pub failed: Vec<FailedInvoice>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.generated.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Runs a whole batch: loads the students, prices and writes their invoices
///
/// The random source is injected, so a seeded generator reproduces the
/// amounts of an earlier run.
#[derive(Debug)]
pub struct InvoiceGenerator<R> {
    config: InvoiceConfig,
    rng: R,
}

impl<R: Rng> InvoiceGenerator<R> {
    pub fn new(config: InvoiceConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Processes every student of the input table, one after another
    ///
    /// An unreadable input table results in an empty summary. A failing
    /// student never stops the remaining ones.
    pub fn run(&mut self) -> BatchSummary {
        let roster = match load_roster(&self.config.input_path) {
            Ok(roster) => roster,
            Err(e) => {
                log::error!("Error reading student data: {}", e);
                return BatchSummary::default();
            }
        };
        let mut summary = BatchSummary {
            skipped: roster.skipped,
            ..BatchSummary::default()
        };
        if roster.is_empty() {
            log::info!("No valid student data found in {}", self.config.input_path.display());
            return summary;
        }

        // failures surface again per student when the invoice is written
        if let Err(e) = std::fs::create_dir_all(&self.config.output_dir) {
            log::error!(
                "Failed to create the output directory {}: {}",
                self.config.output_dir.display(), e,
            );
        }

        let assembler = InvoiceAssembler::new(&self.config);
        for student in roster.students {
            let amounts = self.config.billing.draw(&mut self.rng);

            match assembler.assemble(&student, &amounts) {
                Ok(invoice) => {
                    log::info!(
                        "Generated invoice: {} with amount Rs. {} (total Rs. {})",
                        invoice.document().display(),
                        amounts.base(),
                        format_money(amounts.total()),
                    );
                    summary.generated.push(invoice);
                }
                Err(error) => {
                    log::error!(
                        "Error generating invoice for student {}: {}",
                        student.identifier(), error,
                    );
                    summary.failed.push(FailedInvoice { student, error });
                }
            }
        }

        summary
    }
}
